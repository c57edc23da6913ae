//! Field dispatcher
//!
//! Routes one field pair to the right comparator: a single exhaustive
//! match over the declared type and the null state of both sides.
//! Primitive pairs and nested records are handled here; list-shaped
//! fields continue to [`crate::list_primitive`] and
//! [`crate::list_record`].

use crate::counts::{classify_pair, meets_threshold, Classification, Counts};
use crate::engine::Walker;
use crate::error::{Error, Result};
use crate::result::{NodeKind, NodeResult, NonMatch};
use crate::value::{display_value, is_null_equivalent, matches_prim};
use serde_json::Value;
use stickler_schema::{FieldConfig, FieldDescriptor, FieldType, PrimType, SchemaId};

/// The threshold-applied score a parent accumulates for a field
///
/// Equal to the raw score unless the field clips and the raw score is
/// below threshold. List nodes never clip and bypass this helper.
pub(crate) fn applied_score(raw: f64, config: &FieldConfig) -> f64 {
    if !config.clip_under_threshold || meets_threshold(raw, config.threshold) {
        raw
    } else {
        0.0
    }
}

pub(crate) fn below_threshold_reason(raw: f64, threshold: f64) -> String {
    format!("below threshold ({raw:.4} < {threshold})")
}

impl Walker<'_> {
    /// Route a field pair by declared type and null state
    pub(crate) fn dispatch_field(
        &self,
        field: &FieldDescriptor,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let mut node = match *field.field_type.unwrap_optional() {
            FieldType::ListPrim(prim) => self.compare_primitive_list(field, prim, gt, pred)?,
            FieldType::ListRecord(id) => self.compare_record_list(field, id, gt, pred)?,
            FieldType::Prim(prim) => self.compare_primitive(field, prim, gt, pred)?,
            FieldType::Record(id) => self.compare_record_field(field, id, gt, pred)?,
            FieldType::Optional(_) => unreachable!("unwrap_optional strips wrappers"),
        };
        node.include_in_aggregate = field.config.include_in_aggregate;
        Ok(node)
    }

    /// Compare a primitive field pair
    fn compare_primitive(
        &self,
        field: &FieldDescriptor,
        prim: PrimType,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let config = &field.config;

        if let Some(node) = self.null_table(field, gt, pred) {
            return Ok(node);
        }

        // A value disagreeing with the declared type is a data-level
        // false discovery, not an error.
        if !matches_prim(prim, gt) || !matches_prim(prim, pred) {
            let mut node = NodeResult::leaf(Classification::Fd, 0.0).with_scores(
                0.0,
                applied_score(0.0, config),
                config.weight,
            );
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fd,
                display_value(gt).into(),
                display_value(pred).into(),
                Some(0.0),
                "type mismatch",
            ));
            return Ok(node);
        }

        let comparator = self.comparator_name(field)?;
        let raw = self.element_similarity(field, gt, pred)?;
        let label = classify_pair(raw, config.threshold);
        let mut node =
            NodeResult::leaf(label, raw).with_scores(raw, applied_score(raw, config), config.weight);
        if label == Classification::Fd {
            node.push_non_match(
                NonMatch::new(
                    &field.name,
                    Classification::Fd,
                    display_value(gt).into(),
                    display_value(pred).into(),
                    Some(raw),
                    below_threshold_reason(raw, config.threshold),
                )
                .with_detail("comparator", comparator),
            );
        }
        Ok(node)
    }

    /// Compare a nested record field pair
    ///
    /// Both present: recurse, then classify the whole sub-record as one
    /// object against this field's threshold. One side null: one object
    /// FA/FN with no recursion into the populated side, so the subtree
    /// contributes zero primitives to aggregates.
    fn compare_record_field(
        &self,
        field: &FieldDescriptor,
        id: SchemaId,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let config = &field.config;

        let gt_null = is_null_equivalent(gt);
        let pred_null = is_null_equivalent(pred);
        if gt_null && pred_null {
            return Ok(NodeResult::leaf(Classification::Tn, 1.0)
                .with_scores(1.0, 1.0, config.weight));
        }
        if gt_null || pred_null {
            let label = if gt_null {
                Classification::Fa
            } else {
                Classification::Fn
            };
            let mut node =
                NodeResult::branch(NodeKind::Record, Counts::single(label), 0.0, false)
                    .with_scores(0.0, applied_score(0.0, config), config.weight);
            node.push_non_match(self.absence_non_match(&field.name, label, gt, pred));
            return Ok(node);
        }

        if !gt.is_object() || !pred.is_object() {
            // A scalar or list where a record is declared.
            let mut node = NodeResult::leaf(Classification::Fd, 0.0).with_scores(
                0.0,
                applied_score(0.0, config),
                config.weight,
            );
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fd,
                display_value(gt).into(),
                display_value(pred).into(),
                Some(0.0),
                "type mismatch",
            ));
            return Ok(node);
        }

        let mut inner = self.compare_record(id, gt, pred)?;
        let raw = inner.overall.similarity_score;
        let label = classify_pair(raw, config.threshold);
        let matched = label == Classification::Tp && inner.overall.all_fields_matched;

        let mut node = NodeResult::branch(NodeKind::Record, Counts::single(label), raw, matched)
            .with_scores(raw, applied_score(raw, config), config.weight);
        node.absorb_non_matches(&mut inner, Some(&field.name));
        if label == Classification::Fd {
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fd,
                display_value(gt).into(),
                display_value(pred).into(),
                Some(raw),
                below_threshold_reason(raw, config.threshold),
            ));
        }
        node.fields = std::mem::take(&mut inner.fields);
        Ok(node)
    }

    /// The TN/FA/FN corners of the primitive null table; `None` means
    /// both sides are present
    fn null_table(
        &self,
        field: &FieldDescriptor,
        gt: &Value,
        pred: &Value,
    ) -> Option<NodeResult> {
        let config = &field.config;
        let gt_null = is_null_equivalent(gt);
        let pred_null = is_null_equivalent(pred);
        match (gt_null, pred_null) {
            (true, true) => Some(
                NodeResult::leaf(Classification::Tn, 1.0).with_scores(1.0, 1.0, config.weight),
            ),
            (true, false) => {
                let mut node = NodeResult::leaf(Classification::Fa, 0.0).with_scores(
                    0.0,
                    applied_score(0.0, config),
                    config.weight,
                );
                node.push_non_match(self.absence_non_match(
                    &field.name,
                    Classification::Fa,
                    gt,
                    pred,
                ));
                Some(node)
            }
            (false, true) => {
                let mut node = NodeResult::leaf(Classification::Fn, 0.0).with_scores(
                    0.0,
                    applied_score(0.0, config),
                    config.weight,
                );
                node.push_non_match(self.absence_non_match(
                    &field.name,
                    Classification::Fn,
                    gt,
                    pred,
                ));
                Some(node)
            }
            (false, false) => None,
        }
    }

    fn absence_non_match(
        &self,
        path: &str,
        label: Classification,
        gt: &Value,
        pred: &Value,
    ) -> NonMatch {
        match label {
            Classification::Fa => NonMatch::new(
                path,
                label,
                Value::Null,
                display_value(pred).into(),
                None,
                "extra in prediction",
            ),
            _ => NonMatch::new(
                path,
                label,
                display_value(gt).into(),
                Value::Null,
                None,
                "missing in prediction",
            ),
        }
    }

    /// Resolve the comparator name for a primitive-shaped field
    pub(crate) fn comparator_name<'f>(&self, field: &'f FieldDescriptor) -> Result<&'f str> {
        field
            .config
            .comparator
            .as_deref()
            .or_else(|| field.field_type.default_comparator())
            .ok_or_else(|| Error::UnknownComparator(field.name.clone()))
    }

    /// Score one primitive pair through the field's comparator
    ///
    /// A failing comparator scores 0.0 and the pair classifies as FD;
    /// out-of-range scores are clamped.
    pub(crate) fn element_similarity(
        &self,
        field: &FieldDescriptor,
        gt: &Value,
        pred: &Value,
    ) -> Result<f64> {
        let name = self.comparator_name(field)?;
        let comparator = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownComparator(name.to_string()))?;
        Ok(match comparator.similarity(gt, pred) {
            Ok(score) => score.clamp(0.0, 1.0),
            Err(err) => {
                tracing::debug!(comparator = name, error = %err, "comparator failed, scoring 0.0");
                0.0
            }
        })
    }
}
