//! Primitive-list comparator
//!
//! Compares two order-irrelevant lists of primitives. Every element of
//! one side is scored against every element of the other, optimal
//! assignment picks the pairing, and each matched pair classifies
//! against the field threshold. Unmatched ground-truth elements are
//! misses, unmatched predicted elements are false alarms.

use crate::assignment;
use crate::counts::{classify_pair, Classification, Counts};
use crate::dispatch::below_threshold_reason;
use crate::engine::Walker;
use crate::error::Result;
use crate::result::{NodeKind, NodeResult, NonMatch};
use crate::value::{display_value, is_null_equivalent, matches_prim};
use serde_json::Value;
use stickler_schema::{FieldDescriptor, PrimType};

/// Borrow a list value's items; null-equivalent values read as empty
pub(crate) fn list_items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// True when a non-null value cannot be a list at all
pub(crate) fn list_shape_mismatch(value: &Value) -> bool {
    !value.is_array() && !is_null_equivalent(value)
}

impl Walker<'_> {
    /// Compare two primitive lists by optimal assignment
    pub(crate) fn compare_primitive_list(
        &self,
        field: &FieldDescriptor,
        prim: PrimType,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let config = &field.config;

        // A scalar where a list is declared fails the whole field.
        if list_shape_mismatch(gt) || list_shape_mismatch(pred) {
            let mut node = NodeResult::leaf(Classification::Fd, 0.0)
                .with_scores(0.0, 0.0, config.weight);
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

        let gt_items = list_items(gt);
        let pred_items = list_items(pred);

        if gt_items.is_empty() && pred_items.is_empty() {
            return Ok(NodeResult::leaf(Classification::Tn, 1.0)
                .with_scores(1.0, 1.0, config.weight));
        }
        if gt_items.is_empty() || pred_items.is_empty() {
            return Ok(self.one_sided_list(field, NodeKind::PrimList, gt_items, pred_items));
        }

        // Element similarity matrix, then optimal pairing.
        let mut matrix = vec![vec![0.0; pred_items.len()]; gt_items.len()];
        for (i, g) in gt_items.iter().enumerate() {
            for (j, p) in pred_items.iter().enumerate() {
                matrix[i][j] = if matches_prim(prim, g) && matches_prim(prim, p) {
                    self.element_similarity(field, g, p)?
                } else {
                    0.0
                };
            }
        }
        let assignment = assignment::solve(&matrix);

        let mut counts = Counts::default();
        let mut matched_total = 0.0;
        let mut fd_entries = Vec::new();
        for &(i, j) in &assignment.pairs {
            let score = matrix[i][j];
            matched_total += score;
            let label = classify_pair(score, config.threshold);
            counts.record(label);
            if label == Classification::Fd {
                fd_entries.push(NonMatch::new(
                    &field.name,
                    Classification::Fd,
                    display_value(&gt_items[i]).into(),
                    display_value(&pred_items[j]).into(),
                    Some(score),
                    below_threshold_reason(score, config.threshold),
                ));
            }
        }

        // Unmatched positions contribute 0 to the mean.
        let raw = matched_total / gt_items.len().max(pred_items.len()) as f64;
        let mut node = NodeResult::branch(NodeKind::PrimList, counts, raw, true);
        node.non_matches = fd_entries;
        for &i in &assignment.unmatched_gt {
            node.overall.counts.record(Classification::Fn);
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fn,
                display_value(&gt_items[i]).into(),
                Value::Null,
                None,
                "missing in prediction",
            ));
        }
        for &j in &assignment.unmatched_pred {
            node.overall.counts.record(Classification::Fa);
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fa,
                Value::Null,
                display_value(&pred_items[j]).into(),
                None,
                "extra in prediction",
            ));
        }
        node.overall.all_fields_matched = node.overall.counts.mismatch_free();

        // Lists never clip.
        Ok(node.with_scores(raw, raw, config.weight))
    }

    /// One side empty: every element of the other side is a miss or a
    /// false alarm; no element comparison happens
    pub(crate) fn one_sided_list(
        &self,
        field: &FieldDescriptor,
        kind: NodeKind,
        gt_items: &[Value],
        pred_items: &[Value],
    ) -> NodeResult {
        let config = &field.config;
        let mut counts = Counts::default();
        let mut node = NodeResult::branch(kind, Counts::default(), 0.0, false);
        for item in gt_items {
            counts.record(Classification::Fn);
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fn,
                display_value(item).into(),
                Value::Null,
                None,
                "missing in prediction",
            ));
        }
        for item in pred_items {
            counts.record(Classification::Fa);
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fa,
                Value::Null,
                display_value(item).into(),
                None,
                "extra in prediction",
            ));
        }
        node.overall.counts = counts;
        node.with_scores(0.0, 0.0, config.weight)
    }
}
