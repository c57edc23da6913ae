//! Record-list comparator
//!
//! The heart of the engine. Two lists of nested records are paired by
//! optimal assignment over full recursive comparison scores, then
//! recursion into a pair's fields is gated by the element schema's
//! match threshold: a pair at or above it contributes its per-field
//! results to the list node's children, a pair below it is one atomic
//! false discovery. `overall` at the list node counts objects;
//! aggregates later count the primitives reached through gated pairs.

use crate::assignment;
use crate::counts::{meets_threshold, Classification, Counts};
use crate::engine::Walker;
use crate::error::Result;
use crate::list_primitive::{list_items, list_shape_mismatch};
use crate::result::{NodeKind, NodeResult, NonMatch};
use crate::value::{display_value, is_null_equivalent};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value;
use stickler_schema::{FieldDescriptor, SchemaId};
use tracing::trace;

impl Walker<'_> {
    /// Compare two lists of nested records
    pub(crate) fn compare_record_list(
        &self,
        field: &FieldDescriptor,
        element: SchemaId,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let config = &field.config;

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
            return Ok(self.one_sided_list(field, NodeKind::RecordList, gt_items, pred_items));
        }

        let tau = self.schemas.get(element).match_threshold;

        // Full recursive compare of every (gt, pred) pair. Entries are
        // independent, so rows fan out over rayon; the index-ordered
        // collect keeps the outcome deterministic.
        let computed: Result<Vec<Vec<NodeResult>>> = gt_items
            .par_iter()
            .map(|g| {
                pred_items
                    .iter()
                    .map(|p| {
                        self.check_cancelled()?;
                        self.compare_pair(element, g, p)
                    })
                    .collect()
            })
            .collect();
        let matrix_nodes = computed?;

        let matrix: Vec<Vec<f64>> = matrix_nodes
            .iter()
            .map(|row| row.iter().map(|n| n.overall.similarity_score).collect())
            .collect();
        let assignment = assignment::solve(&matrix);

        // Re-wrap so gated-in pair results can be moved out, not cloned.
        let mut pool: Vec<Vec<Option<NodeResult>>> = matrix_nodes
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect();

        let mut counts = Counts::default();
        let mut matched_total = 0.0;
        let mut all_matched = true;
        let mut merged: IndexMap<String, NodeResult> = IndexMap::new();
        let mut gated_out = Vec::new();
        let mut node = NodeResult::branch(NodeKind::RecordList, Counts::default(), 0.0, true);

        for &(i, j) in &assignment.pairs {
            let score = matrix[i][j];
            matched_total += score;
            let gated_in = meets_threshold(score, tau);
            trace!(
                field = %field.name,
                gt_index = i,
                pred_index = j,
                similarity = score,
                gated_in,
                "record pair"
            );

            if gated_in {
                counts.record(Classification::Tp);
                let mut pair = pool[i][j].take().expect("each pair is assigned once");
                all_matched &= pair.overall.all_fields_matched;
                node.absorb_non_matches(&mut pair, Some(&format!("{}[{i}]", field.name)));
                for (name, child) in pair.fields {
                    merge_child(&mut merged, name, child);
                }
            } else {
                // Atomic FD: no recursion into this pair's fields.
                counts.record(Classification::Fd);
                gated_out.push(NonMatch::new(
                    &field.name,
                    Classification::Fd,
                    display_value(&gt_items[i]).into(),
                    display_value(&pred_items[j]).into(),
                    Some(score),
                    format!("below match_threshold ({score:.4} < {tau})"),
                ));
            }
        }

        node.non_matches.extend(gated_out);
        for &i in &assignment.unmatched_gt {
            counts.record(Classification::Fn);
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
            counts.record(Classification::Fa);
            node.push_non_match(NonMatch::new(
                &field.name,
                Classification::Fa,
                Value::Null,
                display_value(&pred_items[j]).into(),
                None,
                "extra in prediction",
            ));
        }

        let raw = matched_total / gt_items.len().max(pred_items.len()) as f64;
        node.overall.counts = counts;
        node.overall.similarity_score = raw;
        node.overall.all_fields_matched = counts.mismatch_free() && all_matched;
        node.fields = merged;

        // Lists never clip.
        Ok(node.with_scores(raw, raw, config.weight))
    }

    /// One matrix entry: a full recursive compare of two list elements
    ///
    /// An element that is not a record at all scores 0.0 and, if
    /// assigned, becomes an atomic FD through the gate.
    fn compare_pair(&self, element: SchemaId, gt: &Value, pred: &Value) -> Result<NodeResult> {
        if (!gt.is_object() && !is_null_equivalent(gt))
            || (!pred.is_object() && !is_null_equivalent(pred))
        {
            return Ok(NodeResult::branch(
                NodeKind::Record,
                Counts::default(),
                0.0,
                false,
            ));
        }
        self.compare_record(element, gt, pred)
    }
}

/// Merge one gated-in pair's field result into the accumulated children
fn merge_child(acc: &mut IndexMap<String, NodeResult>, name: String, node: NodeResult) {
    match acc.entry(name) {
        indexmap::map::Entry::Occupied(mut entry) => merge_nodes(entry.get_mut(), node),
        indexmap::map::Entry::Vacant(entry) => {
            entry.insert(node);
        }
    }
}

/// Sum counts and recursively merge children; scores become running
/// means over the contributing pairs
fn merge_nodes(acc: &mut NodeResult, other: NodeResult) {
    let n = acc.merged_from as f64;
    let m = other.merged_from as f64;

    acc.overall.counts.add(&other.overall.counts);
    acc.overall.all_fields_matched &= other.overall.all_fields_matched;
    acc.overall.similarity_score =
        (acc.overall.similarity_score * n + other.overall.similarity_score * m) / (n + m);
    if let (Some(mine), Some(theirs)) = (acc.scores.as_mut(), other.scores.as_ref()) {
        mine.raw_similarity_score =
            (mine.raw_similarity_score * n + theirs.raw_similarity_score * m) / (n + m);
        mine.threshold_applied_score =
            (mine.threshold_applied_score * n + theirs.threshold_applied_score * m) / (n + m);
    }
    acc.merged_from += other.merged_from;

    for (name, child) in other.fields {
        merge_child(&mut acc.fields, name, child);
    }
}
