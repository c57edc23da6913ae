//! Metrics builder
//!
//! Post-traversal pass: a post-order walk fills every node's aggregate
//! block (primitive-level counts over the subtree) and, on request,
//! derived precision/recall/F1/accuracy. Also home to the evaluator
//! reshape of the top level.

use crate::counts::{Counts, DerivedMetrics};
use crate::engine::CompareOptions;
use crate::result::{Aggregate, ComparisonResult, NodeKind, NodeResult};
use indexmap::IndexMap;
use serde::Serialize;

/// Fill `aggregate` on every node of a freshly built tree
///
/// Leaves and primitive lists already count primitives in `overall`,
/// so their aggregate copies it; record and record-list nodes sum their
/// children. At the root, fields opting out of aggregation are skipped
/// for the rollup while keeping their own blocks intact.
pub(crate) fn fill_aggregates(node: &mut NodeResult, options: &CompareOptions) {
    fill(node, options, true);
}

fn fill(node: &mut NodeResult, options: &CompareOptions, is_root: bool) {
    for child in node.fields.values_mut() {
        fill(child, options, false);
    }

    let counts = match node.kind {
        NodeKind::Leaf | NodeKind::PrimList => node.overall.counts,
        NodeKind::Record | NodeKind::RecordList => {
            let mut sum = Counts::default();
            for child in node.fields.values() {
                if is_root && !child.include_in_aggregate {
                    continue;
                }
                let aggregate = child
                    .aggregate
                    .as_ref()
                    .expect("children are filled before their parent");
                sum.add(&aggregate.counts);
            }
            sum
        }
    };

    let derived = options
        .add_derived_metrics
        .then(|| DerivedMetrics::from_counts(&counts, options.recall_with_fd));
    node.aggregate = Some(Aggregate { counts, derived });
}

/// The evaluator reshape of a comparison result
///
/// Replaces the counts tree with top-level derived metrics plus the
/// overall similarity as `anls_score`; each top-level field exposes its
/// own derived block. Never mixed with the standard shape.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatorSummary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    /// The root weighted similarity score
    pub anls_score: f64,
    /// Per-field derived metrics, in declared order
    pub fields: IndexMap<String, DerivedMetrics>,
}

impl EvaluatorSummary {
    /// Build the reshape from a finished result
    pub fn from_result(result: &ComparisonResult) -> Self {
        let recall_with_fd = result.options.recall_with_fd;
        let root = DerivedMetrics::from_counts(result.aggregate_counts(), recall_with_fd);
        let fields = result
            .root
            .fields
            .iter()
            .map(|(name, child)| {
                let counts = child
                    .aggregate
                    .as_ref()
                    .map(|a| a.counts)
                    .unwrap_or_default();
                (
                    name.clone(),
                    DerivedMetrics::from_counts(&counts, recall_with_fd),
                )
            })
            .collect();
        Self {
            precision: root.precision,
            recall: root.recall,
            f1: root.f1,
            accuracy: root.accuracy,
            anls_score: result.overall_score(),
            fields,
        }
    }
}
