//! Comparison result tree
//!
//! Every level of a comparison — the root record, nested records, list
//! fields, primitive leaves — is reported through the same node shape:
//! `overall` counts and score at that level, `fields` children, and a
//! post-traversal `aggregate` block summing primitive-level counts over
//! the subtree. Nodes produced for a field additionally carry the raw
//! score, the threshold-applied score, and the weight their parent used
//! for rollup math.

use crate::counts::{Classification, Counts, DerivedMetrics};
use crate::engine::CompareOptions;
use crate::metrics::EvaluatorSummary;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Version stamp of the serialized result shape
pub const RESULT_FORMAT_VERSION: u32 = 1;

/// Structural role of a node, used by the aggregate rollup
///
/// Leaf and primitive-list nodes already count primitives in `overall`,
/// so their aggregate copies it; record and record-list nodes count
/// objects in `overall` and sum their children for `aggregate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A primitive pair, or a degenerate case reported atomically (TN
    /// leaves, type mismatches)
    Leaf,
    /// An order-irrelevant list of primitives
    PrimList,
    /// A record: the root, a nested record field, or one record-list pair
    Record,
    /// An assignment-matched list of records
    RecordList,
}

/// Counts and score at one hierarchical level
#[derive(Debug, Clone, Serialize)]
pub struct Overall {
    #[serde(flatten)]
    pub counts: Counts,
    /// Weighted similarity at this level
    pub similarity_score: f64,
    /// True when nothing in this subtree was misclassified
    pub all_fields_matched: bool,
}

/// Scores a parent consumes when rolling a field into its own score
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldScores {
    /// Comparator output before clipping
    pub raw_similarity_score: f64,
    /// Score the parent actually accumulates; zeroed below threshold
    /// when the field clips
    pub threshold_applied_score: f64,
    /// Contribution weight from the field config
    pub weight: f64,
}

/// Post-traversal rollup of primitive-level counts over a subtree
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    #[serde(flatten)]
    pub counts: Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedMetrics>,
}

/// One non-matching pair, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct NonMatch {
    /// Dotted path from the root; list pairs append `[gt_index]`
    pub field_path: String,
    /// FD, FA, or FN
    pub kind: Classification,
    /// Ground-truth value rendered for display, null when absent
    pub gt_value: Value,
    /// Predicted value rendered for display, null when absent
    pub pred_value: Value,
    /// Pair similarity when one was computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Human-readable context; always carries a `reason`
    pub details: Map<String, Value>,
}

impl NonMatch {
    pub(crate) fn new(
        field_path: impl Into<String>,
        kind: Classification,
        gt_value: Value,
        pred_value: Value,
        similarity: Option<f64>,
        reason: impl Into<String>,
    ) -> Self {
        let mut details = Map::new();
        details.insert("reason".to_string(), Value::String(reason.into()));
        Self {
            field_path: field_path.into(),
            kind,
            gt_value,
            pred_value,
            similarity,
            details,
        }
    }

    /// Attach an extra detail entry
    pub(crate) fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Re-anchor the path under a parent segment, e.g. `items[2]`
    pub(crate) fn prefix_path(&mut self, prefix: &str) {
        self.field_path = format!("{prefix}.{}", self.field_path);
    }
}

/// One node of the result tree
#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
    pub overall: Overall,

    /// Children in declared schema order; empty for leaves and
    /// primitive lists
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, NodeResult>,

    /// Filled by the metrics builder after traversal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,

    /// Present on every node created for a field; absent at the root
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub scores: Option<FieldScores>,

    /// Non-matches found in this subtree; drained upward during
    /// traversal so only the root's list survives
    #[serde(skip)]
    pub non_matches: Vec<NonMatch>,

    #[serde(skip)]
    pub(crate) kind: NodeKind,

    /// Whether the root rollup includes this subtree (top-level only)
    #[serde(skip)]
    pub(crate) include_in_aggregate: bool,

    /// How many record-list pairs were merged into this node; scores on
    /// merged nodes are running means over the contributors
    #[serde(skip)]
    pub(crate) merged_from: u32,
}

impl NodeResult {
    /// A leaf carrying a single classification
    pub(crate) fn leaf(label: Classification, raw: f64) -> Self {
        let counts = Counts::single(label);
        Self::branch(NodeKind::Leaf, counts, raw, counts.mismatch_free())
    }

    /// A childless node with explicit counts and score
    pub(crate) fn branch(
        kind: NodeKind,
        counts: Counts,
        similarity: f64,
        all_fields_matched: bool,
    ) -> Self {
        Self {
            overall: Overall {
                counts,
                similarity_score: similarity,
                all_fields_matched,
            },
            fields: IndexMap::new(),
            aggregate: None,
            scores: None,
            non_matches: Vec::new(),
            kind,
            include_in_aggregate: true,
            merged_from: 1,
        }
    }

    /// Attach the scores the parent consumes for rollup math
    pub(crate) fn with_scores(mut self, raw: f64, applied: f64, weight: f64) -> Self {
        self.scores = Some(FieldScores {
            raw_similarity_score: raw,
            threshold_applied_score: applied,
            weight,
        });
        self
    }

    /// Record a non-match local to this node
    pub(crate) fn push_non_match(&mut self, non_match: NonMatch) {
        self.non_matches.push(non_match);
    }

    /// Move a child's non-matches into this node, re-anchored under
    /// `prefix` when one is given
    pub(crate) fn absorb_non_matches(&mut self, child: &mut NodeResult, prefix: Option<&str>) {
        if let Some(prefix) = prefix {
            for nm in &mut child.non_matches {
                nm.prefix_path(prefix);
            }
        }
        self.non_matches.append(&mut child.non_matches);
    }
}

/// The outcome of one comparison: a frozen result tree
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Result shape version
    pub version: u32,
    /// The root node; its `non_matches` list covers the whole tree
    pub root: NodeResult,
    pub(crate) options: CompareOptions,
}

impl ComparisonResult {
    /// Weighted similarity of the whole comparison
    pub fn overall_score(&self) -> f64 {
        self.root.overall.similarity_score
    }

    /// True when every field in the tree matched
    pub fn all_fields_matched(&self) -> bool {
        self.root.overall.all_fields_matched
    }

    /// Object-level counts at the root
    pub fn overall_counts(&self) -> &Counts {
        &self.root.overall.counts
    }

    /// Primitive-level counts rolled up over the whole tree
    pub fn aggregate_counts(&self) -> &Counts {
        &self
            .root
            .aggregate
            .as_ref()
            .expect("aggregate is always filled after traversal")
            .counts
    }

    /// All non-matches found, in depth-first declared-field order
    pub fn non_matches(&self) -> &[NonMatch] {
        &self.root.non_matches
    }

    /// The derived-metrics reshape of the top level
    pub fn evaluator_summary(&self) -> EvaluatorSummary {
        EvaluatorSummary::from_result(self)
    }

    /// Render the result as JSON according to the comparison options
    ///
    /// `evaluator_format` replaces the whole document with the derived
    /// reshape; otherwise the tree is emitted with the aggregate blocks
    /// (`include_confusion_matrix`) and the flat non-match list
    /// (`document_non_matches`) included on request.
    pub fn to_value(&self) -> Value {
        if self.options.evaluator_format {
            return serde_json::to_value(self.evaluator_summary())
                .expect("evaluator summary serializes");
        }

        let mut doc = serde_json::to_value(&self.root).expect("result tree serializes");
        if !self.options.include_confusion_matrix {
            strip_key(&mut doc, "aggregate");
        }
        if let Value::Object(map) = &mut doc {
            map.insert("version".to_string(), Value::from(self.version));
            if self.options.document_non_matches {
                map.insert(
                    "non_matches".to_string(),
                    serde_json::to_value(&self.root.non_matches)
                        .expect("non-match list serializes"),
                );
            }
        }
        doc
    }
}

/// Recursively remove a key from every object in a JSON tree
fn strip_key(value: &mut Value, key: &str) {
    match value {
        Value::Object(map) => {
            map.remove(key);
            for child in map.values_mut() {
                strip_key(child, key);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_key(item, key);
            }
        }
        _ => {}
    }
}
