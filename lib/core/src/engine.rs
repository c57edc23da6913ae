//! Comparison engine
//!
//! Drives one recursive traversal over a ground-truth/prediction record
//! pair and assembles the result tree. The traversal itself lives on
//! [`Walker`], whose dispatch and list-comparison methods are defined
//! in the sibling modules; the post-traversal aggregate rollup is in
//! [`crate::metrics`].

use crate::counts::Counts;
use crate::error::{Error, Result};
use crate::metrics;
use crate::result::{ComparisonResult, NodeKind, NodeResult, RESULT_FORMAT_VERSION};
use crate::value;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stickler_schema::{SchemaId, SchemaSet};
use stickler_similarity::ComparatorRegistry;
use tracing::debug;

/// Options for one comparison
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Emit the hierarchical aggregate blocks when rendering
    pub include_confusion_matrix: bool,
    /// Emit the flat non-match list at the root when rendering
    pub document_non_matches: bool,
    /// Render the derived-metrics reshape instead of the counts tree
    pub evaluator_format: bool,
    /// Compute recall as `tp / (tp + fn + fd)` in derived metrics
    pub recall_with_fd: bool,
    /// Attach derived metrics to every aggregate block
    pub add_derived_metrics: bool,
    /// Cooperative cancellation signal
    pub cancel: Option<CancelToken>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            include_confusion_matrix: true,
            document_non_matches: false,
            evaluator_format: false,
            recall_with_fd: false,
            add_derived_metrics: true,
            cancel: None,
        }
    }
}

/// Cooperative cancellation handle
///
/// Cloned tokens share one flag. The engine checks it between fields
/// and before each record-list matrix entry; a cancelled comparison
/// returns [`Error::Cancelled`] and emits no partial tree.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`CancelToken::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The comparison engine: a schema set plus a comparator registry
///
/// Holds both by shared reference for the duration of a call; neither
/// is mutated, and independent comparisons may run in parallel without
/// coordination.
#[derive(Debug)]
pub struct ComparisonEngine<'a> {
    schemas: &'a SchemaSet,
    registry: &'a ComparatorRegistry,
}

impl<'a> ComparisonEngine<'a> {
    /// Create an engine, validating the schema set against the registry
    ///
    /// Every comparator name a field references (explicitly or through
    /// its per-type default) must resolve, otherwise the engine is
    /// rejected up front.
    pub fn new(schemas: &'a SchemaSet, registry: &'a ComparatorRegistry) -> Result<Self> {
        schemas.validate(|name| registry.contains(name))?;
        Ok(Self { schemas, registry })
    }

    /// Compare a ground-truth record against a prediction
    ///
    /// Both values must be instances of the `root` schema; a top-level
    /// value that is neither an object nor null-equivalent is a
    /// precondition failure. Data-level disagreements never error —
    /// they classify.
    pub fn compare(
        &self,
        gt: &Value,
        pred: &Value,
        root: SchemaId,
        options: &CompareOptions,
    ) -> Result<ComparisonResult> {
        let schema = self.schemas.get(root);
        for record in [gt, pred] {
            if !record.is_object() && !value::is_null_equivalent(record) {
                return Err(Error::TypeMismatch(schema.name.clone()));
            }
        }

        debug!(
            schema = %schema.name,
            fields = schema.fields.len(),
            "comparing record pair"
        );

        let walker = Walker {
            schemas: self.schemas,
            registry: self.registry,
            cancel: options.cancel.clone(),
        };
        let mut node = walker.compare_record(root, gt, pred)?;
        metrics::fill_aggregates(&mut node, options);

        debug!(
            score = node.overall.similarity_score,
            all_fields_matched = node.overall.all_fields_matched,
            non_matches = node.non_matches.len(),
            "comparison complete"
        );

        Ok(ComparisonResult {
            version: RESULT_FORMAT_VERSION,
            root: node,
            options: options.clone(),
        })
    }
}

/// One-shot convenience wrapper around [`ComparisonEngine`]
pub fn compare(
    gt: &Value,
    pred: &Value,
    schemas: &SchemaSet,
    root: SchemaId,
    registry: &ComparatorRegistry,
    options: &CompareOptions,
) -> Result<ComparisonResult> {
    ComparisonEngine::new(schemas, registry)?.compare(gt, pred, root, options)
}

/// Traversal state shared by the dispatcher and the list comparators
pub(crate) struct Walker<'a> {
    pub(crate) schemas: &'a SchemaSet,
    pub(crate) registry: &'a ComparatorRegistry,
    pub(crate) cancel: Option<CancelToken>,
}

impl Walker<'_> {
    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Compare two record values under a schema
    ///
    /// Walks the declared fields in order, dispatches each pair, and
    /// accumulates counts, the weighted score, and the matched flag.
    /// Serves the root comparison, nested record fields, and
    /// record-list pairs alike.
    pub(crate) fn compare_record(
        &self,
        id: SchemaId,
        gt: &Value,
        pred: &Value,
    ) -> Result<NodeResult> {
        let schema = self.schemas.get(id);
        let mut node = NodeResult::branch(NodeKind::Record, Counts::default(), 0.0, true);
        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        let mut all_matched = true;

        for field in &schema.fields {
            self.check_cancelled()?;
            let gt_val = value::field_value(gt, &field.name);
            let pred_val = value::field_value(pred, &field.name);
            let mut child = self.dispatch_field(field, gt_val, pred_val)?;

            node.overall.counts.add(&child.overall.counts);
            if let Some(scores) = child.scores {
                total_score += scores.threshold_applied_score * scores.weight;
                total_weight += scores.weight;
            }
            all_matched &= child.overall.all_fields_matched;

            // Child entries already carry paths rooted at their field name.
            node.absorb_non_matches(&mut child, None);
            node.fields.insert(field.name.clone(), child);
        }

        node.overall.similarity_score = if total_weight > 0.0 {
            total_score / total_weight
        } else if value::is_null_equivalent(gt) && value::is_null_equivalent(pred) {
            1.0
        } else {
            0.0
        };
        node.overall.all_fields_matched = all_matched;
        Ok(node)
    }
}
