//! # Stickler Core
//!
//! The comparison engine: one recursive traversal over a schema-bound
//! record pair produces a weighted similarity score, a hierarchical
//! confusion matrix, and detailed non-match records.
//!
//! - [`ComparisonEngine`] - validates a schema set against a comparator
//!   registry and drives comparisons
//! - [`CompareOptions`] - per-comparison switches (confusion matrix,
//!   non-match documentation, evaluator reshape, recall variant)
//! - [`ComparisonResult`] - the frozen result tree, rendered to JSON by
//!   [`ComparisonResult::to_value`]
//! - [`assignment`] - the Hungarian matching used to pair list elements
//!
//! ## Example
//!
//! ```rust
//! use stickler_core::{compare, CompareOptions};
//! use stickler_schema::parse_schema;
//! use stickler_similarity::ComparatorRegistry;
//! use serde_json::json;
//!
//! let doc = json!({
//!     "title": "Contact",
//!     "type": "object",
//!     "properties": {
//!         "name": {"type": "string"},
//!         "phone": {"type": "string", "x-comparator": "exact"}
//!     }
//! });
//! let (schemas, root) = parse_schema(&doc).unwrap();
//! let registry = ComparatorRegistry::with_defaults();
//!
//! let gt = json!({"name": "John", "phone": "555-1"});
//! let pred = json!({"name": "John"});
//! let result = compare(&gt, &pred, &schemas, root, &registry, &CompareOptions::default()).unwrap();
//!
//! assert!(!result.all_fields_matched());
//! assert_eq!(result.aggregate_counts().tp, 1);
//! assert_eq!(result.aggregate_counts().fn_, 1);
//! ```

pub mod assignment;
pub mod counts;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod list_primitive;
pub mod list_record;
pub mod metrics;
pub mod result;
pub mod value;

pub use assignment::Assignment;
pub use counts::{
    classify_pair, meets_threshold, Classification, Counts, DerivedMetrics, SCORE_EPSILON,
};
pub use engine::{compare, CancelToken, CompareOptions, ComparisonEngine};
pub use error::{Error, Result};
pub use metrics::EvaluatorSummary;
pub use result::{
    Aggregate, ComparisonResult, FieldScores, NodeResult, NonMatch, Overall,
    RESULT_FORMAT_VERSION,
};
pub use value::is_null_equivalent;
