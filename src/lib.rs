//! # Stickler
//!
//! A schema-driven comparison engine for structured outputs.
//!
//! Stickler evaluates schema-described records (documents extracted by
//! machine-learning systems, for example) against ground-truth
//! references. One recursive traversal produces three things at once:
//!
//! - a **weighted similarity score** per node, rolled up from per-field
//!   comparator scores and weights;
//! - a **hierarchical confusion matrix** with aggregate counts and
//!   derived precision/recall/F1/accuracy at every level;
//! - detailed **non-match records** with dotted field paths and
//!   human-readable reasons.
//!
//! Lists are compared order-independently: primitive lists by optimal
//! assignment over element similarities, record lists by Hungarian
//! matching over full recursive comparison scores with recursion gated
//! by the element schema's match threshold.
//!
//! ## Quick Start
//!
//! ```rust
//! use stickler::prelude::*;
//! use serde_json::json;
//!
//! // Describe the record type, with per-field comparison config.
//! let doc = json!({
//!     "title": "Invoice",
//!     "type": "object",
//!     "properties": {
//!         "invoice_number": {"type": "string", "x-comparator": "exact", "x-weight": 2.0},
//!         "total": {"type": "number", "x-threshold": 0.95},
//!         "tags": {"type": "array", "items": {"type": "string"}}
//!     }
//! });
//! let (schemas, root) = parse_schema(&doc).unwrap();
//! let registry = ComparatorRegistry::with_defaults();
//!
//! let gt = json!({"invoice_number": "INV-1", "total": 100.0, "tags": ["net30"]});
//! let pred = json!({"invoice_number": "INV-1", "total": 100.0, "tags": ["net30"]});
//!
//! let result = compare(&gt, &pred, &schemas, root, &registry, &CompareOptions::default()).unwrap();
//! assert_eq!(result.overall_score(), 1.0);
//! assert!(result.all_fields_matched());
//! ```
//!
//! ## Crate Structure
//!
//! Stickler is composed of several crates:
//!
//! - [`stickler-schema`](https://docs.rs/stickler-schema) - record schemas,
//!   field config, and the JSON exchange format
//! - [`stickler-similarity`](https://docs.rs/stickler-similarity) - the
//!   comparator trait, registry, and built-in similarity functions
//! - [`stickler-core`](https://docs.rs/stickler-core) - the comparison
//!   engine, dispatcher, assignment solver, and metrics builder

// Re-export schema types
pub use stickler_schema::{
    parse_schema, FieldConfig, FieldDescriptor, FieldType, PrimType, RecordSchema, SchemaError,
    SchemaId, SchemaSet,
};

// Re-export similarity functions and registry
pub use stickler_similarity::{Comparator, ComparatorError, ComparatorRegistry, Tolerance};

// Re-export the engine
pub use stickler_core::{
    compare, CancelToken, Classification, CompareOptions, ComparisonEngine, ComparisonResult,
    Counts, DerivedMetrics, Error, EvaluatorSummary, NonMatch, Result,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        compare, parse_schema, CancelToken, Classification, CompareOptions, Comparator,
        ComparatorError, ComparatorRegistry, ComparisonEngine, ComparisonResult, Counts,
        DerivedMetrics, Error, EvaluatorSummary, FieldConfig, FieldDescriptor, FieldType, NonMatch,
        PrimType, RecordSchema, Result, SchemaId, SchemaSet,
    };
}
