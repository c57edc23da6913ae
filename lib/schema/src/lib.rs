//! # Stickler Schema
//!
//! The comparison contract for stickler: record schemas, field types,
//! and per-field comparison configuration.
//!
//! A schema describes a record type field by field. Each field carries a
//! declared type plus a config block: which comparator scores it, the
//! classification threshold, the weight of the field in its parent
//! score, and flags controlling clipping and aggregate participation.
//! Record schemas used inside lists additionally carry a
//! `match_threshold` that gates recursion into matched pairs.
//!
//! ## Example
//!
//! ```rust
//! use stickler_schema::parse_schema;
//! use serde_json::json;
//!
//! let doc = json!({
//!     "title": "Invoice",
//!     "type": "object",
//!     "properties": {
//!         "invoice_number": {"type": "string", "x-comparator": "exact", "x-weight": 2.0},
//!         "total": {"type": "number", "x-threshold": 0.95}
//!     }
//! });
//! let (set, root) = parse_schema(&doc).unwrap();
//! assert_eq!(set.get(root).name, "Invoice");
//! ```
//!
//! Nested schemas are interned into a [`SchemaSet`] and addressed by
//! [`SchemaId`] index handles, so a record type referenced from two list
//! fields is shared without any pointer plumbing.

pub mod parse;
pub mod schema;

pub use parse::parse_schema;
pub use schema::{
    FieldConfig, FieldDescriptor, FieldType, PrimType, RecordSchema, SchemaError, SchemaId,
    SchemaSet, DEFAULT_BOOL_THRESHOLD, DEFAULT_MATCH_THRESHOLD, DEFAULT_THRESHOLD, DEFAULT_WEIGHT,
};
