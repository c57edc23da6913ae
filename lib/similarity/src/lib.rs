//! # Stickler Similarity
//!
//! Similarity functions and the registry the comparison engine resolves
//! them from.
//!
//! Every comparator scores a ground-truth value against a predicted
//! value and returns a similarity in [0,1] where 1.0 means identical.
//! The built-ins cover the common cases — strict equality, normalized
//! edit distance, numeric tolerance bands, token and trigram overlap —
//! and callers can register their own implementations (including ones
//! that call out to embedding or LLM services) behind the same
//! [`Comparator`] trait.
//!
//! ## Example
//!
//! ```rust
//! use stickler_similarity::ComparatorRegistry;
//! use serde_json::json;
//!
//! let registry = ComparatorRegistry::with_defaults();
//! let edit = registry.get("edit-distance").unwrap();
//! let sim = edit.similarity(&json!("apple"), &json!("aple")).unwrap();
//! assert!(sim > 0.7);
//! ```

pub mod comparator;
pub mod distance;
pub mod registry;

pub use comparator::{
    Comparator, ComparatorError, EditDistance, Exact, ExactCaseInsensitive, Jaccard, Tolerance,
    Trigram, DEFAULT_TOLERANCE,
};
pub use distance::{
    absolute_number_similarity, edit_distance_similarity, jaccard_tokens,
    relative_number_similarity, trigram_similarity,
};
pub use registry::ComparatorRegistry;
