//! Similarity registry
//!
//! A name-to-comparator table owned by the caller and handed to the
//! engine by shared reference. Schema field configs reference entries
//! by name.

use crate::comparator::{
    Comparator, EditDistance, Exact, ExactCaseInsensitive, Jaccard, Tolerance, Trigram,
};
use ahash::AHashMap;

/// Name-to-comparator lookup table
///
/// [`ComparatorRegistry::with_defaults`] covers the names the per-type
/// schema defaults refer to; [`ComparatorRegistry::register`] adds
/// caller-supplied functions (embedding or LLM backed ones included)
/// under new names or as overrides.
#[derive(Default)]
pub struct ComparatorRegistry {
    table: AHashMap<String, Box<dyn Comparator>>,
}

impl ComparatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in comparators
    ///
    /// Registered names: `exact`, `exact-ci`, `edit-distance`,
    /// `tolerance`, `jaccard`, `trigram`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("exact", Exact);
        registry.register("exact-ci", ExactCaseInsensitive);
        registry.register("edit-distance", EditDistance);
        registry.register("tolerance", Tolerance::default());
        registry.register("jaccard", Jaccard);
        registry.register("trigram", Trigram);
        registry
    }

    /// Register a comparator under a name, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, comparator: impl Comparator + 'static) {
        self.table.insert(name.into(), Box::new(comparator));
    }

    /// Look up a comparator by name
    pub fn get(&self, name: &str) -> Option<&dyn Comparator> {
        self.table.get(name).map(Box::as_ref)
    }

    /// True when `name` resolves
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Registered names, sorted for stable output
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ComparatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ComparatorError;
    use serde_json::{json, Value};

    #[test]
    fn test_defaults_cover_schema_default_names() {
        let registry = ComparatorRegistry::with_defaults();
        for name in ["exact", "edit-distance", "tolerance"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("embedding-cosine"));
    }

    #[test]
    fn test_register_custom_comparator() {
        let mut registry = ComparatorRegistry::with_defaults();
        registry.register(
            "always-match",
            |_: &Value, _: &Value| -> Result<f64, ComparatorError> { Ok(1.0) },
        );

        let cmp = registry.get("always-match").unwrap();
        assert_eq!(cmp.similarity(&json!("a"), &json!("b")).unwrap(), 1.0);
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = ComparatorRegistry::with_defaults();
        registry.register(
            "exact",
            |_: &Value, _: &Value| -> Result<f64, ComparatorError> { Ok(0.25) },
        );
        let cmp = registry.get("exact").unwrap();
        assert_eq!(cmp.similarity(&json!("a"), &json!("a")).unwrap(), 0.25);
    }

    #[test]
    fn test_names_sorted() {
        let registry = ComparatorRegistry::with_defaults();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
