//! Comparison Contract definitions
//!
//! Defines the schema types that describe a record under comparison.
//! A schema names the fields of a record, their declared types, and the
//! per-field comparison configuration (comparator, threshold, weight).
//! Nested record schemas are interned into a [`SchemaSet`] and referenced
//! by [`SchemaId`] handles, so schema trees share sub-schemas by index
//! rather than by pointer.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Default classification threshold for non-boolean fields
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default classification threshold for boolean fields
pub const DEFAULT_BOOL_THRESHOLD: f64 = 1.0;

/// Default contribution weight of a field in its parent score
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Default record-pairing threshold for record lists
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

/// Handle to a record schema interned in a [`SchemaSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub usize);

/// Primitive field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimType {
    /// UTF-8 string
    Str,
    /// Signed integer
    Int,
    /// Floating-point number
    Float,
    /// Boolean flag
    Bool,
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// A single primitive value
    Prim(PrimType),
    /// A nested record of the referenced schema
    Record(SchemaId),
    /// An order-irrelevant list of primitives
    ListPrim(PrimType),
    /// An order-irrelevant list of nested records, paired by assignment
    ListRecord(SchemaId),
    /// An explicitly nullable wrapper; comparison semantics are unchanged
    /// because absent values are already treated as null
    Optional(Box<FieldType>),
}

impl FieldType {
    /// Strip `Optional` wrappers down to the underlying type
    pub fn unwrap_optional(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// True for list-shaped types (`ListPrim` and `ListRecord`)
    pub fn is_list(&self) -> bool {
        matches!(
            self.unwrap_optional(),
            FieldType::ListPrim(_) | FieldType::ListRecord(_)
        )
    }

    /// The registry name of the comparator used when the field config
    /// does not name one. Record-shaped types recurse structurally and
    /// have no registry default.
    pub fn default_comparator(&self) -> Option<&'static str> {
        match self.unwrap_optional() {
            FieldType::Prim(p) | FieldType::ListPrim(p) => Some(match p {
                PrimType::Str => "edit-distance",
                PrimType::Int | PrimType::Float => "tolerance",
                PrimType::Bool => "exact",
            }),
            FieldType::Record(_) | FieldType::ListRecord(_) => None,
            FieldType::Optional(_) => unreachable!("unwrap_optional strips wrappers"),
        }
    }

    /// Default classification threshold for this type
    pub fn default_threshold(&self) -> f64 {
        match self.unwrap_optional() {
            FieldType::Prim(PrimType::Bool) | FieldType::ListPrim(PrimType::Bool) => {
                DEFAULT_BOOL_THRESHOLD
            }
            _ => DEFAULT_THRESHOLD,
        }
    }
}

/// Configuration for a single field of a record schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Registry name of the comparator; `None` selects the per-type default
    #[serde(default)]
    pub comparator: Option<String>,

    /// Classification cutoff in [0,1]; a pair scoring at or above it is a match
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Contribution of this field to the parent similarity score
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Zero the threshold-applied score when the raw score is below threshold
    #[serde(default)]
    pub clip_under_threshold: bool,

    /// Include this field's subtree in the root aggregate rollup
    #[serde(default = "default_true")]
    pub include_in_aggregate: bool,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn default_true() -> bool {
    true
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            comparator: None,
            threshold: DEFAULT_THRESHOLD,
            weight: DEFAULT_WEIGHT,
            clip_under_threshold: false,
            include_in_aggregate: true,
        }
    }
}

impl FieldConfig {
    /// Create a config with the per-type defaults for `field_type`
    pub fn for_type(field_type: &FieldType) -> Self {
        Self {
            threshold: field_type.default_threshold(),
            ..Self::default()
        }
    }

    /// Set the comparator name
    pub fn with_comparator(mut self, name: impl Into<String>) -> Self {
        self.comparator = Some(name.into());
        self
    }

    /// Set the classification threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the contribution weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A named, typed, configured field of a record schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears in record values
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Comparison configuration
    pub config: FieldConfig,
}

impl FieldDescriptor {
    /// Create a descriptor with the per-type default config
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let config = FieldConfig::for_type(&field_type);
        Self {
            name: name.into(),
            field_type,
            config,
        }
    }

    /// Replace the config wholesale
    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }
}

/// A record schema: a named record type with ordered field descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Schema name (used for interning and error messages)
    pub name: String,

    /// Field descriptors in declared order
    pub fields: Vec<FieldDescriptor>,

    /// Pairing threshold used when records of this type appear in a list:
    /// a matched pair at or above it triggers recursive field evaluation
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

impl RecordSchema {
    /// Create a schema with the default match threshold
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    /// Override the record-pairing threshold
    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Interning table for the record schemas of one comparison contract
///
/// Nested schemas form a tree (a DAG at worst when one record type is
/// referenced from two list fields); sharing happens through [`SchemaId`]
/// handles into this set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSet {
    schemas: Vec<RecordSchema>,
    #[serde(skip)]
    by_name: AHashMap<String, SchemaId>,
}

impl SchemaSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a schema, returning its handle
    ///
    /// A schema equal to one already interned under the same name returns
    /// the existing handle. A *different* schema under an existing name is
    /// rejected.
    pub fn insert(&mut self, schema: RecordSchema) -> Result<SchemaId, SchemaError> {
        if let Some(&id) = self.by_name.get(&schema.name) {
            if self.schemas[id.0] == schema {
                return Ok(id);
            }
            return Err(SchemaError::DuplicateSchema(schema.name));
        }
        let id = SchemaId(self.schemas.len());
        self.by_name.insert(schema.name.clone(), id);
        self.schemas.push(schema);
        Ok(id)
    }

    /// Get a schema by handle
    ///
    /// Handles are only minted by this set, so lookup cannot fail for
    /// handles obtained from [`SchemaSet::insert`].
    pub fn get(&self, id: SchemaId) -> &RecordSchema {
        &self.schemas[id.0]
    }

    /// Look up a schema handle by name
    pub fn id_of(&self, name: &str) -> Option<SchemaId> {
        self.by_name.get(name).copied()
    }

    /// Number of interned schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True when no schema has been interned
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Iterate over `(id, schema)` pairs in interning order
    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &RecordSchema)> {
        self.schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (SchemaId(i), s))
    }

    /// Validate the whole set against a comparator lookup
    ///
    /// `has_comparator` answers whether a registry resolves a name. Every
    /// primitive-shaped field must resolve either its configured comparator
    /// or its per-type default; record-shaped fields recurse structurally
    /// and are not checked against the registry.
    pub fn validate<F>(&self, has_comparator: F) -> Result<(), SchemaError>
    where
        F: Fn(&str) -> bool,
    {
        for schema in &self.schemas {
            if schema.fields.is_empty() {
                return Err(SchemaError::EmptyRecord(schema.name.clone()));
            }
            if !(0.0..=1.0).contains(&schema.match_threshold) {
                return Err(SchemaError::ThresholdOutOfRange {
                    field: schema.name.clone(),
                    value: schema.match_threshold,
                });
            }
            for field in &schema.fields {
                let path = format!("{}.{}", schema.name, field.name);
                if !(0.0..=1.0).contains(&field.config.threshold) {
                    return Err(SchemaError::ThresholdOutOfRange {
                        field: path,
                        value: field.config.threshold,
                    });
                }
                if field.config.weight <= 0.0 {
                    return Err(SchemaError::NonPositiveWeight {
                        field: path,
                        value: field.config.weight,
                    });
                }
                let comparator = field
                    .config
                    .comparator
                    .as_deref()
                    .or_else(|| field.field_type.default_comparator());
                if let Some(name) = comparator {
                    if !has_comparator(name) {
                        return Err(SchemaError::UnknownComparator {
                            field: path,
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuild the name index after deserialization
    pub fn reindex(&mut self) {
        self.by_name = self
            .schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), SchemaId(i)))
            .collect();
    }
}

/// Errors raised while building or validating a comparison contract
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Unrecognized type '{0}' in schema document")]
    UnknownType(String),

    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("Record schema '{0}' declares no fields")]
    EmptyRecord(String),

    #[error("Threshold for '{field}' must be in [0,1], got {value}")]
    ThresholdOutOfRange { field: String, value: f64 },

    #[error("Weight for '{field}' must be positive, got {value}")]
    NonPositiveWeight { field: String, value: f64 },

    #[error("Comparator '{name}' for '{field}' is not registered")]
    UnknownComparator { field: String, name: String },

    #[error("Conflicting definitions for schema '{0}'")]
    DuplicateSchema(String),

    #[error("Schema '{0}' not found")]
    UnknownSchema(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_schema() -> RecordSchema {
        RecordSchema::new(
            "Product",
            vec![
                FieldDescriptor::new("name", FieldType::Prim(PrimType::Str)),
                FieldDescriptor::new("price", FieldType::Prim(PrimType::Float)),
                FieldDescriptor::new("in_stock", FieldType::Prim(PrimType::Bool)),
            ],
        )
    }

    #[test]
    fn test_default_thresholds_by_type() {
        let schema = product_schema();
        assert_eq!(schema.field("name").unwrap().config.threshold, 0.5);
        assert_eq!(schema.field("in_stock").unwrap().config.threshold, 1.0);
        assert_eq!(schema.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn test_default_comparators_by_type() {
        assert_eq!(
            FieldType::Prim(PrimType::Str).default_comparator(),
            Some("edit-distance")
        );
        assert_eq!(
            FieldType::Prim(PrimType::Float).default_comparator(),
            Some("tolerance")
        );
        assert_eq!(
            FieldType::Prim(PrimType::Bool).default_comparator(),
            Some("exact")
        );
        assert_eq!(FieldType::Record(SchemaId(0)).default_comparator(), None);
    }

    #[test]
    fn test_optional_unwraps_for_defaults() {
        let ty = FieldType::Optional(Box::new(FieldType::Prim(PrimType::Bool)));
        assert_eq!(ty.default_threshold(), 1.0);
        assert_eq!(ty.default_comparator(), Some("exact"));
        assert!(!ty.is_list());

        let list = FieldType::Optional(Box::new(FieldType::ListPrim(PrimType::Str)));
        assert!(list.is_list());
    }

    #[test]
    fn test_interning_dedupes_equal_schemas() {
        let mut set = SchemaSet::new();
        let a = set.insert(product_schema()).unwrap();
        let b = set.insert(product_schema()).unwrap();
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_interning_rejects_conflicting_schemas() {
        let mut set = SchemaSet::new();
        set.insert(product_schema()).unwrap();

        let mut conflicting = product_schema();
        conflicting.fields.pop();
        assert!(matches!(
            set.insert(conflicting),
            Err(SchemaError::DuplicateSchema(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut schema = product_schema();
        schema.fields[0].config.threshold = 1.5;
        let mut set = SchemaSet::new();
        set.insert(schema).unwrap();
        assert!(matches!(
            set.validate(|_| true),
            Err(SchemaError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_comparator() {
        let mut schema = product_schema();
        schema.fields[0].config.comparator = Some("embedding-cosine".to_string());
        let mut set = SchemaSet::new();
        set.insert(schema).unwrap();

        let err = set.validate(|name| name != "embedding-cosine").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownComparator { .. }));

        let mut set2 = SchemaSet::new();
        let mut schema2 = product_schema();
        schema2.fields[0].config.comparator = Some("embedding-cosine".to_string());
        set2.insert(schema2).unwrap();
        assert!(set2.validate(|_| true).is_ok());
    }

    #[test]
    fn test_validate_checks_type_defaults() {
        let mut set = SchemaSet::new();
        set.insert(product_schema()).unwrap();
        // The string field falls back to edit-distance, which must resolve.
        assert!(matches!(
            set.validate(|name| name != "edit-distance"),
            Err(SchemaError::UnknownComparator { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_record() {
        let mut set = SchemaSet::new();
        set.insert(RecordSchema::new("Empty", vec![])).unwrap();
        assert!(matches!(
            set.validate(|_| true),
            Err(SchemaError::EmptyRecord(_))
        ));
    }
}
