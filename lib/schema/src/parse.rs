//! Schema exchange format
//!
//! Parses the JSON-Schema-like envelope that carries a comparison
//! contract. Field metadata rides on `x-` vendor-extension keys:
//! `x-comparator`, `x-threshold`, `x-weight`, `x-clip-under-threshold`,
//! `x-aggregate`, and (on object schemas) `x-match-threshold`.
//!
//! Loading documents from disk is the caller's job; this module starts
//! from an already-parsed [`serde_json::Value`].

use crate::schema::{
    FieldConfig, FieldDescriptor, FieldType, PrimType, RecordSchema, SchemaError, SchemaId,
    SchemaSet,
};
use serde_json::{Map, Value};

/// Parse a schema document into an interned set plus its root handle
///
/// The document root must be an object schema (`"type": "object"` with a
/// `properties` map). Nested object schemas are interned on the way down;
/// a named sub-schema (`title`) appearing twice is interned once.
pub fn parse_schema(doc: &Value) -> Result<(SchemaSet, SchemaId), SchemaError> {
    let mut set = SchemaSet::new();
    let root = parse_record(doc, "root", &mut set)?;
    Ok((set, root))
}

/// Parse an object schema and intern it
fn parse_record(
    spec: &Value,
    fallback_name: &str,
    set: &mut SchemaSet,
) -> Result<SchemaId, SchemaError> {
    let obj = expect_object(spec, fallback_name)?;
    match type_name(obj, fallback_name)? {
        ("object", _) => {}
        (other, _) => return Err(SchemaError::UnknownType(other.to_string())),
    }

    let name = obj
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(fallback_name)
        .to_string();

    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            SchemaError::InvalidDocument(format!("object schema '{name}' has no properties map"))
        })?;
    if properties.is_empty() {
        return Err(SchemaError::EmptyRecord(name));
    }

    let mut fields = Vec::with_capacity(properties.len());
    for (field_name, field_spec) in properties {
        fields.push(parse_field(field_name, field_spec, &name, set)?);
    }

    let mut schema = RecordSchema::new(name.clone(), fields);
    if let Some(tau) = x_number(obj, "x-match-threshold", &name)? {
        check_unit_range(&name, tau)?;
        schema.match_threshold = tau;
    }
    set.insert(schema)
}

/// Parse one property into a field descriptor
fn parse_field(
    field_name: &str,
    spec: &Value,
    parent: &str,
    set: &mut SchemaSet,
) -> Result<FieldDescriptor, SchemaError> {
    let path = format!("{parent}.{field_name}");
    let obj = expect_object(spec, &path)?;
    let field_type = parse_field_type(obj, field_name, parent, set)?;

    let mut config = FieldConfig::for_type(&field_type);
    if let Some(name) = obj.get("x-comparator") {
        let name = name.as_str().ok_or_else(|| {
            SchemaError::InvalidDocument(format!("x-comparator for '{path}' must be a string"))
        })?;
        config.comparator = Some(name.to_string());
    }
    if let Some(threshold) = x_number(obj, "x-threshold", &path)? {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SchemaError::ThresholdOutOfRange {
                field: path,
                value: threshold,
            });
        }
        config.threshold = threshold;
    }
    if let Some(weight) = x_number(obj, "x-weight", &path)? {
        if weight <= 0.0 {
            return Err(SchemaError::NonPositiveWeight {
                field: path,
                value: weight,
            });
        }
        config.weight = weight;
    }
    if let Some(clip) = x_bool(obj, "x-clip-under-threshold", &path)? {
        config.clip_under_threshold = clip;
    }
    if let Some(aggregate) = x_bool(obj, "x-aggregate", &path)? {
        config.include_in_aggregate = aggregate;
    }

    Ok(FieldDescriptor {
        name: field_name.to_string(),
        field_type,
        config,
    })
}

/// Resolve a property spec to a declared field type
fn parse_field_type(
    obj: &Map<String, Value>,
    field_name: &str,
    parent: &str,
    set: &mut SchemaSet,
) -> Result<FieldType, SchemaError> {
    let path = format!("{parent}.{field_name}");
    let (type_str, mut nullable) = type_name(obj, &path)?;
    if let Some(flag) = obj.get("nullable").and_then(Value::as_bool) {
        nullable = nullable || flag;
    }

    let base = match type_str {
        "string" => FieldType::Prim(PrimType::Str),
        "integer" => FieldType::Prim(PrimType::Int),
        "number" => FieldType::Prim(PrimType::Float),
        "boolean" => FieldType::Prim(PrimType::Bool),
        "object" => {
            let id = parse_record(&Value::Object(obj.clone()), &path, set)?;
            FieldType::Record(id)
        }
        "array" => {
            let items = obj.get("items").ok_or_else(|| {
                SchemaError::InvalidDocument(format!("array schema '{path}' has no items"))
            })?;
            let items_obj = expect_object(items, &path)?;
            match type_name(items_obj, &path)?.0 {
                "string" => FieldType::ListPrim(PrimType::Str),
                "integer" => FieldType::ListPrim(PrimType::Int),
                "number" => FieldType::ListPrim(PrimType::Float),
                "boolean" => FieldType::ListPrim(PrimType::Bool),
                "object" => {
                    let id = parse_record(items, &path, set)?;
                    FieldType::ListRecord(id)
                }
                other => return Err(SchemaError::UnknownType(other.to_string())),
            }
        }
        other => return Err(SchemaError::UnknownType(other.to_string())),
    };

    Ok(if nullable {
        FieldType::Optional(Box::new(base))
    } else {
        base
    })
}

/// Read the `type` key: a plain string, or a `["T", "null"]` pair
fn type_name<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
) -> Result<(&'a str, bool), SchemaError> {
    match obj.get("type") {
        Some(Value::String(s)) => Ok((s.as_str(), false)),
        Some(Value::Array(parts)) => {
            let mut found = None;
            let mut nullable = false;
            for part in parts {
                match part.as_str() {
                    Some("null") => nullable = true,
                    Some(name) if found.is_none() => found = Some(name),
                    Some(_) => {
                        return Err(SchemaError::InvalidDocument(format!(
                            "'{path}' declares more than one non-null type"
                        )))
                    }
                    None => {
                        return Err(SchemaError::InvalidDocument(format!(
                            "'{path}' has a non-string entry in its type array"
                        )))
                    }
                }
            }
            found.map(|name| (name, nullable)).ok_or_else(|| {
                SchemaError::InvalidDocument(format!("'{path}' declares only null"))
            })
        }
        Some(_) => Err(SchemaError::InvalidDocument(format!(
            "'{path}' has a malformed type key"
        ))),
        None => Err(SchemaError::InvalidDocument(format!(
            "'{path}' is missing its type key"
        ))),
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::InvalidDocument(format!("'{path}' is not an object schema")))
}

fn x_number(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<f64>, SchemaError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            SchemaError::InvalidDocument(format!("{key} for '{path}' must be a number"))
        }),
    }
}

fn x_bool(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<bool>, SchemaError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| {
            SchemaError::InvalidDocument(format!("{key} for '{path}' must be a boolean"))
        }),
    }
}

fn check_unit_range(path: &str, value: f64) -> Result<(), SchemaError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::ThresholdOutOfRange {
            field: path.to_string(),
            value,
        })
    }
}
