//! Record value helpers
//!
//! Records are `serde_json::Value` trees. The empty string, the empty
//! list, the empty record, and null/absent are semantically identical
//! for classification and are never distinguished from null.

use serde_json::Value;
use stickler_schema::PrimType;

/// Maximum rendered length of a value in non-match records
const DISPLAY_LIMIT: usize = 120;

/// True when a value is null-equivalent: null, `""`, `[]`, or `{}`
pub fn is_null_equivalent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// True when a runtime value agrees with a declared primitive type
pub fn matches_prim(prim: PrimType, value: &Value) -> bool {
    match prim {
        PrimType::Str => value.is_string(),
        PrimType::Bool => value.is_boolean(),
        PrimType::Float => value.is_number(),
        PrimType::Int => match value {
            Value::Number(n) => {
                n.as_i64().is_some()
                    || n.as_u64().is_some()
                    || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
    }
}

/// Fetch a field from a record value; absent fields read as null
pub fn field_value<'a>(record: &'a Value, name: &str) -> &'a Value {
    record.get(name).unwrap_or(&Value::Null)
}

/// Render a value for display in non-match records, truncated
pub fn display_value(value: &Value) -> String {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() <= DISPLAY_LIMIT {
        return rendered;
    }
    let truncated: String = rendered.chars().take(DISPLAY_LIMIT).collect();
    format!("{truncated}...")
}
