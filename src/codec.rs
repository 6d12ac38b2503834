//! Field encoding between in-memory records and flat relational columns.
//!
//! Structured fields (lists/objects) are stored as JSON text; boolean
//! fields are stored as integer 0/1.

use serde_json::Value;

use crate::interfaces::Row;
use crate::registry::CollectionSchema;

/// Parse a stored structured field.
///
/// Malformed or missing text yields an empty list so one bad legacy row
/// cannot abort a whole read.
pub fn decode_structured(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "Unparseable structured field, using empty list");
                Value::Array(Vec::new())
            }
        },
        Value::Null => Value::Array(Vec::new()),
        // JSON columns come back already parsed
        other => other,
    }
}

/// Serialize a structured field for storage.
pub fn encode_structured(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// Interpret a stored boolean.
pub fn coerce_bool_from_storage(value: &Value) -> Value {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    };
    Value::Bool(flag)
}

/// Convert a boolean to its 0/1 storage form. NULL stays NULL.
pub fn coerce_bool_for_storage(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => match coerce_bool_from_storage(other) {
            Value::Bool(true) => Value::from(1),
            _ => Value::from(0),
        },
    }
}

/// Decode every structured and boolean field of a stored row.
pub fn decode_record(schema: &CollectionSchema, mut row: Row) -> Row {
    for field in schema.structured_fields {
        if let Some(slot) = row.get_mut(*field) {
            *slot = decode_structured(slot.take());
        }
    }
    for field in schema.boolean_fields {
        if let Some(slot) = row.get_mut(*field) {
            *slot = coerce_bool_from_storage(slot);
        }
    }
    row
}

/// Encode one field of a record for storage according to the schema.
pub fn encode_field(schema: &CollectionSchema, field: &str, value: &Value) -> Value {
    if schema.is_structured(field) {
        encode_structured(value)
    } else if schema.is_boolean(field) {
        coerce_bool_for_storage(value)
    } else {
        match value {
            // Nested values in undeclared fields still need to fit one column
            Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
            other => other.clone(),
        }
    }
}

/// Lay a record out in `columns` order, encoding each field.
///
/// Columns the record lacks are stored as NULL; record fields the table
/// lacks are dropped.
pub fn encode_record(schema: &CollectionSchema, record: &Row, columns: &[String]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| match record.get(column) {
            Some(value) => encode_field(schema, column, value),
            None => Value::Null,
        })
        .collect()
}
