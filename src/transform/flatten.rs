//! Record and schema flattening
//!
//! Nested object properties are hoisted to the top level with `__`-joined
//! keys, down to a configured depth. Anything still nested past that depth is
//! carried as serialized JSON text in records, while the schema keeps the
//! declared property unchanged. Arrays are never expanded, only serialized.

use crate::error::Result;
use crate::schema::{Schema, SchemaProperty};
use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeMap;

/// Separator between parent and child key segments
pub const SEPARATOR: &str = "__";

/// Flatten a schema's object properties down to `max_depth` levels
pub fn flatten_schema(schema: &Schema, max_depth: usize) -> Schema {
    let mut flattened = Schema::new();
    flatten_properties(&schema.properties, "", 0, max_depth, &mut flattened);
    flattened
}

fn flatten_properties(
    properties: &BTreeMap<String, SchemaProperty>,
    prefix: &str,
    level: usize,
    max_depth: usize,
    out: &mut Schema,
) {
    for (name, property) in properties {
        let key = joined_key(prefix, name);
        match &property.properties {
            Some(children) if property.is_object() && level < max_depth => {
                flatten_properties(children, &key, level + 1, max_depth, out);
            }
            _ => out.add_property(&key, property.clone()),
        }
    }
}

/// Flatten a record's nested objects down to `max_depth` levels
pub fn flatten_record(record: JsonObject, max_depth: usize) -> Result<JsonObject> {
    let mut flattened = JsonObject::new();
    flatten_into(record, "", 0, max_depth, &mut flattened)?;
    Ok(flattened)
}

fn flatten_into(
    record: JsonObject,
    prefix: &str,
    level: usize,
    max_depth: usize,
    out: &mut JsonObject,
) -> Result<()> {
    for (name, value) in record {
        let key = joined_key(prefix, &name);
        match value {
            JsonValue::Object(nested) if level < max_depth => {
                flatten_into(nested, &key, level + 1, max_depth, out)?;
            }
            JsonValue::Object(_) | JsonValue::Array(_) => {
                out.insert(key, JsonValue::String(serde_json::to_string(&value)?));
            }
            other => {
                out.insert(key, other);
            }
        }
    }
    Ok(())
}

fn joined_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonType;
    use serde_json::json;

    fn record_from(value: JsonValue) -> JsonObject {
        match value {
            JsonValue::Object(record) => record,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_flatten_record_one_level() {
        let record = record_from(json!({
            "id": 1,
            "address": {"city": "Oslo", "zip": "0150"}
        }));

        let flattened = flatten_record(record, 1).unwrap();
        assert_eq!(
            JsonValue::Object(flattened),
            json!({
                "id": 1,
                "address__city": "Oslo",
                "address__zip": "0150"
            })
        );
    }

    #[test]
    fn test_flatten_record_serializes_past_max_depth() {
        let record = record_from(json!({
            "a": {"b": {"c": 1}}
        }));

        let flattened = flatten_record(record, 1).unwrap();
        assert_eq!(flattened["a__b"], json!("{\"c\":1}"));
    }

    #[test]
    fn test_flatten_record_serializes_arrays() {
        let record = record_from(json!({
            "id": 1,
            "tags": ["a", "b"]
        }));

        let flattened = flatten_record(record, 1).unwrap();
        assert_eq!(flattened["tags"], json!("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_flatten_record_keeps_scalars_and_nulls() {
        let record = record_from(json!({"id": 1, "gone": null}));
        let flattened = flatten_record(record, 2).unwrap();
        assert_eq!(flattened["id"], json!(1));
        assert_eq!(flattened["gone"], JsonValue::Null);
    }

    #[test]
    fn test_flatten_schema_expands_nested_properties() {
        let mut children = BTreeMap::new();
        children.insert("city".to_string(), SchemaProperty::new(JsonType::String));
        children.insert("zip".to_string(), SchemaProperty::new(JsonType::String));

        let mut schema = Schema::new();
        schema.add_property("id", SchemaProperty::new(JsonType::Integer));
        schema.add_property("address", SchemaProperty::object(children));

        let flattened = flatten_schema(&schema, 1);
        assert!(flattened.get_property("address__city").is_some());
        assert!(flattened.get_property("address__zip").is_some());
        assert!(flattened.get_property("address").is_none());
        assert!(flattened.get_property("id").is_some());
    }

    #[test]
    fn test_flatten_schema_keeps_untyped_objects() {
        let mut schema = Schema::new();
        schema.add_property(
            "payload",
            SchemaProperty::of_types(vec![JsonType::Null, JsonType::Object]),
        );

        let flattened = flatten_schema(&schema, 2);
        assert_eq!(
            flattened.to_json()["properties"]["payload"],
            json!({"type": ["null", "object"]})
        );
    }

    #[test]
    fn test_flatten_schema_respects_max_depth() {
        let mut inner = BTreeMap::new();
        inner.insert("c".to_string(), SchemaProperty::new(JsonType::Integer));

        let mut middle = BTreeMap::new();
        middle.insert("b".to_string(), SchemaProperty::object(inner));

        let mut schema = Schema::new();
        schema.add_property("a", SchemaProperty::object(middle));

        let flattened = flatten_schema(&schema, 1);
        let json = flattened.to_json();
        assert!(json["properties"]["a__b"].is_object());
        assert!(json["properties"]["a__b__c"].is_null());
    }
}
