//! Schema type tests

use super::*;
use serde_json::json;

#[test]
fn test_property_serializes_type_list() {
    let prop = SchemaProperty::new(JsonType::String).nullable();
    assert_eq!(
        serde_json::to_value(&prop).unwrap(),
        json!({"type": ["string", "null"]})
    );
}

#[test]
fn test_nullable_is_idempotent() {
    let prop = SchemaProperty::of_types(vec![JsonType::Null, JsonType::String]).nullable();
    assert_eq!(
        serde_json::to_value(&prop).unwrap(),
        json!({"type": ["null", "string"]})
    );
}

#[test]
fn test_format_hint_round_trips() {
    let prop = SchemaProperty::new(JsonType::String)
        .with_format("date-time")
        .nullable();
    let value = serde_json::to_value(&prop).unwrap();
    assert_eq!(value, json!({"type": ["string", "null"], "format": "date-time"}));

    let parsed: SchemaProperty = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, prop);
}

#[test]
fn test_single_type_deserializes() {
    let parsed: SchemaProperty = serde_json::from_value(json!({"type": "integer"})).unwrap();
    assert!(parsed.json_type.allows(JsonType::Integer));
    assert!(!parsed.is_nullable());
}

#[test]
fn test_unknown_keywords_are_preserved() {
    let raw = json!({
        "type": ["string", "null"],
        "description": "customer id",
        "maxLength": 36
    });
    let parsed: SchemaProperty = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
}

#[test]
fn test_bare_type_serializes_unwrapped() {
    let prop = SchemaProperty::single(JsonType::Integer);
    assert_eq!(serde_json::to_value(&prop).unwrap(), json!({"type": "integer"}));
}

#[test]
fn test_schema_document_shape() {
    let mut schema = Schema::new();
    schema.add_property("name", SchemaProperty::new(JsonType::String).nullable());
    assert_eq!(
        schema.to_json(),
        json!({
            "type": "object",
            "properties": {"name": {"type": ["string", "null"]}}
        })
    );
}

#[test]
fn test_object_property_with_nested_properties() {
    let mut nested = std::collections::BTreeMap::new();
    nested.insert(
        "city".to_string(),
        SchemaProperty::new(JsonType::String).nullable(),
    );
    let prop = SchemaProperty::object(nested).nullable();
    assert!(prop.is_object());
    assert_eq!(
        serde_json::to_value(&prop).unwrap(),
        json!({
            "type": ["object", "null"],
            "properties": {"city": {"type": ["string", "null"]}}
        })
    );
}
