//! Stream maps
//!
//! A declarative subset of stream transformation, configured through the
//! `stream_maps` setting. The stream can be dropped or aliased, properties
//! can be dropped, copied from other properties, or filled from
//! `stream_map_config` values, and `"__else__": null` drops every property
//! the map does not name.

use crate::error::{Error, Result};
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeMap;

/// One property operation inside a stream map
#[derive(Debug, Clone, PartialEq)]
enum MapOperation {
    /// Remove the property
    Drop,
    /// Copy another property's value
    Copy(String),
    /// A fixed value taken from `stream_map_config`
    Constant(JsonValue),
}

/// Transformation for one stream, parsed from the `stream_maps` setting
#[derive(Debug, Clone, Default)]
pub struct StreamMap {
    alias: Option<String>,
    dropped: bool,
    drop_unmapped: bool,
    operations: BTreeMap<String, MapOperation>,
}

impl StreamMap {
    /// Parse the map for one stream. Streams without an entry get the
    /// identity map.
    pub fn for_stream(
        stream_name: &str,
        stream_maps: Option<&JsonObject>,
        map_config: Option<&JsonObject>,
    ) -> Result<Self> {
        let Some(definition) = stream_maps.and_then(|maps| maps.get(stream_name)) else {
            return Ok(Self::default());
        };

        let definition = match definition {
            JsonValue::Null => {
                return Ok(Self {
                    dropped: true,
                    ..Self::default()
                })
            }
            JsonValue::Object(map) => map,
            _ => {
                return Err(Error::config(format!(
                    "Stream map for '{stream_name}' must be an object or null"
                )))
            }
        };

        let mut parsed = Self::default();
        for (key, value) in definition {
            match (key.as_str(), value) {
                ("__alias__", JsonValue::String(alias)) => parsed.alias = Some(alias.clone()),
                ("__alias__", _) => {
                    return Err(Error::config("Stream map '__alias__' must be a string"))
                }
                ("__else__", JsonValue::Null) => parsed.drop_unmapped = true,
                ("__else__", _) => {
                    return Err(Error::config("Stream map '__else__' only supports null"))
                }
                (property, JsonValue::Null) => {
                    parsed
                        .operations
                        .insert(property.to_string(), MapOperation::Drop);
                }
                (property, JsonValue::String(expression)) => {
                    let operation = if let Some(config_key) = expression.strip_prefix("config.") {
                        let value = map_config
                            .and_then(|config| config.get(config_key))
                            .cloned()
                            .ok_or_else(|| {
                                Error::config(format!(
                                    "Stream map for '{stream_name}' references missing \
                                     stream_map_config key '{config_key}'"
                                ))
                            })?;
                        MapOperation::Constant(value)
                    } else {
                        MapOperation::Copy(expression.clone())
                    };
                    parsed.operations.insert(property.to_string(), operation);
                }
                (property, _) => {
                    return Err(Error::config(format!(
                        "Stream map expression for '{property}' must be a property name, a \
                         'config.<key>' reference, or null"
                    )))
                }
            }
        }
        Ok(parsed)
    }

    /// Whether the stream is removed from output entirely
    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    /// The stream name records are emitted under
    pub fn output_name<'a>(&'a self, stream_name: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(stream_name)
    }

    /// Apply the map to the stream's schema
    pub fn apply_schema(&self, schema: &Schema) -> Result<Schema> {
        let mut mapped = Schema::new();
        if !self.drop_unmapped {
            for (name, property) in &schema.properties {
                if !self.operations.contains_key(name) {
                    mapped.add_property(name, property.clone());
                }
            }
        }
        for (name, operation) in &self.operations {
            match operation {
                MapOperation::Drop => {}
                MapOperation::Copy(source) => {
                    let property = schema.get_property(source).cloned().ok_or_else(|| {
                        Error::config(format!(
                            "Stream map references unknown property '{source}'"
                        ))
                    })?;
                    mapped.add_property(name, property);
                }
                MapOperation::Constant(value) => {
                    mapped.add_property(name, property_for_value(value));
                }
            }
        }
        Ok(mapped)
    }

    /// Apply the map to one record
    pub fn apply_record(&self, record: JsonObject) -> JsonObject {
        let resolved: Vec<(String, JsonValue)> = self
            .operations
            .iter()
            .filter_map(|(name, operation)| match operation {
                MapOperation::Drop => None,
                MapOperation::Copy(source) => Some((
                    name.clone(),
                    record.get(source).cloned().unwrap_or(JsonValue::Null),
                )),
                MapOperation::Constant(value) => Some((name.clone(), value.clone())),
            })
            .collect();

        let mut mapped = if self.drop_unmapped {
            JsonObject::new()
        } else {
            let mut kept = record;
            for name in self.operations.keys() {
                kept.remove(name);
            }
            kept
        };
        for (name, value) in resolved {
            mapped.insert(name, value);
        }
        mapped
    }
}

/// A nullable schema property matching a constant's JSON type
fn property_for_value(value: &JsonValue) -> SchemaProperty {
    let json_type = match value {
        JsonValue::Null => return SchemaProperty::of_types(vec![JsonType::Null]),
        JsonValue::Bool(_) => JsonType::Boolean,
        JsonValue::Number(n) if n.is_f64() => JsonType::Number,
        JsonValue::Number(_) => JsonType::Integer,
        JsonValue::String(_) => JsonType::String,
        JsonValue::Array(_) => JsonType::Array,
        JsonValue::Object(_) => JsonType::Object,
    };
    SchemaProperty::of_types(vec![JsonType::Null, json_type])
}

// ============================================================================
// Tests
// ============================================================================
