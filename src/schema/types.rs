//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

/// JSON type as carried on the wire: a single type or an array of types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a single type
    pub fn single(t: JsonType) -> Self {
        JsonTypeOrArray::Single(t)
    }

    /// Create a type list
    pub fn list(types: Vec<JsonType>) -> Self {
        JsonTypeOrArray::Multiple(types)
    }

    /// Check if this type allows null
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
        }
    }

    /// Check if this type allows the given type
    pub fn allows(&self, t: JsonType) -> bool {
        match self {
            JsonTypeOrArray::Single(single) => *single == t,
            JsonTypeOrArray::Multiple(types) => types.contains(&t),
        }
    }

    /// Append `null` to the type list if not already present
    pub fn make_nullable(&self) -> Self {
        if self.is_nullable() {
            return self.clone();
        }
        match self {
            JsonTypeOrArray::Single(t) => JsonTypeOrArray::Multiple(vec![*t, JsonType::Null]),
            JsonTypeOrArray::Multiple(types) => {
                let mut new_types = types.clone();
                new_types.push(JsonType::Null);
                JsonTypeOrArray::Multiple(new_types)
            }
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Format hint (e.g., "date-time", "date", "time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Keywords carried through unchanged (descriptions, items, enums)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SchemaProperty {
    /// Create a property with a single-element type list
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::list(vec![json_type]),
            format: None,
            properties: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Create a property with a bare (non-list) type
    pub fn single(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::single(json_type),
            format: None,
            properties: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Create a property with the given type list
    pub fn of_types(types: Vec<JsonType>) -> Self {
        Self {
            json_type: JsonTypeOrArray::list(types),
            format: None,
            properties: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Create an object property with nested properties
    pub fn object(properties: BTreeMap<String, SchemaProperty>) -> Self {
        Self {
            json_type: JsonTypeOrArray::list(vec![JsonType::Object]),
            format: None,
            properties: Some(properties),
            extra: serde_json::Map::new(),
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Append `null` to the type list if not already present
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.json_type = self.json_type.make_nullable();
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }

    /// Check if this property allows objects
    pub fn is_object(&self) -> bool {
        self.json_type.allows(JsonType::Object)
    }
}

/// Stream schema document: an object schema with named properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema type (always "object" at the top level)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Create a new empty object schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property
    pub fn add_property(&mut self, name: &str, property: SchemaProperty) {
        self.properties.insert(name.to_string(), property);
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
