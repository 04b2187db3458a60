//! Discovery catalog
//!
//! The catalog document printed by `--discover` and read back through
//! `--catalog` to override schemas or deselect streams.

use crate::error::{Error, Result, ResultExt};
use crate::schema::Schema;
use crate::types::{JsonObject, ReplicationMethod};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// The discovered set of streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

/// One stream's entry in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique stream identifier
    pub tap_stream_id: String,
    /// Stream name
    pub stream: String,
    /// The stream's JSON schema
    pub schema: Schema,
    /// Primary key property names
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// Bookmark property for incremental replication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    /// How the stream replicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<ReplicationMethod>,
    /// Table- and field-level metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

/// One metadata entry, addressed by breadcrumb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// `[]` for the table, `["properties", name]` for a field
    pub breadcrumb: Vec<String>,
    /// Metadata payload
    pub metadata: JsonObject,
}

impl Catalog {
    /// Create a catalog holding the given entries
    pub fn new(streams: Vec<CatalogEntry>) -> Self {
        Self { streams }
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid catalog file {}: {e}", path.display())))
    }

    /// Look up a stream's entry by name
    pub fn get_entry(&self, stream_name: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == stream_name)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CatalogEntry {
    /// Build the standard entry for a discovered stream.
    ///
    /// Table-level metadata marks the stream available and selected; one
    /// field-level entry is added per schema property.
    pub fn standard(stream_name: &str, schema: Schema, replication_key: Option<&str>) -> Self {
        let replication_method = match replication_key {
            Some(_) => ReplicationMethod::Incremental,
            None => ReplicationMethod::FullTable,
        };

        let mut table_metadata = JsonObject::new();
        table_metadata.insert("inclusion".to_string(), json!("available"));
        table_metadata.insert("selected".to_string(), json!(true));
        table_metadata.insert("table-key-properties".to_string(), json!([]));
        table_metadata.insert(
            "forced-replication-method".to_string(),
            json!(replication_method),
        );
        if let Some(key) = replication_key {
            table_metadata.insert("valid-replication-keys".to_string(), json!([key]));
        }

        let mut metadata = vec![MetadataEntry {
            breadcrumb: Vec::new(),
            metadata: table_metadata,
        }];
        for name in schema.properties.keys() {
            let mut field_metadata = JsonObject::new();
            field_metadata.insert("inclusion".to_string(), json!("available"));
            metadata.push(MetadataEntry {
                breadcrumb: vec!["properties".to_string(), name.clone()],
                metadata: field_metadata,
            });
        }

        Self {
            tap_stream_id: stream_name.to_string(),
            stream: stream_name.to_string(),
            schema,
            key_properties: Vec::new(),
            replication_key: replication_key.map(String::from),
            replication_method: Some(replication_method),
            metadata,
        }
    }

    /// Whether the stream is selected for sync.
    ///
    /// A stream is selected unless its table-level metadata says otherwise.
    pub fn is_selected(&self) -> bool {
        self.metadata
            .iter()
            .find(|entry| entry.breadcrumb.is_empty())
            .and_then(|entry| entry.metadata.get("selected"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JsonType, SchemaProperty};

    fn sample_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_property("id", SchemaProperty::new(JsonType::String).nullable());
        schema
    }

    #[test]
    fn test_standard_entry_shape() {
        let entry = CatalogEntry::standard("file", sample_schema(), Some("_sdc_last_modified"));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["tap_stream_id"], "file");
        assert_eq!(value["stream"], "file");
        assert_eq!(value["replication_key"], "_sdc_last_modified");
        assert_eq!(value["replication_method"], "INCREMENTAL");
        assert_eq!(value["key_properties"], json!([]));
        assert_eq!(value["metadata"][0]["breadcrumb"], json!([]));
        assert_eq!(value["metadata"][0]["metadata"]["inclusion"], "available");
        assert_eq!(
            value["metadata"][0]["metadata"]["valid-replication-keys"],
            json!(["_sdc_last_modified"])
        );
        assert_eq!(
            value["metadata"][1]["breadcrumb"],
            json!(["properties", "id"])
        );
    }

    #[test]
    fn test_full_table_entry_omits_replication_key() {
        let entry = CatalogEntry::standard("file", sample_schema(), None);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("replication_key").is_none());
        assert_eq!(value["replication_method"], "FULL_TABLE");
        assert!(value["metadata"][0]["metadata"]
            .get("valid-replication-keys")
            .is_none());
    }

    #[test]
    fn test_selection_defaults_to_true() {
        let entry = CatalogEntry::standard("file", sample_schema(), None);
        assert!(entry.is_selected());
    }

    #[test]
    fn test_deselection_round_trips() {
        let mut entry = CatalogEntry::standard("file", sample_schema(), None);
        if let Some(table) = entry
            .metadata
            .iter_mut()
            .find(|entry| entry.breadcrumb.is_empty())
        {
            table.metadata.insert("selected".to_string(), json!(false));
        }
        let raw = serde_json::to_string(&Catalog::new(vec![entry])).unwrap();
        let parsed: Catalog = serde_json::from_str(&raw).unwrap();
        let entry = parsed.get_entry("file").unwrap();
        assert!(!entry.is_selected());
    }

    #[test]
    fn test_catalog_accepts_minimal_user_entries() {
        let raw = r#"{
            "streams": [{
                "tap_stream_id": "file",
                "stream": "file",
                "schema": {
                    "type": "object",
                    "properties": {"name": {"type": ["string", "null"]}}
                }
            }]
        }"#;
        let parsed: Catalog = serde_json::from_str(raw).unwrap();
        let entry = parsed.get_entry("file").unwrap();
        assert!(entry.is_selected());
        assert!(entry.schema.get_property("name").is_some());
        assert!(entry.replication_key.is_none());
    }
}
