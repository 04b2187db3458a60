//! Singer messages
//!
//! The message types emitted on stdout, one JSON object per line.

use crate::config::BatchEncoding;
use crate::schema::Schema;
use crate::types::{JsonObject, JsonValue};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A message emitted during discovery or sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Stream schema, sent before any records
    #[serde(rename = "SCHEMA")]
    Schema {
        /// Stream name
        stream: String,
        /// The stream's JSON schema
        schema: Schema,
        /// Primary key property names
        key_properties: Vec<String>,
        /// Bookmark property names, present for incremental streams
        #[serde(skip_serializing_if = "Option::is_none")]
        bookmark_properties: Option<Vec<String>>,
    },
    /// One extracted record
    #[serde(rename = "RECORD")]
    Record {
        /// Stream name
        stream: String,
        /// The record payload
        record: JsonObject,
        /// Extraction timestamp (RFC 3339 UTC)
        time_extracted: String,
    },
    /// Replication state snapshot
    #[serde(rename = "STATE")]
    State {
        /// State payload (`{"bookmarks": {...}}`)
        value: JsonValue,
    },
    /// Reference to a written batch file
    #[serde(rename = "BATCH")]
    Batch {
        /// Stream name
        stream: String,
        /// How the batch files are encoded
        encoding: BatchEncoding,
        /// URLs of the batch files
        manifest: Vec<String>,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: Schema,
        bookmark_properties: Option<Vec<String>>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties: Vec::new(),
            bookmark_properties,
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: JsonObject) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: current_time_extracted(),
        }
    }

    /// Create a state message
    pub fn state(value: JsonValue) -> Self {
        Self::State { value }
    }

    /// Create a batch message
    pub fn batch(stream: impl Into<String>, encoding: BatchEncoding, manifest: Vec<String>) -> Self {
        Self::Batch {
            stream: stream.into(),
            encoding,
            manifest,
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

/// The current instant as an RFC 3339 UTC timestamp with microseconds.
pub fn current_time_extracted() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
