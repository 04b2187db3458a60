//! File streams
//!
//! One stream implementation per file type, sharing file selection,
//! decompression, and row augmentation through [`StreamContext`]:
//! - `delimited`: CSV, TSV, and other character-separated files
//! - `jsonl`: one JSON document per line
//! - `avro`: Avro object container files
//! - `parquet`: Parquet files read through Arrow

mod avro;
mod delimited;
mod jsonl;
mod parquet;

pub use avro::AvroStream;
pub use delimited::DelimitedStream;
pub use jsonl::JsonlStream;
pub use parquet::ParquetStream;

use crate::compression;
use crate::config::{FileType, TapConfig};
use crate::error::{Error, Result};
use crate::filesystem::{FileInfo, FilesystemManager};
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::state::StateManager;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Augmentation Columns
// ============================================================================

/// Property carrying the source file path
pub const SDC_FILE_NAME: &str = "_sdc_file_name";
/// Property carrying the row's position within its file
pub const SDC_LINE_NUMBER: &str = "_sdc_line_number";
/// Property carrying the source file's modification timestamp
pub const SDC_LAST_MODIFIED: &str = "_sdc_last_modified";

/// The replication key used for incremental replication
pub const REPLICATION_KEY: &str = SDC_LAST_MODIFIED;

// ============================================================================
// Stream Context
// ============================================================================

/// State shared by every stream implementation: the tap configuration, the
/// filesystem, and the replication watermark resolved from state.
#[derive(Debug)]
pub struct StreamContext {
    config: TapConfig,
    manager: Arc<FilesystemManager>,
    starting_replication_key_value: Option<String>,
}

impl StreamContext {
    /// Resolve the starting watermark from state (or `start_date`) and check
    /// it against the stream configuration.
    pub async fn new(
        config: TapConfig,
        manager: Arc<FilesystemManager>,
        state: &StateManager,
    ) -> Result<Self> {
        let stream_name = config.stream_name.clone();
        let bookmark = state.get_replication_key_value(&stream_name).await;

        let starting_replication_key_value = if state.was_provided() {
            match bookmark {
                Some(value) => Some(value),
                None => {
                    return Err(Error::state(format!(
                        "State was passed so incremental replication is assumed. However, \
                         no state was found for a stream_name of {stream_name}."
                    )))
                }
            }
        } else {
            config.start_date.clone()
        };

        if starting_replication_key_value.is_some() && !config.additional_info {
            return Err(Error::config(
                "Incremental replication requires additional_info to be True.",
            ));
        }

        Ok(Self {
            config,
            manager,
            starting_replication_key_value,
        })
    }

    /// The configured stream name
    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    /// The tap configuration
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// The watermark files must have been modified at or after, when one exists
    pub fn starting_replication_key_value(&self) -> Option<&str> {
        self.starting_replication_key_value.as_deref()
    }

    /// The replication key advertised for this stream, present only when rows
    /// carry the augmentation columns
    pub fn replication_key(&self) -> Option<&'static str> {
        self.config.additional_info.then_some(REPLICATION_KEY)
    }

    /// Files selected for this sync, oldest first
    pub async fn selected_files(&self) -> Result<Vec<FileInfo>> {
        self.manager
            .get_files(self.starting_replication_key_value())
            .await
    }

    /// Read one file's contents with compression undone
    pub async fn read_decompressed(&self, file: &FileInfo) -> Result<Bytes> {
        let raw = self.manager.read(file).await?;
        let codec = compression::resolve(self.config.compression, &file.path);
        compression::decompress(codec, &file.path, raw)
    }

    /// Add the `_sdc_*` properties to a row, when configured
    pub fn add_additional_info(
        &self,
        record: &mut JsonObject,
        file: &FileInfo,
        line_number: usize,
    ) {
        if !self.config.additional_info {
            return;
        }
        record.insert(
            SDC_FILE_NAME.to_string(),
            JsonValue::String(file.path.clone()),
        );
        record.insert(SDC_LINE_NUMBER.to_string(), json!(line_number));
        record.insert(
            SDC_LAST_MODIFIED.to_string(),
            JsonValue::String(file.last_modified_iso()),
        );
    }

    /// Append the `_sdc_*` properties to a schema, when configured
    pub fn append_additional_info(&self, schema: &mut Schema) {
        if !self.config.additional_info {
            return;
        }
        schema.add_property(SDC_FILE_NAME, SchemaProperty::single(JsonType::String));
        schema.add_property(SDC_LINE_NUMBER, SchemaProperty::single(JsonType::Integer));
        schema.add_property(
            SDC_LAST_MODIFIED,
            SchemaProperty::single(JsonType::String).with_format("date-time"),
        );
    }
}

// ============================================================================
// Stream Interface
// ============================================================================

/// One parsed row and its position within the file it came from
#[derive(Debug, Clone)]
pub struct ParsedRow {
    /// Position reported as `_sdc_line_number`
    pub line_number: usize,
    /// The row itself
    pub record: JsonObject,
}

/// Common interface over the four file formats
#[async_trait]
pub trait FileStream: Send + Sync {
    /// The shared stream context
    fn context(&self) -> &StreamContext;

    /// Schema properties derived from the selected files, before the
    /// augmentation columns are added
    async fn properties(&self) -> Result<Schema>;

    /// Parse one file into rows
    async fn file_rows(&self, file: &FileInfo) -> Result<Vec<ParsedRow>>;

    /// The stream name
    fn name(&self) -> &str {
        self.context().stream_name()
    }

    /// The full stream schema, augmentation columns included
    async fn schema(&self) -> Result<Schema> {
        let mut schema = self.properties().await?;
        self.context().append_additional_info(&mut schema);
        Ok(schema)
    }
}

/// Build the stream matching the configured file type
pub async fn create_stream(
    config: &TapConfig,
    state: &StateManager,
) -> Result<Box<dyn FileStream>> {
    let file_type = config.file_type()?;
    let manager = Arc::new(FilesystemManager::new(config)?);
    let context = StreamContext::new(config.clone(), manager, state).await?;

    Ok(match file_type {
        FileType::Delimited => Box::new(DelimitedStream::new(context)),
        FileType::Jsonl => Box::new(JsonlStream::new(context)),
        FileType::Avro => Box::new(AvroStream::new(context)),
        FileType::Parquet => Box::new(ParquetStream::new(context)),
    })
}

// ============================================================================
// Shared Conversion Helpers
// ============================================================================

/// A JSON number, or null when the float has no JSON representation
fn number_or_null(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

/// Days since the Unix epoch as `YYYY-MM-DD`
fn date_from_epoch_days(days: i32, file_path: &str) -> Result<String> {
    chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| Error::decode(file_path, "date value out of range"))
}

/// Nanoseconds since midnight as `HH:MM:SS` with fractional seconds as needed
fn time_from_midnight(nanos: i64, file_path: &str) -> Result<String> {
    let out_of_range = || Error::decode(file_path, "time value out of range");
    let secs = u32::try_from(nanos / 1_000_000_000).map_err(|_| out_of_range())?;
    let nano = u32::try_from(nanos % 1_000_000_000).map_err(|_| out_of_range())?;
    chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nano)
        .map(|time| time.format("%H:%M:%S%.f").to_string())
        .ok_or_else(out_of_range)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use chrono::{TimeZone, Utc};
    use object_store::path::Path as ObjectPath;

    fn local_config(dir: &std::path::Path) -> TapConfig {
        TapConfig {
            protocol: Some(Protocol::File),
            file_path: Some(dir.to_string_lossy().into_owned()),
            ..TapConfig::default()
        }
    }

    fn context_for(config: TapConfig) -> StreamContext {
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        StreamContext {
            config,
            manager,
            starting_replication_key_value: None,
        }
    }

    fn sample_file() -> FileInfo {
        FileInfo {
            path: "/data/one.csv".to_string(),
            location: ObjectPath::from("one.csv"),
            last_modified: Utc.with_ymd_and_hms(2023, 1, 15, 9, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_context_without_state_uses_start_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.start_date = Some("2023-01-01T00:00:00+00:00".to_string());
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        let state = StateManager::in_memory();

        let context = StreamContext::new(config, manager, &state).await.unwrap();
        assert_eq!(
            context.starting_replication_key_value(),
            Some("2023-01-01T00:00:00+00:00")
        );
    }

    #[tokio::test]
    async fn test_context_with_state_uses_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config(dir.path());
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        let state = StateManager::from_json(
            r#"{"bookmarks":{"file":{"replication_key":"_sdc_last_modified","replication_key_value":"2023-06-01T00:00:00+00:00"}}}"#,
        )
        .unwrap();

        let context = StreamContext::new(config, manager, &state).await.unwrap();
        assert_eq!(
            context.starting_replication_key_value(),
            Some("2023-06-01T00:00:00+00:00")
        );
    }

    #[tokio::test]
    async fn test_context_rejects_state_without_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config(dir.path());
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        let state = StateManager::from_json(r#"{"bookmarks":{"other":{}}}"#).unwrap();

        let err = StreamContext::new(config, manager, &state).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("no state was found for a stream_name of file"));
    }

    #[tokio::test]
    async fn test_context_rejects_watermark_without_additional_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.additional_info = false;
        config.start_date = Some("2023-01-01T00:00:00+00:00".to_string());
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        let state = StateManager::in_memory();

        let err = StreamContext::new(config, manager, &state).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Incremental replication requires additional_info to be True."));
    }

    #[tokio::test]
    async fn test_add_additional_info_inserts_columns() {
        let dir = tempfile::tempdir().unwrap();
        let context = context_for(local_config(dir.path()));
        let file = sample_file();

        let mut record = JsonObject::new();
        record.insert("name".to_string(), json!("alpha"));
        context.add_additional_info(&mut record, &file, 7);

        assert_eq!(record[SDC_FILE_NAME], json!("/data/one.csv"));
        assert_eq!(record[SDC_LINE_NUMBER], json!(7));
        assert_eq!(record[SDC_LAST_MODIFIED], json!("2023-01-15T09:30:00+00:00"));
    }

    #[tokio::test]
    async fn test_add_additional_info_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.additional_info = false;
        let context = context_for(config);
        let file = sample_file();

        let mut record = JsonObject::new();
        context.add_additional_info(&mut record, &file, 1);
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_append_additional_info_property_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let context = context_for(local_config(dir.path()));

        let mut schema = Schema::new();
        context.append_additional_info(&mut schema);

        let json = schema.to_json();
        assert_eq!(
            json["properties"][SDC_FILE_NAME],
            json!({"type": "string"})
        );
        assert_eq!(
            json["properties"][SDC_LINE_NUMBER],
            json!({"type": "integer"})
        );
        assert_eq!(
            json["properties"][SDC_LAST_MODIFIED],
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[tokio::test]
    async fn test_replication_key_follows_additional_info() {
        let dir = tempfile::tempdir().unwrap();
        let context = context_for(local_config(dir.path()));
        assert_eq!(context.replication_key(), Some("_sdc_last_modified"));

        let mut config = local_config(dir.path());
        config.additional_info = false;
        let context = context_for(config);
        assert_eq!(context.replication_key(), None);
    }
}
