//! Avro file stream
//!
//! Reads Avro object container files. Under the `convert` coercion strategy
//! the writer schema's record fields become schema properties, with only the
//! primitive Avro types mapped; anything more exotic fails discovery. Under
//! `envelope`, whole datums are wrapped as `{"record": datum}` and the schema
//! promises nothing about their insides.

use super::{
    date_from_epoch_days, number_or_null, time_from_midnight, FileStream, ParsedRow,
    StreamContext,
};
use crate::config::CoercionStrategy;
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::types::{JsonObject, JsonValue};
use apache_avro::types::Value as AvroValue;
use apache_avro::{Reader, Schema as AvroSchema};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde_json::json;

/// Stream over Avro object container files
pub struct AvroStream {
    context: StreamContext,
}

impl AvroStream {
    pub fn new(context: StreamContext) -> Self {
        Self { context }
    }

    /// Shape one datum per the coercion strategy
    fn pre_process(&self, value: AvroValue, file_path: &str) -> Result<JsonObject> {
        match self.context.config().avro_type_coercion_strategy {
            CoercionStrategy::Convert => match avro_to_json(value, file_path)? {
                JsonValue::Object(record) => Ok(record),
                _ => Err(Error::decode(file_path, "Avro datum is not a record")),
            },
            CoercionStrategy::Envelope => {
                let mut record = JsonObject::new();
                record.insert("record".to_string(), avro_to_json(value, file_path)?);
                Ok(record)
            }
        }
    }
}

#[async_trait]
impl FileStream for AvroStream {
    fn context(&self) -> &StreamContext {
        &self.context
    }

    /// Properties from every selected file's writer schema; same-named fields
    /// from later files win.
    async fn properties(&self) -> Result<Schema> {
        let strategy = self.context.config().avro_type_coercion_strategy;
        let mut schema = Schema::new();
        for file in self.context.selected_files().await? {
            match strategy {
                CoercionStrategy::Convert => {
                    let data = self.context.read_decompressed(&file).await?;
                    let reader = Reader::new(&data[..])?;
                    for (name, property) in record_fields(reader.writer_schema(), &file.path)? {
                        schema.add_property(&name, property);
                    }
                }
                CoercionStrategy::Envelope => {
                    schema.add_property(
                        "record",
                        SchemaProperty::of_types(vec![JsonType::Null, JsonType::Object]),
                    );
                }
            }
        }
        Ok(schema)
    }

    async fn file_rows(&self, file: &FileInfo) -> Result<Vec<ParsedRow>> {
        let data = self.context.read_decompressed(file).await?;
        let reader = Reader::new(&data[..])?;
        let mut rows = Vec::new();
        for value in reader {
            let record = self.pre_process(value?, &file.path)?;
            rows.push(ParsedRow {
                line_number: rows.len() + 1,
                record,
            });
        }
        Ok(rows)
    }
}

/// Schema properties for a writer schema's record fields
fn record_fields(
    writer_schema: &AvroSchema,
    file_path: &str,
) -> Result<Vec<(String, SchemaProperty)>> {
    let AvroSchema::Record(record) = writer_schema else {
        return Err(Error::schema(format!(
            "Avro file {file_path} does not contain a record schema"
        )));
    };
    record
        .fields
        .iter()
        .map(|field| {
            let json_type = type_convert(&field.schema)?;
            Ok((field.name.clone(), SchemaProperty::of_types(vec![json_type])))
        })
        .collect()
}

/// Map a primitive Avro type to a JSON schema type. Unions, named types, and
/// logical types are not converted.
fn type_convert(field_schema: &AvroSchema) -> Result<JsonType> {
    Ok(match field_schema {
        AvroSchema::Null => JsonType::Null,
        AvroSchema::Boolean => JsonType::Boolean,
        AvroSchema::String => JsonType::String,
        AvroSchema::Int | AvroSchema::Long => JsonType::Integer,
        AvroSchema::Float | AvroSchema::Double => JsonType::Number,
        AvroSchema::Bytes => JsonType::String,
        other => return Err(Error::unsupported_type(other.canonical_form())),
    })
}

/// Convert one Avro value to JSON. Binary data becomes text, temporal logical
/// types become ISO-8601 strings, and unions are transparent.
fn avro_to_json(value: AvroValue, file_path: &str) -> Result<JsonValue> {
    Ok(match value {
        AvroValue::Null => JsonValue::Null,
        AvroValue::Boolean(b) => JsonValue::Bool(b),
        AvroValue::Int(i) => json!(i),
        AvroValue::Long(i) => json!(i),
        AvroValue::Float(f) => number_or_null(f64::from(f)),
        AvroValue::Double(f) => number_or_null(f),
        AvroValue::Bytes(bytes) | AvroValue::Fixed(_, bytes) => {
            JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        AvroValue::String(s) => JsonValue::String(s),
        AvroValue::Enum(_, symbol) => JsonValue::String(symbol),
        AvroValue::Uuid(uuid) => JsonValue::String(uuid.to_string()),
        AvroValue::Union(_, inner) => avro_to_json(*inner, file_path)?,
        AvroValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .map(|item| avro_to_json(item, file_path))
                .collect::<Result<_>>()?,
        ),
        AvroValue::Map(entries) => {
            let mut object = JsonObject::new();
            for (key, value) in entries {
                object.insert(key, avro_to_json(value, file_path)?);
            }
            JsonValue::Object(object)
        }
        AvroValue::Record(fields) => {
            let mut object = JsonObject::new();
            for (name, value) in fields {
                object.insert(name, avro_to_json(value, file_path)?);
            }
            JsonValue::Object(object)
        }
        AvroValue::Date(days) => JsonValue::String(date_from_epoch_days(days, file_path)?),
        AvroValue::TimeMillis(ms) => {
            JsonValue::String(time_from_midnight(i64::from(ms) * 1_000_000, file_path)?)
        }
        AvroValue::TimeMicros(us) => {
            JsonValue::String(time_from_midnight(us * 1_000, file_path)?)
        }
        AvroValue::TimestampMillis(ms) => JsonValue::String(
            DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .ok_or_else(|| Error::decode(file_path, "timestamp value out of range"))?,
        ),
        AvroValue::TimestampMicros(us) => JsonValue::String(
            DateTime::from_timestamp_micros(us)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .ok_or_else(|| Error::decode(file_path, "timestamp value out of range"))?,
        ),
        AvroValue::TimestampNanos(ns) => JsonValue::String(
            DateTime::from_timestamp_nanos(ns).to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        AvroValue::LocalTimestampMillis(ms) => JsonValue::String(
            DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                .ok_or_else(|| Error::decode(file_path, "timestamp value out of range"))?,
        ),
        AvroValue::LocalTimestampMicros(us) => JsonValue::String(
            DateTime::from_timestamp_micros(us)
                .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                .ok_or_else(|| Error::decode(file_path, "timestamp value out of range"))?,
        ),
        AvroValue::LocalTimestampNanos(ns) => JsonValue::String(
            DateTime::from_timestamp_nanos(ns)
                .naive_utc()
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        other => {
            return Err(Error::decode(
                file_path,
                format!("Unsupported Avro value: {other:?}"),
            ))
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Protocol, TapConfig};
    use crate::filesystem::FilesystemManager;
    use crate::state::StateManager;
    use apache_avro::types::Record as AvroRecord;
    use apache_avro::Writer;
    use std::sync::Arc;

    const ROW_SCHEMA: &str = r#"{
        "type": "record",
        "name": "row",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "name", "type": "string"}
        ]
    }"#;

    fn write_avro(path: &std::path::Path, rows: &[(i64, &str)]) {
        let schema = AvroSchema::parse_str(ROW_SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        for (id, name) in rows {
            let mut record = AvroRecord::new(&schema).unwrap();
            record.put("id", *id);
            record.put("name", *name);
            writer.append(record).unwrap();
        }
        std::fs::write(path, writer.into_inner().unwrap()).unwrap();
    }

    async fn stream_for(
        dir: &std::path::Path,
        mutate: impl FnOnce(&mut TapConfig),
    ) -> AvroStream {
        let mut config = TapConfig {
            protocol: Some(Protocol::File),
            file_path: Some(dir.to_string_lossy().into_owned()),
            file_type: "avro".to_string(),
            ..TapConfig::default()
        };
        mutate(&mut config);
        let manager = Arc::new(FilesystemManager::new(&config).unwrap());
        let state = StateManager::in_memory();
        let context = StreamContext::new(config, manager, &state).await.unwrap();
        AvroStream::new(context)
    }

    #[tokio::test]
    async fn test_convert_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_avro(&dir.path().join("data.avro"), &[(1, "alpha"), (2, "beta")]);

        let stream = stream_for(dir.path(), |_| {}).await;
        let files = stream.context().selected_files().await.unwrap();
        let rows = stream.file_rows(&files[0]).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number, 1);
        assert_eq!(rows[0].record["id"], json!(1));
        assert_eq!(rows[1].record["name"], json!("beta"));
    }

    #[tokio::test]
    async fn test_properties_convert() {
        let dir = tempfile::tempdir().unwrap();
        write_avro(&dir.path().join("data.avro"), &[(1, "alpha")]);

        let stream = stream_for(dir.path(), |_| {}).await;
        let schema = stream.properties().await.unwrap();

        let json = schema.to_json();
        assert_eq!(json["properties"]["id"], json!({"type": ["integer"]}));
        assert_eq!(json["properties"]["name"], json!({"type": ["string"]}));
    }

    #[tokio::test]
    async fn test_union_field_is_not_converted() {
        let dir = tempfile::tempdir().unwrap();
        let schema = AvroSchema::parse_str(
            r#"{
                "type": "record",
                "name": "row",
                "fields": [{"name": "maybe", "type": ["null", "string"]}]
            }"#,
        )
        .unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        let mut record = AvroRecord::new(&schema).unwrap();
        record.put("maybe", AvroValue::Union(1, Box::new(AvroValue::String("x".into()))));
        writer.append(record).unwrap();
        std::fs::write(dir.path().join("data.avro"), writer.into_inner().unwrap()).unwrap();

        let stream = stream_for(dir.path(), |_| {}).await;
        let err = stream.properties().await.unwrap_err();
        assert!(err.to_string().contains("has not been implemented"));
    }

    #[tokio::test]
    async fn test_envelope_wraps_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_avro(&dir.path().join("data.avro"), &[(1, "alpha")]);

        let stream = stream_for(dir.path(), |c| {
            c.avro_type_coercion_strategy = CoercionStrategy::Envelope;
        })
        .await;

        let schema = stream.properties().await.unwrap();
        assert_eq!(
            schema.to_json()["properties"]["record"],
            json!({"type": ["null", "object"]})
        );

        let files = stream.context().selected_files().await.unwrap();
        let rows = stream.file_rows(&files[0]).await.unwrap();
        assert_eq!(rows[0].record["record"], json!({"id": 1, "name": "alpha"}));
    }

    // ------------------------------------------------------------------------
    // Value conversion
    // ------------------------------------------------------------------------

    #[test]
    fn test_primitive_conversion() {
        assert_eq!(avro_to_json(AvroValue::Null, "f").unwrap(), JsonValue::Null);
        assert_eq!(avro_to_json(AvroValue::Boolean(true), "f").unwrap(), json!(true));
        assert_eq!(avro_to_json(AvroValue::Long(9), "f").unwrap(), json!(9));
        assert_eq!(avro_to_json(AvroValue::Double(1.5), "f").unwrap(), json!(1.5));
        assert_eq!(
            avro_to_json(AvroValue::Bytes(b"abc".to_vec()), "f").unwrap(),
            json!("abc")
        );
    }

    #[test]
    fn test_union_is_transparent() {
        let value = AvroValue::Union(1, Box::new(AvroValue::String("x".to_string())));
        assert_eq!(avro_to_json(value, "f").unwrap(), json!("x"));
    }

    #[test]
    fn test_enum_becomes_symbol() {
        let value = AvroValue::Enum(2, "GREEN".to_string());
        assert_eq!(avro_to_json(value, "f").unwrap(), json!("GREEN"));
    }

    #[test]
    fn test_temporal_conversion() {
        assert_eq!(
            avro_to_json(AvroValue::Date(19358), "f").unwrap(),
            json!("2023-01-01")
        );
        assert_eq!(
            avro_to_json(AvroValue::TimestampMillis(1_672_531_200_000), "f").unwrap(),
            json!("2023-01-01T00:00:00Z")
        );
        assert_eq!(
            avro_to_json(AvroValue::TimeMillis(16_380_000), "f").unwrap(),
            json!("04:33:00")
        );
    }

    #[test]
    fn test_nested_record_conversion() {
        let value = AvroValue::Record(vec![
            ("id".to_string(), AvroValue::Int(1)),
            (
                "tags".to_string(),
                AvroValue::Array(vec![AvroValue::String("a".to_string())]),
            ),
        ]);
        assert_eq!(
            avro_to_json(value, "f").unwrap(),
            json!({"id": 1, "tags": ["a"]})
        );
    }
}
