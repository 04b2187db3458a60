//! JSONL file stream
//!
//! Parses one JSON document per line. Line numbers are physical positions
//! within the file, so ignored lines still advance the count. The coercion
//! strategy decides both the shape of emitted rows and the property types the
//! schema advertises, and the sampling strategy decides how many rows are
//! inspected to find property names.

use super::{FileStream, ParsedRow, StreamContext};
use crate::config::{JsonlCoercionStrategy, JsonlSamplingStrategy};
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::types::{ErrorHandling, JsonObject, JsonValue};
use async_trait::async_trait;

/// Stream over line-delimited JSON files
pub struct JsonlStream {
    context: StreamContext,
}

impl JsonlStream {
    pub fn new(context: StreamContext) -> Self {
        Self { context }
    }

    /// Parse one line into a row, or `None` when the line is ignored
    fn parse_row(
        &self,
        line: &str,
        file_path: &str,
        line_number: usize,
    ) -> Result<Option<JsonObject>> {
        let value: JsonValue = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return match self.context.config().jsonl_error_handling {
                    ErrorHandling::Fail => Err(Error::MalformedJsonl {
                        file: file_path.to_string(),
                        line: line_number,
                        message: e.to_string(),
                    }),
                    ErrorHandling::Ignore => Ok(None),
                }
            }
        };
        self.pre_process(value, file_path, line_number)
    }

    /// Shape one parsed value per the coercion strategy
    fn pre_process(
        &self,
        value: JsonValue,
        file_path: &str,
        line_number: usize,
    ) -> Result<Option<JsonObject>> {
        match self.context.config().jsonl_type_coercion_strategy {
            JsonlCoercionStrategy::Envelope => {
                let mut record = JsonObject::new();
                record.insert("record".to_string(), value);
                Ok(Some(record))
            }
            JsonlCoercionStrategy::Any => match value {
                JsonValue::Object(record) => Ok(Some(record)),
                _ => self.non_object(file_path, line_number),
            },
            JsonlCoercionStrategy::String => match value {
                JsonValue::Object(record) => {
                    let mut coerced = JsonObject::new();
                    for (key, value) in record {
                        let value = match value {
                            JsonValue::Null => JsonValue::Null,
                            JsonValue::String(s) => JsonValue::String(s),
                            other => JsonValue::String(serde_json::to_string(&other)?),
                        };
                        coerced.insert(key, value);
                    }
                    Ok(Some(coerced))
                }
                _ => self.non_object(file_path, line_number),
            },
        }
    }

    /// A line that parsed to something the coercion strategy cannot use
    fn non_object(&self, file_path: &str, line_number: usize) -> Result<Option<JsonObject>> {
        match self.context.config().jsonl_error_handling {
            ErrorHandling::Fail => Err(Error::MalformedJsonl {
                file: file_path.to_string(),
                line: line_number,
                message: "JSON value is not an object".to_string(),
            }),
            ErrorHandling::Ignore => Ok(None),
        }
    }

    /// The first usable row across the selected files, parsing no further
    /// than necessary.
    async fn first_row(&self) -> Result<Option<JsonObject>> {
        for file in self.context.selected_files().await? {
            let data = self.context.read_decompressed(&file).await?;
            let text = String::from_utf8_lossy(&data);
            for (idx, line) in text.lines().enumerate() {
                if let Some(record) = self.parse_row(line, &file.path, idx + 1)? {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// The property shape every sampled field gets under the configured
    /// coercion strategy
    fn property_for_strategy(&self) -> SchemaProperty {
        match self.context.config().jsonl_type_coercion_strategy {
            JsonlCoercionStrategy::Any => SchemaProperty::of_types(vec![
                JsonType::Null,
                JsonType::Boolean,
                JsonType::Integer,
                JsonType::Number,
                JsonType::String,
                JsonType::Array,
                JsonType::Object,
            ]),
            JsonlCoercionStrategy::String => {
                SchemaProperty::of_types(vec![JsonType::Null, JsonType::String])
            }
            JsonlCoercionStrategy::Envelope => {
                SchemaProperty::of_types(vec![JsonType::Null, JsonType::Object])
            }
        }
    }
}

#[async_trait]
impl FileStream for JsonlStream {
    fn context(&self) -> &StreamContext {
        &self.context
    }

    async fn properties(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        match self.context.config().jsonl_sampling_strategy {
            JsonlSamplingStrategy::First => {
                if let Some(record) = self.first_row().await? {
                    for key in record.keys() {
                        schema.add_property(key, self.property_for_strategy());
                    }
                }
            }
            JsonlSamplingStrategy::All => {
                for file in self.context.selected_files().await? {
                    for row in self.file_rows(&file).await? {
                        for key in row.record.keys() {
                            schema.add_property(key, self.property_for_strategy());
                        }
                    }
                }
            }
        }
        Ok(schema)
    }

    async fn file_rows(&self, file: &FileInfo) -> Result<Vec<ParsedRow>> {
        let data = self.context.read_decompressed(file).await?;
        let text = String::from_utf8_lossy(&data);
        let mut rows = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_number = idx + 1;
            if let Some(record) = self.parse_row(line, &file.path, line_number)? {
                rows.push(ParsedRow {
                    line_number,
                    record,
                });
            }
        }
        Ok(rows)
    }
}

// ============================================================================
// Tests
// ============================================================================
