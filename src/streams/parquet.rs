//! Parquet file stream
//!
//! Reads Parquet files through the Arrow record batch reader. Under the
//! `convert` coercion strategy each Arrow field maps to a JSON schema type,
//! with temporal types carrying a format hint; unknown Arrow types fail
//! discovery. Under `envelope`, whole rows are wrapped as `{"record": row}`.

use super::{number_or_null, time_from_midnight, FileStream, ParsedRow, StreamContext};
use crate::config::CoercionStrategy;
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::types::{JsonObject, JsonValue};
use arrow::array::{
    Array, AsArray, BooleanArray, Float64Array, Int64Array, ListArray, MapArray, StringArray,
    StructArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

/// Stream over Parquet files
pub struct ParquetStream {
    context: StreamContext,
}

impl ParquetStream {
    pub fn new(context: StreamContext) -> Self {
        Self { context }
    }

    /// Shape one row per the coercion strategy
    fn pre_process(&self, record: JsonObject) -> JsonObject {
        match self.context.config().parquet_type_coercion_strategy {
            CoercionStrategy::Convert => record,
            CoercionStrategy::Envelope => {
                let mut wrapped = JsonObject::new();
                wrapped.insert("record".to_string(), JsonValue::Object(record));
                wrapped
            }
        }
    }
}

#[async_trait]
impl FileStream for ParquetStream {
    fn context(&self) -> &StreamContext {
        &self.context
    }

    /// Properties from every selected file's Arrow schema; same-named fields
    /// from later files win.
    async fn properties(&self) -> Result<Schema> {
        let strategy = self.context.config().parquet_type_coercion_strategy;
        let mut schema = Schema::new();
        for file in self.context.selected_files().await? {
            match strategy {
                CoercionStrategy::Convert => {
                    let data = self.context.read_decompressed(&file).await?;
                    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
                    for field in builder.schema().fields() {
                        let (json_type, format) = type_convert(field.data_type())?;
                        let mut property = SchemaProperty::of_types(vec![json_type]);
                        if let Some(format) = format {
                            property = property.with_format(format);
                        }
                        schema.add_property(field.name(), property);
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
        let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
        let reader = builder.build()?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let batch_schema = batch.schema();
            for row in 0..batch.num_rows() {
                let mut record = JsonObject::new();
                for (column_index, field) in batch_schema.fields().iter().enumerate() {
                    let value =
                        array_value_to_json(batch.column(column_index).as_ref(), row, &file.path)?;
                    record.insert(field.name().clone(), value);
                }
                rows.push(ParsedRow {
                    line_number: rows.len() + 1,
                    record: self.pre_process(record),
                });
            }
        }
        Ok(rows)
    }
}

/// Map an Arrow type to a JSON schema type and an optional format hint
fn type_convert(data_type: &DataType) -> Result<(JsonType, Option<&'static str>)> {
    Ok(match data_type {
        DataType::Null => (JsonType::Null, None),
        DataType::Boolean => (JsonType::Boolean, None),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => (JsonType::Integer, None),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => (JsonType::Number, None),
        DataType::Time32(_) | DataType::Time64(_) => (JsonType::String, Some("time")),
        DataType::Date32 | DataType::Date64 => (JsonType::String, Some("date")),
        DataType::Timestamp(_, _) => (JsonType::String, Some("date-time")),
        DataType::Binary
        | DataType::LargeBinary
        | DataType::FixedSizeBinary(_)
        | DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _)
        | DataType::Duration(_) => (JsonType::String, None),
        DataType::List(_) | DataType::LargeList(_) => (JsonType::Array, None),
        DataType::Map(_, _) | DataType::Struct(_) => (JsonType::Object, None),
        DataType::Dictionary(_, value_type) => return type_convert(value_type),
        other => return Err(Error::unsupported_type(other.to_string())),
    })
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, file_path: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::decode(
            file_path,
            format!("Failed to downcast to {}", std::any::type_name::<T>()),
        )
    })
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize, file_path: &str) -> Result<JsonValue> {
    if array.is_null(row) {
        return Ok(JsonValue::Null);
    }

    match array.data_type() {
        DataType::Null => Ok(JsonValue::Null),

        DataType::Boolean => Ok(JsonValue::Bool(
            downcast::<BooleanArray>(array, file_path)?.value(row),
        )),

        DataType::Int8 => Ok(JsonValue::Number(
            downcast::<arrow::array::Int8Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::Int16 => Ok(JsonValue::Number(
            downcast::<arrow::array::Int16Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::Int32 => Ok(JsonValue::Number(
            downcast::<arrow::array::Int32Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::Int64 => Ok(JsonValue::Number(
            downcast::<Int64Array>(array, file_path)?.value(row).into(),
        )),
        DataType::UInt8 => Ok(JsonValue::Number(
            downcast::<arrow::array::UInt8Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::UInt16 => Ok(JsonValue::Number(
            downcast::<arrow::array::UInt16Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::UInt32 => Ok(JsonValue::Number(
            downcast::<arrow::array::UInt32Array>(array, file_path)?
                .value(row)
                .into(),
        )),
        DataType::UInt64 => {
            // u64 can exceed i64; overflowing values are carried as strings
            let value = downcast::<arrow::array::UInt64Array>(array, file_path)?.value(row);
            match i64::try_from(value) {
                Ok(signed) => Ok(JsonValue::Number(signed.into())),
                Err(_) => Ok(JsonValue::String(value.to_string())),
            }
        }

        DataType::Float16 => {
            let value = downcast::<arrow::array::Float16Array>(array, file_path)?.value(row);
            Ok(number_or_null(f64::from(f32::from(value))))
        }
        DataType::Float32 => {
            let value = downcast::<arrow::array::Float32Array>(array, file_path)?.value(row);
            Ok(number_or_null(f64::from(value)))
        }
        DataType::Float64 => Ok(number_or_null(
            downcast::<Float64Array>(array, file_path)?.value(row),
        )),

        DataType::Utf8 => Ok(JsonValue::String(
            downcast::<StringArray>(array, file_path)?.value(row).to_string(),
        )),
        DataType::LargeUtf8 => Ok(JsonValue::String(
            downcast::<arrow::array::LargeStringArray>(array, file_path)?
                .value(row)
                .to_string(),
        )),

        DataType::Binary => Ok(JsonValue::String(
            String::from_utf8_lossy(downcast::<arrow::array::BinaryArray>(array, file_path)?.value(row))
                .into_owned(),
        )),
        DataType::LargeBinary => Ok(JsonValue::String(
            String::from_utf8_lossy(
                downcast::<arrow::array::LargeBinaryArray>(array, file_path)?.value(row),
            )
            .into_owned(),
        )),
        DataType::FixedSizeBinary(_) => Ok(JsonValue::String(
            String::from_utf8_lossy(
                downcast::<arrow::array::FixedSizeBinaryArray>(array, file_path)?.value(row),
            )
            .into_owned(),
        )),

        DataType::Date32 => {
            let days = downcast::<arrow::array::Date32Array>(array, file_path)?.value(row);
            Ok(JsonValue::String(super::date_from_epoch_days(
                days, file_path,
            )?))
        }
        DataType::Date64 => {
            let millis = downcast::<arrow::array::Date64Array>(array, file_path)?.value(row);
            let datetime = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| Error::decode(file_path, "date value out of range"))?;
            Ok(JsonValue::String(
                datetime.naive_utc().date().format("%Y-%m-%d").to_string(),
            ))
        }

        DataType::Time32(unit) => {
            let nanos = match unit {
                TimeUnit::Second => {
                    i64::from(
                        downcast::<arrow::array::Time32SecondArray>(array, file_path)?.value(row),
                    ) * 1_000_000_000
                }
                _ => {
                    i64::from(
                        downcast::<arrow::array::Time32MillisecondArray>(array, file_path)?
                            .value(row),
                    ) * 1_000_000
                }
            };
            Ok(JsonValue::String(time_from_midnight(nanos, file_path)?))
        }
        DataType::Time64(unit) => {
            let nanos = match unit {
                TimeUnit::Microsecond => {
                    downcast::<arrow::array::Time64MicrosecondArray>(array, file_path)?.value(row)
                        * 1_000
                }
                _ => downcast::<arrow::array::Time64NanosecondArray>(array, file_path)?.value(row),
            };
            Ok(JsonValue::String(time_from_midnight(nanos, file_path)?))
        }

        DataType::Timestamp(unit, timezone) => {
            let datetime = match unit {
                TimeUnit::Second => DateTime::from_timestamp(
                    downcast::<arrow::array::TimestampSecondArray>(array, file_path)?.value(row),
                    0,
                ),
                TimeUnit::Millisecond => DateTime::from_timestamp_millis(
                    downcast::<arrow::array::TimestampMillisecondArray>(array, file_path)?
                        .value(row),
                ),
                TimeUnit::Microsecond => DateTime::from_timestamp_micros(
                    downcast::<arrow::array::TimestampMicrosecondArray>(array, file_path)?
                        .value(row),
                ),
                TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
                    downcast::<arrow::array::TimestampNanosecondArray>(array, file_path)?
                        .value(row),
                )),
            }
            .ok_or_else(|| Error::decode(file_path, "timestamp value out of range"))?;

            Ok(JsonValue::String(if timezone.is_some() {
                datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            } else {
                datetime
                    .naive_utc()
                    .format("%Y-%m-%dT%H:%M:%S%.f")
                    .to_string()
            }))
        }

        DataType::Decimal128(_, _) => Ok(JsonValue::String(
            downcast::<arrow::array::Decimal128Array>(array, file_path)?.value_as_string(row),
        )),
        DataType::Decimal256(_, _) => Ok(JsonValue::String(
            downcast::<arrow::array::Decimal256Array>(array, file_path)?.value_as_string(row),
        )),

        DataType::Duration(unit) => {
            let ticks = match unit {
                TimeUnit::Second => {
                    downcast::<arrow::array::DurationSecondArray>(array, file_path)?.value(row)
                }
                TimeUnit::Millisecond => {
                    downcast::<arrow::array::DurationMillisecondArray>(array, file_path)?.value(row)
                }
                TimeUnit::Microsecond => {
                    downcast::<arrow::array::DurationMicrosecondArray>(array, file_path)?.value(row)
                }
                TimeUnit::Nanosecond => {
                    downcast::<arrow::array::DurationNanosecondArray>(array, file_path)?.value(row)
                }
            };
            Ok(JsonValue::String(ticks.to_string()))
        }

        DataType::List(_) => {
            let arr = downcast::<ListArray>(array, file_path)?;
            let values = arr.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i, file_path)?);
            }
            Ok(JsonValue::Array(items))
        }
        DataType::LargeList(_) => {
            let arr = downcast::<arrow::array::LargeListArray>(array, file_path)?;
            let values = arr.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i, file_path)?);
            }
            Ok(JsonValue::Array(items))
        }
        DataType::FixedSizeList(_, _) => {
            let arr = downcast::<arrow::array::FixedSizeListArray>(array, file_path)?;
            let values = arr.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i, file_path)?);
            }
            Ok(JsonValue::Array(items))
        }

        DataType::Struct(_) => {
            let arr = downcast::<StructArray>(array, file_path)?;
            let mut object = JsonObject::new();
            for (i, field) in arr.fields().iter().enumerate() {
                let value = array_value_to_json(arr.column(i).as_ref(), row, file_path)?;
                object.insert(field.name().clone(), value);
            }
            Ok(JsonValue::Object(object))
        }

        DataType::Map(_, _) => {
            let arr = downcast::<MapArray>(array, file_path)?;
            let entries = arr.value(row);
            let keys = entries.column(0);
            let values = entries.column(1);
            let mut object = JsonObject::new();
            for i in 0..entries.len() {
                let key = match array_value_to_json(keys.as_ref(), i, file_path)? {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                };
                object.insert(key, array_value_to_json(values.as_ref(), i, file_path)?);
            }
            Ok(JsonValue::Object(object))
        }

        DataType::Dictionary(_, _) => {
            let dict = array.as_any_dictionary_opt().ok_or_else(|| {
                Error::decode(file_path, "Failed to downcast to DictionaryArray")
            })?;
            let keys = dict.normalized_keys();
            array_value_to_json(dict.values().as_ref(), keys[row], file_path)
        }

        other => Err(Error::unsupported_type(other.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
