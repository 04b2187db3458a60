//! Tap configuration
//!
//! This module contains the full settings surface of the tap: the config
//! object deserialized from JSON config files (with an environment-variable
//! overlay), its validation rules, and the settings JSON schema reported by
//! about mode.

use crate::error::{Error, Result};
use crate::types::{ErrorHandling, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

/// Prefix for environment-supplied settings, e.g. `TAP_UNIVERSAL_FILE_PROTOCOL`
pub const ENV_PREFIX: &str = "TAP_UNIVERSAL_FILE_";

// ============================================================================
// Setting Enums
// ============================================================================

/// Where files are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Local filesystem
    File,
    /// Amazon S3
    S3,
}

/// The format streams parse files as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Delimited,
    Jsonl,
    Avro,
    Parquet,
}

/// Decompression applied to file contents before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    Zip,
    Bz2,
    Gzip,
    Lzma,
    Xz,
    /// Choose a codec from the file extension
    #[default]
    Detect,
}

/// How remote file contents are cached between reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachingStrategy {
    /// Fetch on every read
    None,
    /// Cache for the duration of one invocation
    #[default]
    Once,
    /// Cache in the OS temp directory across invocations
    Persistent,
}

/// Which rows contribute fields to a JSONL schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonlSamplingStrategy {
    /// The first row of the first file
    #[default]
    First,
    /// Every row of every file
    All,
}

/// How JSONL values map onto a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonlCoercionStrategy {
    /// Any JSON type is allowed for any field
    #[default]
    Any,
    /// All values are coerced to strings
    String,
    /// Rows are wrapped as `{"record": row}` with no internal schema
    Envelope,
}

/// How Avro/Parquet schemas map onto JSON schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionStrategy {
    /// Convert the file's schema type by type, failing on exotic types
    #[default]
    Convert,
    /// Wrap rows as `{"record": row}` with no internal schema
    Envelope,
}

// ============================================================================
// Batch Config
// ============================================================================

/// Nested `batch_config` object controlling batch-message output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// How batch files are encoded
    pub encoding: BatchEncoding,
    /// Where batch files are written
    pub storage: BatchStorage,
}

/// Batch file encoding settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchEncoding {
    /// Serialization format for batch files
    #[serde(default)]
    pub format: BatchFormat,
    /// Compression applied to batch files
    #[serde(default)]
    pub compression: BatchCompression,
}

/// Serialization format for batch files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFormat {
    #[default]
    Jsonl,
}

/// Compression for batch files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCompression {
    #[default]
    Gzip,
    None,
}

/// Batch storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStorage {
    /// Directory or `s3://bucket/path` URL batch files are written under
    pub root: String,
    /// Prefix prepended to batch file names
    #[serde(default)]
    pub prefix: Option<String>,
}

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration, merged from config files and the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// The name of the stream that is output by the tap
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    /// The protocol to use to retrieve data (required)
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// The path to obtain files from, or `bucket-name/path` for S3 (required)
    #[serde(default)]
    pub file_path: Option<String>,

    /// A regex pattern to only include certain files, matched against basenames
    #[serde(default)]
    pub file_regex: Option<String>,

    /// The type of file to sync; kept as a raw string so near-miss values can
    /// be answered with guidance
    #[serde(default = "default_file_type")]
    pub file_type: String,

    /// The encoding used to decompress data
    #[serde(default)]
    pub compression: Compression,

    /// Whether rows carry `_sdc_file_name`, `_sdc_line_number`, and
    /// `_sdc_last_modified`
    #[serde(default = "default_true")]
    pub additional_info: bool,

    /// Used in place of state; files last modified before it are not synced
    #[serde(default)]
    pub start_date: Option<String>,

    /// Handling of improperly formatted records in delimited files
    #[serde(default)]
    pub delimited_error_handling: ErrorHandling,

    /// Field delimiter, or `detect` to pick by file extension
    #[serde(default = "default_delimiter")]
    pub delimited_delimiter: String,

    /// Quote character for delimited fields
    #[serde(default = "default_quote_character")]
    pub delimited_quote_character: String,

    /// Number of lines to drop from the start of each delimited file
    #[serde(default)]
    pub delimited_header_skip: usize,

    /// Number of lines to drop from the end of each delimited file
    #[serde(default)]
    pub delimited_footer_skip: usize,

    /// Headers to use instead of a header row, for headerless files
    #[serde(default)]
    pub delimited_override_headers: Option<Vec<String>>,

    /// Handling of improperly formatted records in JSONL files
    #[serde(default)]
    pub jsonl_error_handling: ErrorHandling,

    /// Which rows contribute fields to the JSONL schema
    #[serde(default)]
    pub jsonl_sampling_strategy: JsonlSamplingStrategy,

    /// How JSONL values map onto the schema
    #[serde(default)]
    pub jsonl_type_coercion_strategy: JsonlCoercionStrategy,

    /// How Avro schemas map onto JSON schemas
    #[serde(default)]
    pub avro_type_coercion_strategy: CoercionStrategy,

    /// How Parquet schemas map onto JSON schemas
    #[serde(default)]
    pub parquet_type_coercion_strategy: CoercionStrategy,

    /// Whether to connect to S3 without credentials
    #[serde(default)]
    pub s3_anonymous_connection: bool,

    /// S3 access key; falls back to the environment variable of the same name
    #[serde(rename = "AWS_ACCESS_KEY_ID", default)]
    pub aws_access_key_id: Option<String>,

    /// S3 secret key; falls back to the environment variable of the same name
    #[serde(rename = "AWS_SECRET_ACCESS_KEY", default)]
    pub aws_secret_access_key: Option<String>,

    /// Caching method for remote file contents
    #[serde(default)]
    pub caching_strategy: CachingStrategy,

    /// Stream map definitions keyed by stream name or alias
    #[serde(default)]
    pub stream_maps: Option<JsonObject>,

    /// Values addressable from stream maps as `config.<key>`
    #[serde(default)]
    pub stream_map_config: Option<JsonObject>,

    /// Whether nested record properties are flattened before emission
    #[serde(default)]
    pub flattening_enabled: bool,

    /// Maximum depth to flatten to
    #[serde(default)]
    pub flattening_max_depth: Option<usize>,

    /// Batch-message output settings; per-record RECORD messages when absent
    #[serde(default)]
    pub batch_config: Option<BatchConfig>,

    /// Rows per batch file
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_stream_name() -> String {
    "file".to_string()
}

fn default_file_type() -> String {
    "delimited".to_string()
}

fn default_delimiter() -> String {
    "detect".to_string()
}

fn default_quote_character() -> String {
    "\"".to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    1000
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            stream_name: default_stream_name(),
            protocol: None,
            file_path: None,
            file_regex: None,
            file_type: default_file_type(),
            compression: Compression::default(),
            additional_info: true,
            start_date: None,
            delimited_error_handling: ErrorHandling::default(),
            delimited_delimiter: default_delimiter(),
            delimited_quote_character: default_quote_character(),
            delimited_header_skip: 0,
            delimited_footer_skip: 0,
            delimited_override_headers: None,
            jsonl_error_handling: ErrorHandling::default(),
            jsonl_sampling_strategy: JsonlSamplingStrategy::default(),
            jsonl_type_coercion_strategy: JsonlCoercionStrategy::default(),
            avro_type_coercion_strategy: CoercionStrategy::default(),
            parquet_type_coercion_strategy: CoercionStrategy::default(),
            s3_anonymous_connection: false,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            caching_strategy: CachingStrategy::default(),
            stream_maps: None,
            stream_map_config: None,
            flattening_enabled: false,
            flattening_max_depth: None,
            batch_config: None,
            batch_size: default_batch_size(),
        }
    }
}

impl TapConfig {
    /// Load configuration by merging JSON config files in order, with an
    /// environment overlay applied last.
    ///
    /// The special path `ENV` skips file loading for that argument, so
    /// `--config=ENV` reads settings purely from the environment.
    pub fn load(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut merged = JsonObject::new();
        for path in paths {
            let path = path.as_ref();
            if path.as_os_str() == "ENV" {
                continue;
            }
            let raw = std::fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Failed to read config file {}: {e}", path.display()))
            })?;
            let value: JsonValue = serde_json::from_str(&raw)?;
            let object = value.as_object().ok_or_else(|| {
                Error::config(format!("Config file {} is not a JSON object", path.display()))
            })?;
            for (key, value) in object {
                merged.insert(key.clone(), value.clone());
            }
        }

        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_merged(merged, &env)
    }

    /// Build a config from an already-merged JSON object plus environment
    /// variables. Split out from [`TapConfig::load`] so the overlay is testable
    /// without touching the process environment.
    pub fn from_merged(mut merged: JsonObject, env: &HashMap<String, String>) -> Result<Self> {
        for setting in SETTINGS {
            let var = format!("{ENV_PREFIX}{}", setting.name.to_uppercase());
            if let Some(raw) = env.get(&var) {
                merged.insert(setting.name.to_string(), env_value(raw));
            }
        }
        // AWS credentials also fall back to the conventional variable names.
        for key in ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"] {
            if !merged.contains_key(key) {
                if let Some(raw) = env.get(key) {
                    merged.insert(key.to_string(), JsonValue::String(raw.clone()));
                }
            }
        }

        let config: Self = serde_json::from_value(JsonValue::Object(merged))?;
        Ok(config)
    }

    /// Validate settings that serde alone cannot reject.
    pub fn validate(&self) -> Result<()> {
        if self.protocol.is_none() {
            return Err(Error::missing_field("protocol"));
        }
        if self.file_path.is_none() {
            return Err(Error::missing_field("file_path"));
        }
        self.file_type()?;
        self.quote_character()?;
        if let Some(pattern) = &self.file_regex {
            regex::Regex::new(pattern)
                .map_err(|e| Error::invalid_value("file_regex", e.to_string()))?;
        }
        if self.delimited_delimiter != "detect" && self.delimited_delimiter.chars().count() != 1 {
            return Err(Error::invalid_value(
                "delimited_delimiter",
                "must be a single character or 'detect'",
            ));
        }
        if self.flattening_enabled && self.flattening_max_depth.is_none() {
            return Err(Error::invalid_value(
                "flattening_max_depth",
                "must be set when flattening_enabled is true",
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_value("batch_size", "must be at least 1"));
        }
        Ok(())
    }

    /// The configured protocol, or a missing-field error.
    pub fn protocol(&self) -> Result<Protocol> {
        self.protocol.ok_or_else(|| Error::missing_field("protocol"))
    }

    /// The configured file path, or a missing-field error.
    pub fn file_path(&self) -> Result<&str> {
        self.file_path
            .as_deref()
            .ok_or_else(|| Error::missing_field("file_path"))
    }

    /// Resolve `file_type`, answering near-miss values with guidance.
    pub fn file_type(&self) -> Result<FileType> {
        match self.file_type.as_str() {
            "delimited" => Ok(FileType::Delimited),
            "jsonl" => Ok(FileType::Jsonl),
            "avro" => Ok(FileType::Avro),
            "parquet" => Ok(FileType::Parquet),
            t @ ("csv" | "tsv" | "txt") => Err(Error::config(format!(
                "'{t}' is not a valid file_type. Did you mean 'delimited'?"
            ))),
            t @ ("json" | "ndjson") => Err(Error::config(format!(
                "'{t}' is not a valid file_type. Did you mean 'jsonl'?"
            ))),
            t => Err(Error::config(format!("'{t}' is not a valid file_type."))),
        }
    }

    /// The delimited quote character as a single char.
    pub fn quote_character(&self) -> Result<char> {
        let mut chars = self.delimited_quote_character.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::invalid_value(
                "delimited_quote_character",
                "must be a single character",
            )),
        }
    }
}

/// Turn an environment string into a JSON value: JSON literals (booleans,
/// numbers, arrays, objects) parse as themselves, everything else stays a
/// string.
fn env_value(raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(value @ (JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::Array(_) | JsonValue::Object(_))) => {
            value
        }
        _ => JsonValue::String(raw.to_string()),
    }
}

// ============================================================================
// Settings Schema (about mode)
// ============================================================================

/// One entry in the tap's settings table
pub struct Setting {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub secret: bool,
    pub default: Option<&'static str>,
    pub allowed_values: &'static [&'static str],
    pub description: &'static str,
}

/// Every setting the tap understands, in declaration order.
pub const SETTINGS: &[Setting] = &[
    Setting {
        name: "stream_name",
        kind: "string",
        required: false,
        secret: false,
        default: Some("file"),
        allowed_values: &[],
        description: "The name of the stream that is output by the tap.",
    },
    Setting {
        name: "protocol",
        kind: "string",
        required: true,
        secret: false,
        default: None,
        allowed_values: &["file", "s3"],
        description: "The protocol to use to retrieve data.",
    },
    Setting {
        name: "file_path",
        kind: "string",
        required: true,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "The path to obtain files from. Example: `/foo/bar`. Or, for \
                      `protocol==s3`, use `s3-bucket-name` instead.",
    },
    Setting {
        name: "file_regex",
        kind: "string",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "A regex pattern to only include certain files. Example: `.*\\.csv`.",
    },
    Setting {
        name: "file_type",
        kind: "string",
        required: false,
        secret: false,
        default: Some("delimited"),
        allowed_values: &[],
        description: "Indicates the type of file to sync, where `delimited` is for CSV/TSV \
                      files and similar. Note that *all* files will be read as that type, \
                      regardless of file extension. To only read from files with a matching \
                      file extension, appropriately configure `file_regex`.",
    },
    Setting {
        name: "compression",
        kind: "string",
        required: false,
        secret: false,
        default: Some("detect"),
        allowed_values: &["none", "zip", "bz2", "gzip", "lzma", "xz", "detect"],
        description: "The encoding used to decompress data. If set to `none` or any encoding, \
                      that setting will be applied to *all* files, regardless of file \
                      extension. If set to `detect`, encodings will be applied based on file \
                      extension.",
    },
    Setting {
        name: "additional_info",
        kind: "boolean",
        required: false,
        secret: false,
        default: Some("true"),
        allowed_values: &[],
        description: "If `true`, each row in the tap's output will have three additional \
                      columns: `_sdc_file_name`, `_sdc_line_number`, and `_sdc_last_modified`. \
                      Incremental replication requires `additional_info==true`.",
    },
    Setting {
        name: "start_date",
        kind: "date_iso8601",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "Used in place of state. Files that were last modified before the \
                      `start_date` will not be synced.",
    },
    Setting {
        name: "delimited_error_handling",
        kind: "string",
        required: false,
        secret: false,
        default: Some("fail"),
        allowed_values: &["fail", "ignore"],
        description: "The method with which to handle improperly formatted records in \
                      delimited files. `fail` will cause the tap to fail if an improperly \
                      formatted record is detected. `ignore` will ignore the fact that it is \
                      improperly formatted and process it anyway.",
    },
    Setting {
        name: "delimited_delimiter",
        kind: "string",
        required: false,
        secret: false,
        default: Some("detect"),
        allowed_values: &[],
        description: "The character used to separate records in a delimited file. Can be any \
                      character or the special value `detect`. If a character is provided, all \
                      delimited files will use that value. `detect` will use `,` for `.csv` \
                      files, `\\t` for `.tsv` files, and fail if other file types are present.",
    },
    Setting {
        name: "delimited_quote_character",
        kind: "string",
        required: false,
        secret: false,
        default: Some("\""),
        allowed_values: &[],
        description: "The character used to indicate when a record in a delimited file \
                      contains a delimiter character.",
    },
    Setting {
        name: "delimited_header_skip",
        kind: "integer",
        required: false,
        secret: false,
        default: Some("0"),
        allowed_values: &[],
        description: "The number of initial rows to skip at the beginning of each delimited \
                      file.",
    },
    Setting {
        name: "delimited_footer_skip",
        kind: "integer",
        required: false,
        secret: false,
        default: Some("0"),
        allowed_values: &[],
        description: "The number of rows to skip at the end of each delimited file.",
    },
    Setting {
        name: "delimited_override_headers",
        kind: "array",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "An optional array of headers used to override the default column names \
                      in delimited files, allowing for headerless files to be correctly read.",
    },
    Setting {
        name: "jsonl_error_handling",
        kind: "string",
        required: false,
        secret: false,
        default: Some("fail"),
        allowed_values: &["fail", "ignore"],
        description: "The method with which to handle improperly formatted records in JSONL \
                      files. `fail` will cause the tap to fail if an improperly formatted \
                      record is detected. `ignore` will skip it and continue.",
    },
    Setting {
        name: "jsonl_sampling_strategy",
        kind: "string",
        required: false,
        secret: false,
        default: Some("first"),
        allowed_values: &["first", "all"],
        description: "The strategy determining how to read the keys in a JSONL file. `first` \
                      assumes that the first record in a file is representative of all keys. \
                      `all` unions the keys of every record in every file.",
    },
    Setting {
        name: "jsonl_type_coercion_strategy",
        kind: "string",
        required: false,
        secret: false,
        default: Some("any"),
        allowed_values: &["any", "string", "envelope"],
        description: "The strategy determining how to construct the schema for JSONL files \
                      when the types represented are ambiguous. `any` will provide a generic \
                      schema for all keys, allowing them to be any valid JSON type. `string` \
                      will require all keys to be strings and will convert other values \
                      accordingly. `envelope` will deliver each JSONL row as a JSON object \
                      with no internal schema.",
    },
    Setting {
        name: "avro_type_coercion_strategy",
        kind: "string",
        required: false,
        secret: false,
        default: Some("convert"),
        allowed_values: &["convert", "envelope"],
        description: "The strategy deciding how to convert Avro Schema to JSON Schema when \
                      the conversion is ambiguous. `convert` will attempt to convert from \
                      Avro Schema to JSON Schema and will fail if a type can't be easily \
                      coerced. `envelope` will wrap each record in an object without \
                      providing an internal schema for the record.",
    },
    Setting {
        name: "parquet_type_coercion_strategy",
        kind: "string",
        required: false,
        secret: false,
        default: Some("convert"),
        allowed_values: &["convert", "envelope"],
        description: "The strategy deciding how to convert Parquet schemas to JSON Schema \
                      when the conversion is ambiguous. `convert` will attempt to convert \
                      type by type and will fail if a type can't be easily coerced. \
                      `envelope` will wrap each record in an object without providing an \
                      internal schema for the record.",
    },
    Setting {
        name: "s3_anonymous_connection",
        kind: "boolean",
        required: false,
        secret: false,
        default: Some("false"),
        allowed_values: &[],
        description: "Whether to use an anonymous S3 connection, without any credentials. \
                      Ignored if `protocol!=s3`.",
    },
    Setting {
        name: "AWS_ACCESS_KEY_ID",
        kind: "string",
        required: false,
        secret: true,
        default: None,
        allowed_values: &[],
        description: "The access key to use when authenticating to S3. Ignored if \
                      `protocol!=s3` or `s3_anonymous_connection=true`. Defaults to the value \
                      of the environment variable of the same name.",
    },
    Setting {
        name: "AWS_SECRET_ACCESS_KEY",
        kind: "string",
        required: false,
        secret: true,
        default: None,
        allowed_values: &[],
        description: "The access key secret to use when authenticating to S3. Ignored if \
                      `protocol!=s3` or `s3_anonymous_connection=true`. Defaults to the value \
                      of the environment variable of the same name.",
    },
    Setting {
        name: "caching_strategy",
        kind: "string",
        required: false,
        secret: false,
        default: Some("once"),
        allowed_values: &["none", "once", "persistent"],
        description: "*DEVELOPERS ONLY* The caching method to use when `protocol!=file`. \
                      `none` does not use caching at all. `once` (the default) will cache all \
                      files for the duration of the tap's invocation, then discard them upon \
                      completion. `persistent` will allow caches to persist between \
                      invocations of the tap, storing them in your OS's temp directory. It is \
                      recommended that you do not modify this setting.",
    },
    Setting {
        name: "stream_maps",
        kind: "object",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "Stream maps keyed by stream name: alias a stream, drop it with null, or \
                      reshape its properties.",
    },
    Setting {
        name: "stream_map_config",
        kind: "object",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "Values addressable from stream maps as `config.<key>`.",
    },
    Setting {
        name: "flattening_enabled",
        kind: "boolean",
        required: false,
        secret: false,
        default: Some("false"),
        allowed_values: &[],
        description: "Whether nested record properties are flattened into `parent__child` \
                      columns before emission.",
    },
    Setting {
        name: "flattening_max_depth",
        kind: "integer",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "The maximum depth to flatten to. Required when `flattening_enabled` is \
                      true.",
    },
    Setting {
        name: "batch_config",
        kind: "object",
        required: false,
        secret: false,
        default: None,
        allowed_values: &[],
        description: "When present, records are written as encoded batch files \
                      (`encoding.format`, `encoding.compression`) under `storage.root` with \
                      `storage.prefix`, and BATCH messages replace RECORD messages.",
    },
    Setting {
        name: "batch_size",
        kind: "integer",
        required: false,
        secret: false,
        default: Some("1000"),
        allowed_values: &[],
        description: "The number of rows written to each batch file.",
    },
];

/// Build a `Must be one of ...` clause for a set of allowed values.
fn one_of(allowed_values: &[&str]) -> String {
    match allowed_values {
        [] => String::new(),
        [only] => format!("Must be `{only}`."),
        [first, second] => format!("Must be either `{first}` or `{second}`."),
        [init @ .., last] => {
            let mut clause = String::from("Must be one of ");
            for value in init {
                clause.push_str(&format!("`{value}`, "));
            }
            clause.push_str(&format!("or `{last}`."));
            clause
        }
    }
}

/// The settings JSON schema reported by about mode.
pub fn settings_schema() -> JsonValue {
    let mut properties = JsonObject::new();
    let mut required = Vec::new();
    for setting in SETTINGS {
        let mut entry = JsonObject::new();
        entry.insert("type".to_string(), json!(setting.kind));
        if let Some(default) = setting.default {
            entry.insert("default".to_string(), env_value(default));
        }
        let description = if setting.allowed_values.is_empty() {
            setting.description.to_string()
        } else {
            format!("{} {}", one_of(setting.allowed_values), setting.description)
        };
        entry.insert("description".to_string(), json!(description));
        if !setting.allowed_values.is_empty() {
            entry.insert("enum".to_string(), json!(setting.allowed_values));
        }
        if setting.secret {
            entry.insert("secret".to_string(), json!(true));
        }
        properties.insert(setting.name.to_string(), JsonValue::Object(entry));
        if setting.required {
            required.push(setting.name);
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn config_from_json(raw: &str) -> TapConfig {
        TapConfig::from_merged(
            serde_json::from_str::<JsonValue>(raw)
                .unwrap()
                .as_object()
                .unwrap()
                .clone(),
            &HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from_json(r#"{"protocol": "file", "file_path": "/data"}"#);
        assert_eq!(config.stream_name, "file");
        assert_eq!(config.file_type, "delimited");
        assert_eq!(config.compression, Compression::Detect);
        assert!(config.additional_info);
        assert_eq!(config.delimited_error_handling, crate::types::ErrorHandling::Fail);
        assert_eq!(config.delimited_delimiter, "detect");
        assert_eq!(config.delimited_quote_character, "\"");
        assert_eq!(config.delimited_header_skip, 0);
        assert_eq!(config.caching_strategy, CachingStrategy::Once);
        assert_eq!(config.batch_size, 1000);
        config.validate().unwrap();
    }

    #[test]
    fn test_protocol_rejects_unknown_values() {
        let merged = serde_json::from_str::<JsonValue>(r#"{"protocol": "ftp", "file_path": "/x"}"#)
            .unwrap()
            .as_object()
            .unwrap()
            .clone();
        let err = TapConfig::from_merged(merged, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("unknown variant `ftp`"));
    }

    #[test]
    fn test_missing_required_fields() {
        let config = config_from_json(r#"{"file_path": "/data"}"#);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required config field: protocol");

        let config = config_from_json(r#"{"protocol": "file"}"#);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required config field: file_path");
    }

    #[test_case("csv", Some("delimited"))]
    #[test_case("tsv", Some("delimited"))]
    #[test_case("txt", Some("delimited"))]
    #[test_case("json", Some("jsonl"))]
    #[test_case("ndjson", Some("jsonl"))]
    #[test_case("orc", None)]
    fn test_file_type_did_you_mean(near_miss: &str, suggestion: Option<&str>) {
        let config = config_from_json(&format!(
            r#"{{"protocol": "file", "file_path": "/data", "file_type": "{near_miss}"}}"#
        ));
        let err = config.file_type().unwrap_err();
        let expected = match suggestion {
            Some(hint) => format!(
                "Configuration error: '{near_miss}' is not a valid file_type. Did you mean '{hint}'?"
            ),
            None => format!("Configuration error: '{near_miss}' is not a valid file_type."),
        };
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_file_type_parquet_accepted() {
        let config = config_from_json(
            r#"{"protocol": "file", "file_path": "/data", "file_type": "parquet"}"#,
        );
        assert_eq!(config.file_type().unwrap(), FileType::Parquet);
    }

    #[test]
    fn test_invalid_quote_character() {
        let config = config_from_json(
            r#"{"protocol": "file", "file_path": "/data", "delimited_quote_character": "''"}"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_regex() {
        let config = config_from_json(
            r#"{"protocol": "file", "file_path": "/data", "file_regex": "["}"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flattening_requires_depth() {
        let config = config_from_json(
            r#"{"protocol": "file", "file_path": "/data", "flattening_enabled": true}"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("flattening_max_depth"));
    }

    #[test]
    fn test_env_overlay() {
        let mut env = HashMap::new();
        env.insert(
            format!("{ENV_PREFIX}PROTOCOL"),
            "file".to_string(),
        );
        env.insert(
            format!("{ENV_PREFIX}ADDITIONAL_INFO"),
            "false".to_string(),
        );
        env.insert("AWS_ACCESS_KEY_ID".to_string(), "AKIA123".to_string());

        let merged = serde_json::from_str::<JsonValue>(r#"{"file_path": "/data"}"#)
            .unwrap()
            .as_object()
            .unwrap()
            .clone();
        let config = TapConfig::from_merged(merged, &env).unwrap();
        assert_eq!(config.protocol.unwrap(), Protocol::File);
        assert!(!config.additional_info);
        assert_eq!(config.aws_access_key_id.as_deref(), Some("AKIA123"));
    }

    #[test]
    fn test_env_overlay_does_not_clobber_explicit_aws_keys() {
        let mut env = HashMap::new();
        env.insert("AWS_ACCESS_KEY_ID".to_string(), "from-env".to_string());

        let merged = serde_json::from_str::<JsonValue>(
            r#"{"protocol": "file", "file_path": "/data", "AWS_ACCESS_KEY_ID": "from-config"}"#,
        )
        .unwrap()
        .as_object()
        .unwrap()
        .clone();
        let config = TapConfig::from_merged(merged, &env).unwrap();
        assert_eq!(config.aws_access_key_id.as_deref(), Some("from-config"));
    }

    #[test]
    fn test_batch_config_parsing() {
        let config = config_from_json(
            r#"{
                "protocol": "file",
                "file_path": "/data",
                "batch_config": {
                    "encoding": {"format": "jsonl", "compression": "gzip"},
                    "storage": {"root": "/tmp/batches", "prefix": "run-"}
                }
            }"#,
        );
        let batch = config.batch_config.unwrap();
        assert_eq!(batch.encoding.format, BatchFormat::Jsonl);
        assert_eq!(batch.encoding.compression, BatchCompression::Gzip);
        assert_eq!(batch.storage.root, "/tmp/batches");
        assert_eq!(batch.storage.prefix.as_deref(), Some("run-"));
    }

    #[test]
    fn test_one_of_phrasing() {
        assert_eq!(one_of(&["a"]), "Must be `a`.");
        assert_eq!(one_of(&["a", "b"]), "Must be either `a` or `b`.");
        assert_eq!(one_of(&["a", "b", "c"]), "Must be one of `a`, `b`, or `c`.");
    }

    #[test]
    fn test_settings_schema_shape() {
        let schema = settings_schema();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("protocol"));
        assert!(properties.contains_key("batch_config"));
        assert_eq!(schema["required"], json!(["protocol", "file_path"]));
        assert_eq!(properties["compression"]["default"], json!("detect"));
        assert!(properties["AWS_SECRET_ACCESS_KEY"]["secret"].as_bool().unwrap());
        assert!(properties["protocol"]["description"]
            .as_str()
            .unwrap()
            .starts_with("Must be either `file` or `s3`."));
    }
}
