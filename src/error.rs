//! Error types for tap-universal-file
//!
//! This module defines the error hierarchy for the entire tap.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for tap-universal-file
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Filesystem Errors
    // ============================================================================
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    #[error("No files found. Choose a different `file_path` or try a more lenient `file_regex`.")]
    NoFilesFound,

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Compression Errors
    // ============================================================================
    #[error("Decompression failed for {file}: {message}")]
    Decompression { file: String, message: String },

    // ============================================================================
    // Record Parsing Errors
    // ============================================================================
    #[error(
        "Error processing {file} at line {line}. Total number of column headers ({headers}) \
         doesn't align with the number of fields in the data ({fields}). To suppress this \
         error, change delimited_error_handling to 'ignore'."
    )]
    MalformedRow {
        file: String,
        line: usize,
        headers: usize,
        fields: usize,
    },

    #[error(
        "Error processing {file} at line {line}. JSON decode error was \"{message}\". To \
         suppress this error, change 'jsonl_error_handling' to 'ignore'."
    )]
    MalformedJsonl {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Failed to decode {file}: {message}")]
    Decode { file: String, message: String },

    // ============================================================================
    // Format/Schema Errors
    // ============================================================================
    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("The field type '{field_type}' has not been implemented.")]
    UnsupportedFieldType { field_type: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a filesystem error
    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create a decompression error
    pub fn decompression(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decompression {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported field type error
    pub fn unsupported_type(field_type: impl Into<String>) -> Self {
        Self::UnsupportedFieldType {
            field_type: field_type.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }
}

/// Result type alias for tap-universal-file
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
