// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-universal-file
//!
//! A Singer tap that extracts records from files and emits them as JSON-lines
//! messages on stdout, ready to be piped into any Singer target.
//!
//! ## Features
//!
//! - **Four File Formats**: delimited (CSV/TSV), JSONL, Avro, and Parquet
//! - **Local and S3 Storage**: one `protocol` setting switches between them
//! - **Incremental Replication**: file modification times drive a
//!   `_sdc_last_modified` bookmark
//! - **Compression**: zip, bz2, gzip, lzma, and xz, detected by extension
//! - **Catalog Discovery**: schemas derived from the files themselves
//! - **Stream Maps and Flattening**: reshape records before emission
//! - **Batch Output**: spill records to JSONL batch files instead of RECORD
//!   messages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_universal_file::state::StateManager;
//! use tap_universal_file::streams::create_stream;
//! use tap_universal_file::{Result, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::load(&["config.json"])?;
//!     config.validate()?;
//!
//!     let state = StateManager::in_memory();
//!     let stream = create_stream(&config, &state).await?;
//!
//!     for file in stream.context().selected_files().await? {
//!         for row in stream.file_rows(&file).await? {
//!             // Emit RECORD messages
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Singer Interface                         │
//! │  --about → settings    --discover → catalog    sync → messages  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌────────────┬───────────┬──────┴──────┬─────────────┬───────────┐
//! │ Filesystem │  Streams  │  Transform  │   Singer    │   State   │
//! ├────────────┼───────────┼─────────────┼─────────────┼───────────┤
//! │ Local      │ Delimited │ Flattening  │ SCHEMA      │ Bookmarks │
//! │ S3         │ JSONL     │ Stream maps │ RECORD      │ Watermark │
//! │ Caching    │ Avro      │             │ STATE       │           │
//! │ Decompress │ Parquet   │             │ BATCH       │           │
//! └────────────┴───────────┴─────────────┴─────────────┴───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration loading, validation, and the settings schema
pub mod config;

/// Compression codec detection and decompression
pub mod compression;

/// Local and S3 file access
pub mod filesystem;

/// JSON schema construction
pub mod schema;

/// Singer protocol messages, catalog, and the message writer
pub mod singer;

/// State management and bookmarks
pub mod state;

/// File format streams
pub mod streams;

/// Record and schema transformation
pub mod transform;

/// Batch file output
pub mod batch;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
