//! Batch file output
//!
//! With `batch_config` set, sync buffers records into JSON-lines files of
//! `batch_size` rows instead of emitting one RECORD message per row. Each
//! full buffer is written under `storage.root` (a local directory or an
//! `s3://` URL), gzip-compressed unless `encoding.compression` is `none`,
//! and announced through a BATCH message carrying the file's URL. S3 writes
//! use the same credential settings as reads.

use crate::config::{BatchCompression, BatchConfig, BatchEncoding, TapConfig};
use crate::error::{Error, Result};
use crate::filesystem::{s3_store, split_bucket_url};
use crate::types::JsonObject;
use chrono::Utc;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Buffers records and writes them out as JSON-lines batch files
pub struct BatchWriter {
    stream_name: String,
    config: BatchConfig,
    batch_size: usize,
    store: Arc<dyn ObjectStore>,
    /// Store-relative directory the files land under
    object_prefix: Option<ObjectPath>,
    /// Base the manifest URLs are built from
    url_base: String,
    run_timestamp: String,
    sequence: usize,
    buffer: Vec<JsonObject>,
}

impl BatchWriter {
    /// Build a writer when `batch_config` is present.
    pub fn try_new(stream_name: &str, config: &TapConfig) -> Result<Option<Self>> {
        let Some(batch_config) = config.batch_config.clone() else {
            return Ok(None);
        };
        let root = batch_config.storage.root.trim_end_matches('/');

        let (store, object_prefix, url_base): (Arc<dyn ObjectStore>, _, _) =
            if root.starts_with("s3://") {
                let (bucket, prefix) = split_bucket_url(root);
                let store = s3_store(config, bucket)?;
                let object_prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
                (store, object_prefix, root.to_string())
            } else {
                std::fs::create_dir_all(root)?;
                let canonical = std::fs::canonicalize(root)?;
                let store = LocalFileSystem::new_with_prefix(&canonical).map_err(|e| {
                    Error::filesystem(format!("Failed to open batch directory {root}: {e}"))
                })?;
                let url_base = format!("file://{}", canonical.display());
                (Arc::new(store), None, url_base)
            };

        Ok(Some(Self {
            stream_name: stream_name.to_string(),
            batch_size: config.batch_size,
            config: batch_config,
            store,
            object_prefix,
            url_base,
            run_timestamp: Utc::now().format("%Y%m%dT%H%M%S").to_string(),
            sequence: 0,
            buffer: Vec::new(),
        }))
    }

    /// The encoding announced in BATCH messages.
    pub fn encoding(&self) -> BatchEncoding {
        self.config.encoding
    }

    /// Add one record, flushing a file once the buffer holds `batch_size`
    /// rows. Returns the URL of the file written, if any.
    pub async fn push(&mut self, record: JsonObject) -> Result<Option<String>> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            return Ok(Some(self.flush().await?));
        }
        Ok(None)
    }

    /// Write out any remaining buffered rows. Returns the URL of the file
    /// written, if any.
    pub async fn finish(&mut self) -> Result<Option<String>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.flush().await?))
    }

    async fn flush(&mut self) -> Result<String> {
        self.sequence += 1;
        let rows = self.buffer.len();
        let file_name = self.file_name();
        let payload = self.encode()?;

        let location = match &self.object_prefix {
            Some(prefix) => prefix.child(file_name.as_str()),
            None => ObjectPath::from(file_name.as_str()),
        };
        self.store.put(&location, payload.into()).await?;
        debug!(file = %file_name, rows, "Wrote batch file");
        Ok(format!("{}/{}", self.url_base, file_name))
    }

    fn file_name(&self) -> String {
        let prefix = self.config.storage.prefix.as_deref().unwrap_or("");
        let extension = match self.config.encoding.compression {
            BatchCompression::Gzip => ".jsonl.gz",
            BatchCompression::None => ".jsonl",
        };
        format!(
            "{prefix}{}-{}-{:05}{extension}",
            self.stream_name, self.run_timestamp, self.sequence
        )
    }

    fn encode(&mut self) -> Result<Vec<u8>> {
        let mut lines = Vec::new();
        for record in self.buffer.drain(..) {
            serde_json::to_writer(&mut lines, &record)?;
            lines.push(b'\n');
        }
        match self.config.encoding.compression {
            BatchCompression::None => Ok(lines),
            BatchCompression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&lines)?;
                Ok(encoder.finish()?)
            }
        }
    }
}
