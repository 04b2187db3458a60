//! Filesystem manager
//!
//! Wraps the object store selected by `protocol` and implements the tap's
//! file-selection rules: non-recursive listing, empty-file and regex
//! filtering, ascending last-modified ordering, and the incremental
//! watermark cut.

use crate::config::{CachingStrategy, Protocol, TapConfig};
use crate::error::{Error, Result};
use crate::filesystem::cache::ByteCache;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// One selectable file, as listed from the object store
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full display path: `/dir/name.csv` locally, `bucket/key.csv` on S3
    pub path: String,
    /// Store-relative location used for reads
    pub location: ObjectPath,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
}

impl FileInfo {
    /// The path's final component, used for `file_regex` matching.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The last-modified timestamp as an ISO-8601 string with a numeric
    /// offset, the form carried in `_sdc_last_modified` and state bookmarks.
    pub fn last_modified_iso(&self) -> String {
        self.last_modified
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

/// Filesystem manager selected by `protocol`
#[derive(Debug)]
pub struct FilesystemManager {
    protocol: Protocol,
    store: Arc<dyn ObjectStore>,
    list_prefix: Option<ObjectPath>,
    root_display: String,
    file_regex: Option<Regex>,
    cache: ByteCache,
}

impl FilesystemManager {
    /// Build a manager from the tap configuration.
    pub fn new(config: &TapConfig) -> Result<Self> {
        let protocol = config.protocol()?;
        let file_path = config.file_path()?;
        let file_regex = config
            .file_regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::invalid_value("file_regex", e.to_string()))?;

        match protocol {
            Protocol::File => {
                let store = LocalFileSystem::new_with_prefix(file_path).map_err(|e| {
                    Error::filesystem(format!("Failed to open directory {file_path}: {e}"))
                })?;
                Ok(Self {
                    protocol,
                    store: Arc::new(store),
                    list_prefix: None,
                    root_display: file_path.trim_end_matches('/').to_string(),
                    file_regex,
                    // Local reads are never cached.
                    cache: ByteCache::for_strategy(CachingStrategy::None),
                })
            }
            Protocol::S3 => {
                let (bucket, prefix) = split_bucket_url(file_path);
                let store = s3_store(config, bucket)?;

                let list_prefix = if prefix.is_empty() {
                    None
                } else {
                    Some(ObjectPath::from(prefix.trim_end_matches('/')))
                };
                Ok(Self {
                    protocol,
                    store,
                    list_prefix,
                    root_display: bucket.to_string(),
                    file_regex,
                    cache: ByteCache::for_strategy(config.caching_strategy),
                })
            }
        }
    }

    /// List the files to be synced, in ascending last-modified order.
    ///
    /// Entries that are directories, empty, or fail the `file_regex` are not
    /// candidates. With no candidates at all the run cannot proceed; with
    /// candidates that all predate the watermark, a warning is logged and an
    /// empty selection returned.
    pub async fn get_files(
        &self,
        starting_replication_key_value: Option<&str>,
    ) -> Result<Vec<FileInfo>> {
        let listing = self
            .store
            .list_with_delimiter(self.list_prefix.as_ref())
            .await?;

        let mut candidates = Vec::new();
        for meta in listing.objects {
            // Ignore empty files.
            if meta.size == 0 {
                continue;
            }
            let path = format!("{}/{}", self.root_display, meta.location);
            let file = FileInfo {
                path,
                location: meta.location,
                last_modified: meta.last_modified,
            };
            // Ignore files not matching the configured file_regex.
            if let Some(regex) = &self.file_regex {
                if !matches_at_start(regex, file.basename()) {
                    continue;
                }
            }
            candidates.push(file);
        }

        if candidates.is_empty() {
            return Err(Error::NoFilesFound);
        }

        // Sort so the stream stays ordered by replication key. This allows
        // the tap to pick up where it left off if interrupted.
        candidates.sort_by_key(|file| file.last_modified);

        let cutoff = starting_replication_key_value
            .map(parse_replication_value)
            .transpose()?;
        let selected = apply_watermark(candidates, cutoff);
        if selected.is_empty() {
            warn!(
                "Current state precludes files being synced as none have been modified since \
                 state was last updated."
            );
        }
        debug!(count = selected.len(), "Selected files for sync");
        Ok(selected)
    }

    /// Fetch a file's raw bytes, consulting the read cache for remote
    /// protocols.
    pub async fn read(&self, file: &FileInfo) -> Result<Bytes> {
        if self.protocol == Protocol::File {
            return self.fetch(file).await;
        }
        let key = format!("{}:{}", file.path, file.last_modified_iso());
        if let Some(hit) = self.cache.get(&key).await {
            debug!(path = %file.path, "Cache hit");
            return Ok(hit);
        }
        let data = self.fetch(file).await?;
        self.cache.put(&key, &data).await;
        Ok(data)
    }

    async fn fetch(&self, file: &FileInfo) -> Result<Bytes> {
        let result = self.store.get(&file.location).await?;
        Ok(result.bytes().await?)
    }
}

/// Split an `s3://bucket/inner/prefix` URL into bucket and inner prefix.
pub(crate) fn split_bucket_url(url: &str) -> (&str, &str) {
    let without_scheme = url.strip_prefix("s3://").unwrap_or(url);
    match without_scheme.find('/') {
        Some(idx) => (&without_scheme[..idx], &without_scheme[idx + 1..]),
        None => (without_scheme, ""),
    }
}

/// Build an S3 object store for `bucket` with the configured credentials.
pub(crate) fn s3_store(config: &TapConfig, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    if config.s3_anonymous_connection {
        builder = builder.with_skip_signature(true);
    } else if let (Some(key), Some(secret)) =
        (&config.aws_access_key_id, &config.aws_secret_access_key)
    {
        builder = builder
            .with_access_key_id(key)
            .with_secret_access_key(secret);
    }
    let store = builder
        .build()
        .map_err(|e| Error::filesystem(format!("Failed to create S3 client: {e}")))?;
    Ok(Arc::new(store))
}

/// Keep only files at or past the watermark.
fn apply_watermark(files: Vec<FileInfo>, cutoff: Option<DateTime<Utc>>) -> Vec<FileInfo> {
    match cutoff {
        None => files,
        Some(cutoff) => files
            .into_iter()
            .filter(|file| file.last_modified >= cutoff)
            .collect(),
    }
}

/// Match a regex the way file selection expects: anchored at the start of the
/// basename, with the end left open.
fn matches_at_start(regex: &Regex, name: &str) -> bool {
    regex.find(name).map_or(false, |m| m.start() == 0)
}

/// Parse a replication key value or `start_date`.
///
/// Accepts RFC 3339, `%Y-%m-%dT%H:%M:%S%z`, and bare `%Y-%m-%d` dates (read
/// as midnight UTC).
pub fn parse_replication_value(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(Error::state(format!(
        "Could not parse replication key value '{value}' as an ISO-8601 datetime"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manager_for(dir: &std::path::Path, file_regex: Option<&str>) -> FilesystemManager {
        let config = TapConfig {
            protocol: Some(Protocol::File),
            file_path: Some(dir.to_string_lossy().to_string()),
            file_regex: file_regex.map(String::from),
            ..TapConfig::default()
        };
        FilesystemManager::new(&config).unwrap()
    }

    fn file_at(path: &str, timestamp: &str) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            location: ObjectPath::from(path),
            last_modified: DateTime::parse_from_rfc3339(timestamp)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn test_listing_skips_empty_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "col\n1\n").unwrap();
        std::fs::write(dir.path().join("empty.csv"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.csv"), "col\n2\n").unwrap();

        let manager = manager_for(dir.path(), None);
        let files = manager.get_files(None).await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.basename()).collect();
        assert_eq!(names, vec!["a.csv"]);
    }

    #[tokio::test]
    async fn test_listing_applies_file_regex_to_basename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.csv"), "col\n1\n").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "text").unwrap();

        let manager = manager_for(dir.path(), Some(r".*\.csv"));
        let files = manager.get_files(None).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].basename(), "keep.csv");
    }

    #[tokio::test]
    async fn test_no_files_found_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("skip.txt"), "text").unwrap();

        let manager = manager_for(dir.path(), Some(r".*\.csv"));
        let err = manager.get_files(None).await.unwrap_err();
        assert!(matches!(err, Error::NoFilesFound));
    }

    #[tokio::test]
    async fn test_read_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "col\n1\n").unwrap();

        let manager = manager_for(dir.path(), None);
        let files = manager.get_files(None).await.unwrap();
        let data = manager.read(&files[0]).await.unwrap();
        assert_eq!(data.as_ref(), b"col\n1\n");
    }

    #[test]
    fn test_apply_watermark_keeps_equal_and_newer() {
        let files = vec![
            file_at("old.csv", "2023-01-01T00:00:00+00:00"),
            file_at("cut.csv", "2023-06-01T00:00:00+00:00"),
            file_at("new.csv", "2023-12-01T00:00:00+00:00"),
        ];
        let cutoff = Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
        let selected = apply_watermark(files, cutoff);
        let names: Vec<&str> = selected.iter().map(|f| f.basename()).collect();
        assert_eq!(names, vec!["cut.csv", "new.csv"]);
    }

    #[test]
    fn test_split_bucket_url() {
        assert_eq!(split_bucket_url("s3://bucket"), ("bucket", ""));
        assert_eq!(
            split_bucket_url("s3://bucket/path/to"),
            ("bucket", "path/to")
        );
        assert_eq!(split_bucket_url("bucket/path"), ("bucket", "path"));
    }

    #[test]
    fn test_parse_replication_value_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            parse_replication_value("2023-01-02T03:04:05+00:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_replication_value("2023-01-02T03:04:05Z").unwrap(),
            expected
        );
        assert_eq!(
            parse_replication_value("2023-01-02").unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()
        );
        assert!(parse_replication_value("not a date").is_err());
    }

    #[test]
    fn test_matches_at_start_is_anchored_left_only() {
        let regex = Regex::new(r"data.*\.csv").unwrap();
        assert!(matches_at_start(&regex, "data-2023.csv"));
        assert!(matches_at_start(&regex, "data-2023.csv.gz"));
        assert!(!matches_at_start(&regex, "old-data.csv"));
    }

    #[test]
    fn test_last_modified_iso_has_numeric_offset() {
        let file = file_at("a.csv", "2023-06-10T04:33:00+00:00");
        assert_eq!(file.last_modified_iso(), "2023-06-10T04:33:00+00:00");
    }
}
