//! Filesystem access
//!
//! One manager wraps whichever object store the `protocol` setting selects
//! (a local directory or an S3 bucket) and handles listing, candidate
//! filtering, watermark cuts, byte reads, and read caching.

mod cache;
mod manager;

pub use manager::{parse_replication_value, FileInfo, FilesystemManager};

pub(crate) use manager::{s3_store, split_bucket_url};
