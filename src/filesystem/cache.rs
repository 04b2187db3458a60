//! Read caching for remote file contents
//!
//! Discovery and sync each read every selected file, so a remote run without
//! caching fetches everything twice. The `once` strategy holds fetched bytes
//! for the lifetime of the invocation; `persistent` spills them to the OS
//! temp directory keyed by path and modification time so later invocations
//! can reuse them.

use crate::config::CachingStrategy;
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::warn;

static CACHE_DIR: Lazy<PathBuf> =
    Lazy::new(|| std::env::temp_dir().join("tap-universal-file-cache"));

/// Byte cache for fetched file contents
#[derive(Debug)]
pub(crate) enum ByteCache {
    /// No caching, every read fetches
    Disabled,
    /// In-memory cache scoped to one invocation
    Invocation(RwLock<HashMap<String, Bytes>>),
    /// On-disk cache in the OS temp directory, reused across invocations
    Persistent(PathBuf),
}

impl ByteCache {
    pub(crate) fn for_strategy(strategy: CachingStrategy) -> Self {
        match strategy {
            CachingStrategy::None => Self::Disabled,
            CachingStrategy::Once => Self::Invocation(RwLock::new(HashMap::new())),
            CachingStrategy::Persistent => Self::Persistent(CACHE_DIR.clone()),
        }
    }

    pub(crate) async fn get(&self, key: &str) -> Option<Bytes> {
        match self {
            Self::Disabled => None,
            Self::Invocation(entries) => entries.read().await.get(key).cloned(),
            Self::Persistent(dir) => match tokio::fs::read(dir.join(entry_name(key))).await {
                Ok(data) => Some(Bytes::from(data)),
                Err(_) => None,
            },
        }
    }

    /// Cache hits are advisory; a failed write logs and moves on so a full
    /// temp partition cannot fail a sync.
    pub(crate) async fn put(&self, key: &str, data: &Bytes) {
        match self {
            Self::Disabled => {}
            Self::Invocation(entries) => {
                entries.write().await.insert(key.to_string(), data.clone());
            }
            Self::Persistent(dir) => {
                if let Err(e) = tokio::fs::create_dir_all(dir).await {
                    warn!(error = %e, "Failed to create cache directory");
                    return;
                }
                let path = dir.join(entry_name(key));
                if let Err(e) = tokio::fs::write(&path, data).await {
                    warn!(error = %e, path = %path.display(), "Failed to write cache entry");
                }
            }
        }
    }
}

fn entry_name(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}.bin", hasher.finish())
}
