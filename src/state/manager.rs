//! State manager implementation
//!
//! Shared handle over the current replication state. Sync tasks advance
//! bookmarks through it and serialize snapshots into STATE messages.

use super::types::State;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State manager holding the current bookmarks
#[derive(Debug)]
pub struct StateManager {
    /// Current state
    state: Arc<RwLock<State>>,
    /// Whether state was supplied by the host
    provided: bool,
}

impl StateManager {
    /// Create an empty in-memory state manager
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::new())),
            provided: false,
        }
    }

    /// Create a state manager from a `--state` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::state(format!("Failed to read state file {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Create a state manager from inline JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let state: State = serde_json::from_str(json)
            .map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))?;

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            provided: true,
        })
    }

    /// Whether the host passed state into this run
    pub fn was_provided(&self) -> bool {
        self.provided
    }

    /// Whether any bookmark exists for the stream
    pub async fn has_bookmark(&self, stream: &str) -> bool {
        let state = self.state.read().await;
        state.get_bookmark(stream).is_some()
    }

    /// Get the replication key value for a stream
    pub async fn get_replication_key_value(&self, stream: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .get_replication_key_value(stream)
            .map(ToString::to_string)
    }

    /// Advance a stream's bookmark
    pub async fn set_bookmark(&self, stream: &str, replication_key: &str, value: String) {
        let mut state = self.state.write().await;
        state.set_bookmark(stream, replication_key, value);
    }

    /// Snapshot the current state as the payload of a STATE message
    pub async fn to_value(&self) -> Result<JsonValue> {
        let state = self.state.read().await;
        serde_json::to_value(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            provided: self.provided,
        }
    }
}
