//! State types for tracking sync progress
//!
//! These types carry the Singer bookmarks shape exchanged with the host:
//! `{"bookmarks": {"<stream>": {"replication_key": ...,
//! "replication_key_value": ...}}}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete replication state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: HashMap<String, StreamBookmark>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&StreamBookmark> {
        self.bookmarks.get(stream)
    }

    /// Get the mutable bookmark for a stream, creating if needed
    pub fn get_bookmark_mut(&mut self, stream: &str) -> &mut StreamBookmark {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Get the replication key value for a stream
    pub fn get_replication_key_value(&self, stream: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.replication_key_value.as_deref()
    }

    /// Advance a stream's bookmark
    pub fn set_bookmark(&mut self, stream: &str, replication_key: &str, value: String) {
        let bookmark = self.get_bookmark_mut(stream);
        bookmark.replication_key = Some(replication_key.to_string());
        bookmark.replication_key_value = Some(value);
    }
}

/// Bookmark for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBookmark {
    /// Property the stream is bookmarked on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest replication key value seen in a completed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,
}

impl StreamBookmark {
    /// Create a new empty bookmark
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
    }

    #[test]
    fn test_state_bookmark() {
        let mut state = State::new();
        assert!(state.get_replication_key_value("file").is_none());

        state.set_bookmark("file", "_sdc_last_modified", "2023-06-10T04:33:00+00:00".to_string());
        assert_eq!(
            state.get_replication_key_value("file"),
            Some("2023-06-10T04:33:00+00:00")
        );
        assert_eq!(
            state.get_bookmark("file").unwrap().replication_key.as_deref(),
            Some("_sdc_last_modified")
        );
    }

    #[test]
    fn test_state_serialization() {
        let mut state = State::new();
        state.set_bookmark("file", "_sdc_last_modified", "2023-01-01T00:00:00+00:00".to_string());

        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert!(json.contains("\"bookmarks\""));
        assert!(json.contains("\"replication_key_value\""));
    }

    #[test]
    fn test_state_tolerates_unknown_fields() {
        let raw = r#"{
            "bookmarks": {
                "file": {
                    "replication_key": "_sdc_last_modified",
                    "replication_key_value": "2023-01-01T00:00:00+00:00",
                    "version": 1
                }
            },
            "currently_syncing": null
        }"#;
        let state: State = serde_json::from_str(raw).unwrap();
        assert_eq!(
            state.get_replication_key_value("file"),
            Some("2023-01-01T00:00:00+00:00")
        );
    }
}
