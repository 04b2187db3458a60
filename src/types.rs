//! Common types used throughout tap-universal-file
//!
//! This module contains shared type definitions and type aliases
//! used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Error Handling Strategy
// ============================================================================

/// Strategy for handling malformed records during sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Stop on the first malformed record
    #[default]
    Fail,
    /// Pass malformed records through (or skip unparseable ones), continue
    Ignore,
}

// ============================================================================
// Replication Method
// ============================================================================

/// How a stream replicates on subsequent runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Re-read everything every run
    FullTable,
    /// Only read files at or past the bookmark
    #[default]
    Incremental,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_handling_serde() {
        let handling: ErrorHandling = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(handling, ErrorHandling::Ignore);

        let json = serde_json::to_string(&ErrorHandling::Fail).unwrap();
        assert_eq!(json, "\"fail\"");
    }

    #[test]
    fn test_error_handling_default() {
        assert_eq!(ErrorHandling::default(), ErrorHandling::Fail);
    }

    #[test]
    fn test_replication_method_serde() {
        let json = serde_json::to_string(&ReplicationMethod::Incremental).unwrap();
        assert_eq!(json, "\"INCREMENTAL\"");

        let json = serde_json::to_string(&ReplicationMethod::FullTable).unwrap();
        assert_eq!(json, "\"FULL_TABLE\"");
    }
}
