//! State management module
//!
//! Tracks the replication bookmark per stream so subsequent runs only pick
//! up files modified since the last completed sync.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - The Singer bookmarks structure
//! - `StreamBookmark` - One stream's replication key and value
//! - `StateManager` - Shared in-memory state, loadable from `--state`
//!
//! The tap never writes state to disk; it emits STATE messages and leaves
//! persistence to the host.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamBookmark};
