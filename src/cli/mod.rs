//! Command-line interface
//!
//! Flag parsing and the runner that executes the selected mode:
//!
//! - `--about` prints tap metadata and settings
//! - `--discover` prints the stream catalog
//! - a bare invocation runs a sync

mod commands;
mod runner;

pub use commands::{Cli, OutputFormat};
pub use runner::Runner;
