//! CLI arguments
//!
//! Singer taps are driven by flags rather than subcommands: `--about` and
//! `--discover` print documents and exit, a bare invocation runs a sync.

use clap::Parser;
use std::path::PathBuf;

/// Singer tap for files in local or S3 storage
#[derive(Parser, Debug)]
#[command(name = "tap-universal-file")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON); repeatable, later files override earlier
    /// ones. The literal `ENV` reads configuration from the environment only.
    #[arg(short, long)]
    pub config: Vec<String>,

    /// Print tap name, version, capabilities, and settings, then exit
    #[arg(long)]
    pub about: bool,

    /// Print the stream catalog and exit
    #[arg(long)]
    pub discover: bool,

    /// Catalog file (JSON) from a previous discovery
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// State file (JSON) from a previous run
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Output format for `--about`
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,
}

/// Output format for `--about`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON document
    Json,
    /// Markdown tables
    Markdown,
}
