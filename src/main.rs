// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

//! tap-universal-file CLI
//!
//! Singer tap entry point. Messages go to stdout; logs go to stderr so the
//! Singer stream stays parseable.

use clap::Parser;
use tap_universal_file::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    // Initialize logging on stderr, keeping stdout for messages
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut runner = Runner::stdout(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
