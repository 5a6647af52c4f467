//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tally")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Runs voting requests read as JSON lines from stdin")]
pub struct Args {
    /// Configuration file (TOML). Defaults to `tally.toml` when present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides `logging.level`.
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Writes JSON formatted log files.
    #[arg(long)]
    pub json_logs: bool,
}
