//! Command Line Interface.

use crate::consts::DEFAULT_LOGS_DIR;
use clap::Parser;
use std::path::PathBuf;

/// `cut`: continuously displays per-core CPU utilization.
#[derive(Parser, Debug)]
#[clap(about, version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Write log records to stderr instead of a file under `--logs-dir`.
    #[clap(short = 'e', long)]
    pub log_to_stderr: bool,
    /// Directory log files are written to when file logging is enabled.
    #[clap(short = 'd', long, default_value = DEFAULT_LOGS_DIR)]
    pub logs_dir: PathBuf,
}
