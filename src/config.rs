//! Command-line configuration for the `vosmem` replay tool

use crate::memory::constants::DEFAULT_SCRATCH_CAPACITY;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Default snapshot history budget (64 MB)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 64 * 1024 * 1024;

/// Replay a memory workload script and report heap/shed usage
#[derive(Debug, Clone, Parser)]
#[command(name = "vosmem")]
#[command(author, version, about, long_about = None)]
pub struct ReplayConfig {
    /// Workload script to replay
    pub script: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print the usage report after every step
    #[arg(long)]
    pub history: bool,

    /// Print the final usage report as JSON
    #[arg(long)]
    pub json: bool,

    /// Snapshot history budget in bytes
    #[arg(long, default_value_t = DEFAULT_SNAPSHOT_LIMIT)]
    pub snapshot_limit: usize,

    /// Cells in the shared scratch heap
    #[arg(long, default_value_t = DEFAULT_SCRATCH_CAPACITY)]
    pub scratch_capacity: usize,
}

impl ReplayConfig {
    /// Config for `script` with every option at its default
    pub fn for_script(script: impl Into<PathBuf>) -> Self {
        ReplayConfig {
            script: script.into(),
            verbose: 0,
            history: false,
            json: false,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }

    /// Tracing filter directive for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
