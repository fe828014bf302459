//! Error types for workload replay
//!
//! Memory operations themselves never fail a replay; they degrade and report.
//! Only a malformed script or an exhausted snapshot budget stops it.

use thiserror::Error;

/// Malformed script line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    /// Snapshot history limit exceeded
    #[error("snapshot memory limit exceeded: {current} + {requested} > {limit} bytes")]
    SnapshotLimitExceeded {
        current: usize,
        requested: usize,
        limit: usize,
    },
}
