//! Workload replay
//!
//! Drives the memory subsystem from a small line-oriented script, the way the
//! editor and terminal programs drive it at runtime:
//! - [`parse`]: script → [`Statement`]s
//! - [`engine`]: executes statements against a [`Registry`](crate::memory::Registry)
//!   and a shared scratch store, snapshotting usage after every step
//! - [`errors`]: parse and replay errors

pub mod engine;
pub mod errors;
pub mod parse;

pub use engine::Replayer;
pub use errors::{ParseError, ReplayError};
pub use parse::{parse_script, Command, Statement};
