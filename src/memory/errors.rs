//! Error types for the memory subsystem
//!
//! Every public memory operation is fail-soft: it returns `None`/`false` and
//! logs the [`MemoryError`] it would have raised. The `try_*` variants hand the
//! error back to callers that want to inspect it.

use super::value::Address;
use super::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// No free run of cells is large enough for the request
    #[error("capacity exceeded: requested {requested} cells, largest free run is {largest_free}")]
    CapacityExceeded { requested: usize, largest_free: usize },

    /// Cell array for a new heap could not be reserved
    #[error("cannot reserve a heap of {capacity} cells")]
    ArenaUnavailable { capacity: usize },

    /// Allocation request for zero cells
    #[error("zero-sized allocation")]
    ZeroSizedAlloc,

    /// Address does not decode to a cell of this heap
    #[error("invalid address {0}")]
    InvalidAddress(Address),

    /// `free` called on something that is not a live block of the given size
    #[error("double free or size mismatch at {address}: expected {expected} cells, found {found:?}")]
    DoubleFreeOrSizeMismatch {
        address: Address,
        expected: usize,
        found: Option<usize>,
    },

    /// Operation on a pid (or arena id) that has no memory space
    #[error("no memory space for pid {0}")]
    MissingSpace(Pid),

    /// Key has no stored blob
    #[error("key '{0}' not found")]
    MissingKey(String),

    /// Stored blob could not be encoded or decoded as JSON
    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
