//! Memory model of the virtual OS kernel
//!
//! This module provides the core memory abstractions:
//! - [`address`]: Address ↔ index translation ([`AddressCodec`])
//! - [`heap`]: Fixed-capacity allocation arena with self-describing blocks
//! - [`shed`]: Code lines plus a string resource-link map
//! - [`space`]: Per-process memory spaces and the [`Registry`]
//! - [`kv`]: Named-blob persistence over one heap + shed pair
//! - [`scratch`]: Shared, key-prefixed scratch storage
//!
//! # Processes
//!
//! A pid is a logical ownership partition, not a thread. All operations are
//! synchronous and the registry is single-owner; mutation goes through `&mut`.

pub mod address;
pub mod constants;
pub mod errors;
pub mod heap;
pub mod kv;
pub mod scratch;
pub mod shed;
pub mod space;
pub mod value;

/// Process identifier
pub type Pid = u32;

pub use address::AddressCodec;
pub use errors::MemoryError;
pub use heap::{BlockHeader, Cell, Heap};
pub use kv::KeyValueMemoryStore;
pub use scratch::{ScopedScratch, ScratchHandle, ScratchStore};
pub use shed::Shed;
pub use space::{HeapUsage, MemorySpace, Registry, ShedUsage, SpaceState, SpaceUsage, UsageReport};
pub use value::{Address, Value};
