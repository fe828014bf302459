//! # Introduction
//!
//! vos-memory is the virtual memory subsystem of a simulated OS kernel. Every
//! process owns a memory space of fixed-capacity heaps and small scalar sheds,
//! managed by hand with alloc/free, and stateful programs (editor buffers,
//! terminal history and scrollback) persist their state through a key/value
//! layer built on top.
//!
//! ## Layers
//!
//! ```text
//! AddressCodec → Heap / Shed → MemorySpace Registry → KeyValueMemoryStore
//! ```
//!
//! 1. [`memory`] — addresses, heaps, sheds, the per-process
//!    [`memory::Registry`], the [`memory::KeyValueMemoryStore`] view and the
//!    shared [`memory::ScratchHandle`].
//! 2. [`replay`] — a line-oriented workload script and the engine that
//!    replays it against a registry.
//! 3. [`snapshot`] — bounded history of usage reports taken during a replay.
//! 4. [`config`] — command-line options of the `vosmem` binary.
//!
//! ## Failure model
//!
//! Memory operations never panic and never unwind: they return `None`/`false`
//! and log through [`tracing`]. Callers degrade, typically by keeping state in
//! memory only.

pub mod config;
pub mod memory;
pub mod replay;
pub mod snapshot;
