//! Memory spaces and the per-process registry
//!
//! - [`MemorySpace`]: the heaps and sheds owned by one pid
//! - [`Registry`]: pid → memory space, whole-space lifecycle, diagnostics
//! - [`UsageReport`]: the result of [`Registry::check_memory`]
//!
//! # Lifecycle
//!
//! ```text
//! Unallocated --allocate_memory--> Allocated --free_memory--> Freed
//!                                      ^                        |
//!                                      +----allocate_memory-----+   (brand-new space)
//! ```
//!
//! Every operation on a pid without a space fails soft (`None`/`false`):
//! process teardown calls `free_memory` speculatively and may race with UI code
//! that still holds the pid.

use super::constants::{FREED_HISTORY_LIMIT, SKIP_SLOT};
use super::errors::{MemoryError, Result};
use super::heap::Heap;
use super::kv::KeyValueMemoryStore;
use super::shed::Shed;
use super::Pid;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

/// Heaps and sheds owned by one process
#[derive(Debug, Clone)]
pub struct MemorySpace {
    pub pid: Pid,
    heaps: FxHashMap<i32, Heap>,
    sheds: FxHashMap<i32, Shed>,
}

impl MemorySpace {
    pub fn new(pid: Pid) -> Self {
        MemorySpace {
            pid,
            heaps: FxHashMap::default(),
            sheds: FxHashMap::default(),
        }
    }

    pub fn heap(&self, id: i32) -> Option<&Heap> {
        self.heaps.get(&id)
    }

    pub fn heap_mut(&mut self, id: i32) -> Option<&mut Heap> {
        self.heaps.get_mut(&id)
    }

    pub fn shed(&self, id: i32) -> Option<&Shed> {
        self.sheds.get(&id)
    }

    pub fn shed_mut(&mut self, id: i32) -> Option<&mut Shed> {
        self.sheds.get_mut(&id)
    }

    /// Key/value view over one of this space's heap + shed pairs
    pub fn store(&mut self, heap_id: i32, shed_id: i32) -> Option<KeyValueMemoryStore<'_>> {
        let heap = self.heaps.get_mut(&heap_id)?;
        let shed = self.sheds.get_mut(&shed_id)?;
        Some(KeyValueMemoryStore::new(heap, shed))
    }

    pub fn heap_count(&self) -> usize {
        self.heaps.len()
    }

    pub fn shed_count(&self) -> usize {
        self.sheds.len()
    }

    fn usage(&self, program_name: Option<&str>) -> SpaceUsage {
        let mut heaps: Vec<_> = self
            .heaps
            .iter()
            .map(|(id, heap)| HeapUsage::of(*id, heap))
            .collect();
        heaps.sort_by_key(|h| h.id);

        let mut sheds: Vec<_> = self
            .sheds
            .iter()
            .map(|(id, shed)| ShedUsage::of(*id, shed))
            .collect();
        sheds.sort_by_key(|s| s.id);

        SpaceUsage {
            pid: self.pid,
            program_name: program_name.map(str::to_string),
            heaps,
            sheds,
        }
    }
}

/// Lifecycle state of a pid's memory space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceState {
    Unallocated,
    Allocated,
    Freed,
}

/// Maps every pid to its memory space
#[derive(Debug, Clone, Default)]
pub struct Registry {
    spaces: FxHashMap<Pid, MemorySpace>,
    program_names: FxHashMap<Pid, String>,
    // bounded by FREED_HISTORY_LIMIT, oldest first in `freed_order`
    freed: FxHashSet<Pid>,
    freed_order: VecDeque<Pid>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Create or replace arenas for `pid`.
    ///
    /// A negative `heap_id` or `shed_id` (see [`SKIP_SLOT`]) skips that kind of
    /// arena. The heap gets `size` cells; sheds have no capacity. The space is
    /// created on first use; a pid that was freed starts over with a new space.
    /// A heap whose cells cannot be reserved is skipped with a warning, and any
    /// existing heap under `heap_id` is kept.
    pub fn allocate_memory(&mut self, heap_id: i32, shed_id: i32, size: usize, pid: Pid) {
        let wants_heap = heap_id > SKIP_SLOT;
        let wants_shed = shed_id > SKIP_SLOT;
        if !wants_heap && !wants_shed {
            debug!(pid, "allocate_memory with nothing to allocate");
            return;
        }

        let heap = if wants_heap {
            match Heap::try_new(size) {
                Ok(heap) => Some(heap),
                Err(e) => {
                    warn!(pid, heap_id, "heap skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };
        if heap.is_none() && !wants_shed {
            return;
        }

        let space = self.spaces.entry(pid).or_insert_with(|| {
            info!(pid, "memory space created");
            MemorySpace::new(pid)
        });
        if self.freed.remove(&pid) {
            self.freed_order.retain(|&p| p != pid);
        }

        if let Some(heap) = heap {
            if space.heaps.insert(heap_id, heap).is_some() {
                debug!(pid, heap_id, "heap replaced");
            }
            debug!(pid, heap_id, size, "heap allocated");
        }
        if wants_shed {
            if space.sheds.insert(shed_id, Shed::new()).is_some() {
                debug!(pid, shed_id, "shed replaced");
            }
            debug!(pid, shed_id, "shed allocated");
        }
    }

    /// Attach a program name to `pid`. Repeated calls just relabel.
    pub fn register_program_name(&mut self, pid: Pid, name: &str) {
        if self.program_names.get(&pid).map(String::as_str) != Some(name) {
            debug!(pid, name, "program name registered");
            self.program_names.insert(pid, name.to_string());
        }
    }

    pub fn program_name(&self, pid: Pid) -> Option<&str> {
        self.program_names.get(&pid).map(String::as_str)
    }

    /// Destroy `pid`'s whole memory space. Returns `false` if it had none.
    pub fn free_memory(&mut self, pid: Pid) -> bool {
        self.program_names.remove(&pid);
        match self.spaces.remove(&pid) {
            Some(space) => {
                info!(
                    pid,
                    heaps = space.heap_count(),
                    sheds = space.shed_count(),
                    "memory space freed"
                );
                self.remember_freed(pid);
                true
            }
            None => {
                debug!(pid, "free_memory on pid without space");
                false
            }
        }
    }

    /// Usage of one pid's space, or of every space when `pid` is `None`.
    /// An unknown pid yields an empty report.
    pub fn check_memory(&self, pid: Option<Pid>) -> UsageReport {
        let mut spaces: Vec<SpaceUsage> = match pid {
            Some(pid) => self
                .spaces
                .get(&pid)
                .map(|space| space.usage(self.program_name(pid)))
                .into_iter()
                .collect(),
            None => self
                .spaces
                .values()
                .map(|space| space.usage(self.program_name(space.pid)))
                .collect(),
        };
        spaces.sort_by_key(|s| s.pid);
        UsageReport { spaces }
    }

    pub fn state(&self, pid: Pid) -> SpaceState {
        if self.spaces.contains_key(&pid) {
            SpaceState::Allocated
        } else if self.freed.contains(&pid) {
            SpaceState::Freed
        } else {
            SpaceState::Unallocated
        }
    }

    pub fn has_space(&self, pid: Pid) -> bool {
        self.spaces.contains_key(&pid)
    }

    pub fn get_space(&self, pid: Pid) -> Option<&MemorySpace> {
        self.spaces.get(&pid)
    }

    pub fn get_space_mut(&mut self, pid: Pid) -> Option<&mut MemorySpace> {
        self.spaces.get_mut(&pid)
    }

    pub fn try_space_mut(&mut self, pid: Pid) -> Result<&mut MemorySpace> {
        self.spaces
            .get_mut(&pid)
            .ok_or(MemoryError::MissingSpace(pid))
    }

    pub fn heap(&self, pid: Pid, heap_id: i32) -> Option<&Heap> {
        self.get_space(pid)?.heap(heap_id)
    }

    pub fn heap_mut(&mut self, pid: Pid, heap_id: i32) -> Option<&mut Heap> {
        self.get_space_mut(pid)?.heap_mut(heap_id)
    }

    pub fn shed(&self, pid: Pid, shed_id: i32) -> Option<&Shed> {
        self.get_space(pid)?.shed(shed_id)
    }

    pub fn shed_mut(&mut self, pid: Pid, shed_id: i32) -> Option<&mut Shed> {
        self.get_space_mut(pid)?.shed_mut(shed_id)
    }

    /// Key/value view over `pid`'s heap + shed pair
    pub fn store(&mut self, pid: Pid, heap_id: i32, shed_id: i32) -> Option<KeyValueMemoryStore<'_>> {
        self.get_space_mut(pid)?.store(heap_id, shed_id)
    }

    fn remember_freed(&mut self, pid: Pid) {
        if !self.freed.insert(pid) {
            return;
        }
        self.freed_order.push_back(pid);
        if self.freed_order.len() > FREED_HISTORY_LIMIT {
            if let Some(oldest) = self.freed_order.pop_front() {
                self.freed.remove(&oldest);
            }
        }
    }

    /// Pids with a live space, ascending
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<_> = self.spaces.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

/// Usage of one heap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapUsage {
    pub id: i32,
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
    pub blocks: usize,
    pub largest_free: usize,
}

impl HeapUsage {
    pub fn of(id: i32, heap: &Heap) -> Self {
        HeapUsage {
            id,
            capacity: heap.capacity(),
            used: heap.used_cells(),
            free: heap.free_cells(),
            blocks: heap.block_count(),
            largest_free: heap.largest_free_run(),
        }
    }
}

/// Usage of one shed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShedUsage {
    pub id: i32,
    pub code_lines: usize,
    pub resource_links: usize,
}

impl ShedUsage {
    pub fn of(id: i32, shed: &Shed) -> Self {
        ShedUsage {
            id,
            code_lines: shed.code_len(),
            resource_links: shed.resource_link_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceUsage {
    pub pid: Pid,
    pub program_name: Option<String>,
    pub heaps: Vec<HeapUsage>,
    pub sheds: Vec<ShedUsage>,
}

/// Diagnostics snapshot; nothing in the subsystem depends on its contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub spaces: Vec<SpaceUsage>,
}

impl UsageReport {
    pub fn space(&self, pid: Pid) -> Option<&SpaceUsage> {
        self.spaces.iter().find(|s| s.pid == pid)
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn total_used_cells(&self) -> usize {
        self.spaces
            .iter()
            .flat_map(|s| &s.heaps)
            .map(|h| h.used)
            .sum()
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spaces.is_empty() {
            return writeln!(f, "(no memory spaces)");
        }
        for space in &self.spaces {
            match &space.program_name {
                Some(name) => writeln!(f, "pid {} ({})", space.pid, name)?,
                None => writeln!(f, "pid {}", space.pid)?,
            }
            for heap in &space.heaps {
                writeln!(
                    f,
                    "  heap {:>3}: {:>6} cells | {:>6} used | {:>6} free | {} block{} | largest free run {}",
                    heap.id,
                    heap.capacity,
                    heap.used,
                    heap.free,
                    heap.blocks,
                    if heap.blocks == 1 { "" } else { "s" },
                    heap.largest_free
                )?;
            }
            for shed in &space.sheds {
                writeln!(
                    f,
                    "  shed {:>3}: {} code line{} | {} resource link{}",
                    shed.id,
                    shed.code_lines,
                    if shed.code_lines == 1 { "" } else { "s" },
                    shed.resource_links,
                    if shed.resource_links == 1 { "" } else { "s" },
                )?;
            }
        }
        Ok(())
    }
}
