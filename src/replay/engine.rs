//! Replay engine: applies parsed commands to a registry and a scratch store
//!
//! Each command produces one line of output and a [`Snapshot`] of the
//! registry's usage. Memory failures never abort a replay; they show up in
//! the output the same way a UI would see them, as a missing value.

use super::errors::ReplayError;
use super::parse::{Command, Statement};
use crate::config::ReplayConfig;
use crate::memory::constants::SKIP_SLOT;
use crate::memory::{Registry, ScratchHandle};
use crate::snapshot::{Snapshot, SnapshotManager};
use tracing::{debug, info};

pub struct Replayer {
    registry: Registry,
    scratch: ScratchHandle,
    snapshots: SnapshotManager,
}

impl Replayer {
    pub fn new(scratch_capacity: usize, snapshot_limit: usize) -> Self {
        Replayer {
            registry: Registry::new(),
            scratch: ScratchHandle::new(scratch_capacity),
            snapshots: SnapshotManager::new(snapshot_limit),
        }
    }

    pub fn from_config(config: &ReplayConfig) -> Self {
        Self::new(config.scratch_capacity, config.snapshot_limit)
    }

    /// Execute every statement, recording a snapshot after each one
    pub fn run(&mut self, statements: &[Statement]) -> Result<(), ReplayError> {
        info!(statements = statements.len(), "replay started");
        for statement in statements {
            let output = self.execute(&statement.command);
            debug!(line = statement.line, %output, "step");
            self.snapshots.push(Snapshot {
                step: self.snapshots.len(),
                line: statement.line,
                command: statement.source.clone(),
                output,
                report: self.registry.check_memory(None),
            })?;
        }
        info!(steps = self.snapshots.len(), "replay finished");
        Ok(())
    }

    /// Execute one command and describe what happened
    pub fn execute(&mut self, command: &Command) -> String {
        match command {
            Command::Name { pid, program } => {
                self.registry.register_program_name(*pid, program);
                format!("pid {pid}: named '{program}'")
            }
            Command::AllocHeap { pid, heap_id, size } => {
                self.registry.allocate_memory(*heap_id, SKIP_SLOT, *size, *pid);
                format!("pid {pid}: heap {heap_id} allocated ({size} cells)")
            }
            Command::AllocShed { pid, shed_id } => {
                self.registry.allocate_memory(SKIP_SLOT, *shed_id, 0, *pid);
                format!("pid {pid}: shed {shed_id} allocated")
            }
            Command::Free { pid } => {
                if self.registry.free_memory(*pid) {
                    format!("pid {pid}: memory freed")
                } else {
                    format!("pid {pid}: no memory space")
                }
            }
            Command::Write { pid, heap_id, text } => {
                let Some(heap) = self.registry.heap_mut(*pid, *heap_id) else {
                    return format!("pid {pid}: no heap {heap_id}");
                };
                match heap.alloc(text.chars().count() + 1) {
                    Some(addr) => {
                        heap.write_string(addr, text);
                        let read = heap.read_string(addr, text.chars().count() + 1);
                        format!("pid {pid} heap {heap_id}: {addr} = {:?}", read.unwrap_or_default())
                    }
                    None => format!("pid {pid} heap {heap_id}: out of memory"),
                }
            }
            Command::Code { pid, shed_id, line } => match self.registry.shed_mut(*pid, *shed_id) {
                Some(shed) => {
                    shed.write_code(line.as_str());
                    format!("pid {pid} shed {shed_id}: code line {}", shed.code_len() - 1)
                }
                None => format!("pid {pid}: no shed {shed_id}"),
            },
            Command::Link {
                pid,
                shed_id,
                key,
                value,
            } => match self.registry.shed_mut(*pid, *shed_id) {
                Some(shed) => {
                    shed.write_resource_link(key.as_str(), value.as_str());
                    format!("pid {pid} shed {shed_id}: {key} -> {value}")
                }
                None => format!("pid {pid}: no shed {shed_id}"),
            },
            Command::Save {
                pid,
                heap_id,
                shed_id,
                key,
                payload,
            } => match self.registry.store(*pid, *heap_id, *shed_id) {
                Some(mut store) => {
                    if store.save(key, payload) {
                        format!("pid {pid}: saved {key} ({} chars)", payload.chars().count())
                    } else {
                        format!("pid {pid}: save {key} failed")
                    }
                }
                None => format!("pid {pid}: no heap {heap_id} / shed {shed_id}"),
            },
            Command::Load {
                pid,
                heap_id,
                shed_id,
                key,
            } => match self.registry.store(*pid, *heap_id, *shed_id) {
                Some(store) => match store.load(key) {
                    Some(value) => format!("pid {pid}: {key} = {value}"),
                    None => format!("pid {pid}: {key} not found"),
                },
                None => format!("pid {pid}: no heap {heap_id} / shed {shed_id}"),
            },
            Command::ScratchSave {
                component,
                key,
                payload,
            } => {
                if self.scratch.scoped(component).save(key, payload) {
                    format!("scratch {component}: saved {key}")
                } else {
                    format!("scratch {component}: save {key} failed")
                }
            }
            Command::ScratchLoad { component, key } => {
                match self.scratch.scoped(component).load(key) {
                    Some(value) => format!("scratch {component}: {key} = {value}"),
                    None => format!("scratch {component}: {key} not found"),
                }
            }
            Command::Check { pid } => self.registry.check_memory(*pid).to_string(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn scratch(&self) -> &ScratchHandle {
        &self.scratch
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }
}
