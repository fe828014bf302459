// Snapshot history of a workload replay

use crate::memory::UsageReport;
use crate::replay::errors::ReplayError;

/// Registry usage recorded after one replayed command
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step: usize,
    pub line: usize, // Script line of the command
    pub command: String,
    pub output: String,
    pub report: UsageReport,
}

impl Snapshot {
    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // This is a rough estimate
        // Text: the command and its output
        let text_size = self.command.len() + self.output.len();

        // Report: assume 64 bytes per heap/shed line plus 32 per space
        let report_size: usize = self
            .report
            .spaces
            .iter()
            .map(|s| 32 + 64 * (s.heaps.len() + s.sheds.len()))
            .sum();

        std::mem::size_of::<Self>() + text_size + report_size
    }
}

/// Bounded history of snapshots
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), ReplayError> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(ReplayError::SnapshotLimitExceeded {
                current: self.current_memory,
                requested: snapshot_size,
                limit: self.max_memory,
            });
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(step: usize) -> Snapshot {
        Snapshot {
            step,
            line: step + 1,
            command: "check".to_string(),
            output: "(no memory spaces)".to_string(),
            report: UsageReport::default(),
        }
    }

    #[test]
    fn test_push_within_limit() {
        let mut history = SnapshotManager::new(1024 * 1024);
        history.push(snapshot(0)).unwrap();
        history.push(snapshot(1)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().map(|s| s.step), Some(1));
        assert!(history.memory_usage() <= history.memory_limit());
    }

    #[test]
    fn test_push_over_limit() {
        let one = snapshot(0).estimated_size();
        let mut history = SnapshotManager::new(one + one / 2);
        history.push(snapshot(0)).unwrap();
        assert!(matches!(
            history.push(snapshot(1)),
            Err(ReplayError::SnapshotLimitExceeded { .. })
        ));
        assert_eq!(history.len(), 1);
    }
}
