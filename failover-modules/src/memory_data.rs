use failover::{DataInterface, LogEntry};
use std::sync::{Arc, Mutex};

/// In-memory implementation of the DataInterface trait.
///
/// The handle is clone-able: one clone moves into the cluster node while
/// others keep observing the store, which is what the integration tests
/// rely on.
#[derive(Clone, Debug, Default)]
pub struct MemoryDataInterface {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryDataInterface {
    pub fn new() -> MemoryDataInterface {
        MemoryDataInterface::default()
    }

    /// Snapshot of the currently stored entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("entries lock is not poisoned").clone()
    }

    pub fn count(&self) -> u64 {
        self.entries.lock().expect("entries lock is not poisoned").len() as u64
    }
}

impl DataInterface for MemoryDataInterface {
    fn get(&self, id: u64) -> Option<LogEntry> {
        let entries = self.entries.lock().expect("entries lock is not poisoned");

        entries.get(id as usize).cloned()
    }

    fn get_latest(&self) -> Option<LogEntry> {
        let entries = self.entries.lock().expect("entries lock is not poisoned");

        entries.last().cloned()
    }

    fn commit_requested(&mut self, entry: LogEntry) -> bool {
        let mut entries = self.entries.lock().expect("entries lock is not poisoned");

        if entry.id != entries.len() as u64 {
            warn!(
                "Data commit refused: id {} (count {})",
                entry.id,
                entries.len()
            );
            return false;
        }

        trace!("Data committed: {}", entry);
        entries.push(entry);
        true
    }

    fn rollback_requested(&mut self, id: u64) {
        let mut entries = self.entries.lock().expect("entries lock is not poisoned");

        info!("Data rolled back to {} (count {})", id, entries.len());
        entries.truncate(id as usize);
    }
}
