use crate::data::{DataInterface, LogEntry};
use crate::errors::RaftError;

/// Proxy in front of the application `DataInterface`.
///
/// Mirrors the entry count so appends stay strictly monotone and
/// rollbacks stay within bounds, whatever the application does. The
/// count only moves forward through `commit` and backward through
/// `rollback`.
pub(crate) struct DataStore<D> {
    data: D,
    count: u64,
}

impl<D: DataInterface> DataStore<D> {
    /// Wraps a data store, recovering the entry count from its latest
    /// entry so a pre-populated store keeps its history.
    pub fn new(data: D) -> DataStore<D> {
        let count = data.get_latest().map_or(0, |entry| entry.id + 1);
        DataStore { data, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn get(&self, id: u64) -> Option<LogEntry> {
        if id >= self.count {
            return None;
        }
        self.data.get(id)
    }

    /// Term of the last entry, 0 for an empty store.
    pub fn last_term(&self) -> u64 {
        self.data.get_latest().map_or(0, |entry| entry.term)
    }

    pub fn commit(&mut self, entry: LogEntry) -> Result<(), RaftError> {
        let id = entry.id;
        if !self.data.commit_requested(entry) {
            return Err(RaftError::InvalidCommitOrder {
                id,
                count: self.count,
            });
        }
        self.count += 1;
        Ok(())
    }

    pub fn rollback(&mut self, id: u64) -> Result<(), RaftError> {
        if id > self.count {
            return Err(RaftError::ProtocolViolation(format!(
                "rollback to {} past the end of the log ({})",
                id, self.count
            )));
        }
        self.data.rollback_requested(id);
        self.count = id;
        Ok(())
    }
}
