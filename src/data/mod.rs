mod store;

pub(crate) use store::DataStore;

use std::sync::Arc;

/// Single replicated log entry. Immutable once committed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Display)]
#[display(fmt = "Entry id {} term {} ({} bytes)", id, term, "payload.len()")]
pub struct LogEntry {
    /// Zero-based position in the log. Present ids are contiguous.
    pub id: u64,

    /// Election term the entry was created in.
    pub term: u64,

    /// Opaque application payload.
    pub payload: Arc<[u8]>,
}

/// Application-supplied data store.
///
/// Every call happens on the owning node's event loop thread, so
/// implementations need no internal locking.
pub trait DataInterface: Send + 'static {
    /// Returns the entry at `id`, or `None` when `id` is past the end.
    fn get(&self, id: u64) -> Option<LogEntry>;

    /// Returns the most recently committed entry.
    fn get_latest(&self) -> Option<LogEntry>;

    /// Proposed append. Must succeed exactly when `entry.id` equals the
    /// current entry count; on success the count advances by one.
    fn commit_requested(&mut self, entry: LogEntry) -> bool;

    /// Truncates the store to length `id`, discarding divergent entries.
    fn rollback_requested(&mut self, id: u64);
}
