use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::data::LogEntry;
use crate::errors::RaftError;

/// Client RPC request proposing a new data entry.
///
/// `completion_tx` is the one-shot completion sink of the request: the
/// leader resolves it once quorum is reached or the commit fails.
#[derive(Clone, Display)]
#[display(fmt = "Commit request id {} ({} bytes)", id, "payload.len()")]
pub struct CommitDataRequest {
    /// Proposed entry id. Must equal the current log count.
    pub id: u64,

    /// Opaque data to replicate.
    pub payload: Arc<[u8]>,

    pub completion_tx: Sender<CommitDataResponse>,
}

/// The outcome of a commit_data request.
#[derive(Clone, Debug, Eq, PartialEq, Display)]
#[display(
    fmt = "Commit response result {} current_leader {:?}",
    result,
    current_leader
)]
pub struct CommitDataResponse {
    /// Whether the entry reached quorum and was committed.
    pub result: bool,

    /// The committed entry on success.
    pub entry: Option<LogEntry>,

    /// Current leader hint. Empty when no leader is known.
    pub current_leader: Option<u32>,
}

/// API abstraction for the communication with clients.
pub trait ClientRequestHandler: Clone + Send + Sync + 'static {
    /// Proposes a new data entry and blocks until it is committed or
    /// refused.
    fn commit_data(&self, id: u64, payload: Arc<[u8]>) -> Result<CommitDataResponse, RaftError>;
}

/// Abstraction over the serving side channel of the client endpoint.
pub trait ClientRequestChannels: Send + Clone + 'static {
    /// Receiver channel for commit_data requests.
    fn commit_data_request_rx(&self) -> Receiver<CommitDataRequest>;
}
