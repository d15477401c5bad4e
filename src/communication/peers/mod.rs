use crossbeam_channel::{Receiver, Sender};

use crate::data::LogEntry;
use crate::errors::RaftError;

/// Leadership election vote request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Display)]
#[display(
    fmt = "Term {} Candidate {}, Last log: term {} index {}",
    term,
    candidate_id,
    last_log_term,
    last_log_index
)]
pub struct VoteRequest {
    /// Candidate's election term.
    pub term: u64,

    /// Node requesting the vote.
    pub candidate_id: u32,

    /// Length of the candidate's log. Can affect the vote decision.
    pub last_log_index: u64,

    /// Term of the candidate's last log entry. Can affect the vote
    /// decision.
    pub last_log_term: u64,
}

/// The response to a leadership election vote request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Display)]
#[display(fmt = "Term {} Peer {} Vote granted - {}", term, peer_id, vote_granted)]
pub struct VoteResponse {
    /// Current term of the responder, for the candidate to update itself.
    pub term: u64,

    /// Vote decision.
    pub vote_granted: bool,

    /// Response origin.
    pub peer_id: u32,
}

/// Log replication request. An empty `entries` is a heartbeat.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Display)]
#[display(
    fmt = "Term {} Leader {}, Prev log: index {} term {}, Leader commit {}. Entries - {}",
    term,
    leader_id,
    prev_log_index,
    prev_log_term,
    leader_commit,
    "entries.len()"
)]
pub struct AppendEntriesRequest {
    /// Leader's current term.
    pub term: u64,

    /// Current leader id, so followers can redirect clients.
    pub leader_id: u32,

    /// Id of the first entry of the batch, equal to the count of entries
    /// preceding it.
    pub prev_log_index: u64,

    /// Term of the entry immediately before the batch, 0 when there is
    /// none.
    pub prev_log_term: u64,

    /// Entries to replicate. Empty for a heartbeat.
    pub entries: Vec<LogEntry>,

    /// Leader's commit index, advancing the follower's.
    pub leader_commit: u64,
}

/// Log replication or heartbeat result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Display)]
#[display(fmt = "Term {} Success - {}", term, success)]
pub struct AppendEntriesResponse {
    /// Current term of the follower. Can convert the sender to follower.
    pub term: u64,

    /// Whether the follower's log matched and the entries were stored.
    pub success: bool,
}

/// API abstraction for the communication with peers.
pub trait PeerRequestHandler: Send + Sync + 'static + Clone {
    /// Sends a vote request to a peer and awaits the vote response.
    fn send_vote_request(
        &self,
        destination_node_id: u32,
        request: VoteRequest,
    ) -> Result<VoteResponse, RaftError>;

    /// Sends a log replication or heartbeat request to a peer and awaits
    /// the response.
    fn send_append_entries_request(
        &self,
        destination_node_id: u32,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError>;
}

/// Abstraction over the serving side channels of the peer endpoints.
pub trait PeerRequestChannels {
    /// Receiver channel for vote requests addressed to `node_id`.
    fn vote_request_rx(&self, node_id: u32) -> Receiver<VoteRequest>;

    /// Sender channel for vote responses of `node_id`.
    fn vote_response_tx(&self, node_id: u32) -> Sender<VoteResponse>;

    /// Receiver channel for replication and heartbeat requests addressed
    /// to `node_id`.
    fn append_entries_request_rx(&self, node_id: u32) -> Receiver<AppendEntriesRequest>;

    /// Sender channel for replication and heartbeat responses of
    /// `node_id`.
    fn append_entries_response_tx(&self, node_id: u32) -> Sender<AppendEntriesResponse>;
}
