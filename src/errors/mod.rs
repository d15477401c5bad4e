use std::error::Error;

/// Failure kinds of the cluster node core.
///
/// Only `Config` is fatal; every other kind is recovered locally and
/// either surfaced to the client or folded into a state transition.
#[derive(Clone, Debug, Eq, PartialEq, Display)]
pub enum RaftError {
    /// Invalid node or cluster configuration. Aborts construction.
    #[display(fmt = "configuration error: {}", _0)]
    Config(String),

    /// A commit was submitted to a node that is not the leader.
    #[display(fmt = "not a leader, current leader: {:?}", _0)]
    NotLeader(Option<u32>),

    /// The leader stepped down before an in-flight commit reached quorum.
    #[display(fmt = "leader stepped down before quorum")]
    QuorumLost,

    /// The data store refused a commit whose id did not match its count.
    #[display(fmt = "commit out of order: entry id {}, store count {}", id, count)]
    InvalidCommitOrder { id: u64, count: u64 },

    /// A request carried a term older than the current one.
    #[display(fmt = "stale term {} (current term {})", request_term, current_term)]
    StaleTerm { request_term: u64, current_term: u64 },

    /// Malformed request or inconsistent log state.
    #[display(fmt = "protocol violation: {}", _0)]
    ProtocolViolation(String),

    /// Transport-level failure. Swallowed by the consensus core, which
    /// treats it as a missing response.
    #[display(fmt = "communication failure: {}", _0)]
    Communication(String),
}

impl Error for RaftError {}
