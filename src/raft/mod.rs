pub(crate) mod context;
pub(crate) mod fsm;


/// Consensus role of a cluster node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RaftRole {
    /// Initial role before the cluster node is started.
    Standby,
    Follower,
    Candidate,
    Leader,
}

/// Events driving the consensus state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RaftEvent {
    /// The cluster node was started.
    Started,

    /// The election timer expired without hearing from a leader.
    Timedout,

    /// A valid leader of the given (current or newer) term was observed.
    LeaderDiscovered { term: u64 },

    /// A peer granted its vote for the current candidacy.
    VoteReceived { from: u32 },

    /// The candidacy gathered a quorum of votes.
    Elected,

    /// The cluster node was shut down.
    Terminated,
}

/// Admissible role transitions. An event absent for a role leaves the
/// role unchanged and is not handled.
pub(crate) fn next_role(role: RaftRole, event: &RaftEvent) -> Option<RaftRole> {
    use RaftEvent::*;
    use RaftRole::*;

    match (role, event) {
        (Standby, Started) => Some(Follower),

        (Follower, Timedout) => Some(Candidate),
        (Follower, LeaderDiscovered { .. }) => Some(Follower),
        (Follower, Terminated) => Some(Standby),

        (Candidate, Timedout) => Some(Candidate),
        (Candidate, LeaderDiscovered { .. }) => Some(Follower),
        (Candidate, VoteReceived { .. }) => Some(Candidate),
        (Candidate, Elected) => Some(Leader),
        (Candidate, Terminated) => Some(Standby),

        (Leader, LeaderDiscovered { .. }) => Some(Follower),
        (Leader, Terminated) => Some(Standby),

        _ => None,
    }
}
