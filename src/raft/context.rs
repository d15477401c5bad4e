use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crossbeam_channel::{never, Receiver, Sender};

use crate::communication::client::CommitDataResponse;
use crate::communication::peers::{AppendEntriesResponse, PeerRequestHandler, VoteResponse};
use crate::configuration::cluster::ClusterConfig;
use crate::configuration::node::{ClusterNodeOptions, ElectionTimer};
use crate::data::{DataInterface, DataStore, LogEntry};

/// Response from a peer, posted back onto the node event loop by the
/// broadcast workers.
#[derive(Clone, Debug)]
pub(crate) enum PeerReply {
    Vote(VoteResponse),
    AppendEntries {
        peer_id: u32,
        /// Log length the peer matches when the request succeeded.
        match_index: u64,
        response: AppendEntriesResponse,
    },
}

/// Entry staged on the leader, waiting for a quorum of acknowledgements.
pub(crate) struct PendingCommit {
    pub entry: LogEntry,
    pub acks: HashSet<u32>,
    pub completion_tx: Sender<CommitDataResponse>,
}

/// Shared mutable state of the consensus state machine. Owned by the
/// state machine and mutated only from the node event loop.
pub(crate) struct Context<Di, Pc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
{
    pub node_id: u32,
    pub cluster: ClusterConfig,
    pub options: ClusterNodeOptions,

    pub current_term: u64,
    pub voted_for: Option<u32>,
    pub votes_received: HashSet<u32>,
    pub commit_index: u64,
    pub current_leader: Option<u32>,

    pub store: DataStore<Di>,

    /// Staged entries keyed by id; ids are contiguous from `store.count()`.
    pub pending_commits: BTreeMap<u64, PendingCommit>,

    /// Per peer, the length of the log prefix known to be replicated.
    pub next_index: HashMap<u32, u64>,

    pub peer_communicator: Pc,
    pub election_timer: Et,
    pub peer_reply_tx: Sender<PeerReply>,

    /// Armed while the role watches for a leader; `None` disables it.
    pub election_deadline: Option<Instant>,

    /// Ticks while leading; the never-channel otherwise.
    pub heartbeat_rx: Receiver<Instant>,
}

impl<Di, Pc, Et> Context<Di, Pc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
{
    pub fn new(
        node_id: u32,
        cluster: ClusterConfig,
        options: ClusterNodeOptions,
        store: DataStore<Di>,
        peer_communicator: Pc,
        election_timer: Et,
        peer_reply_tx: Sender<PeerReply>,
    ) -> Context<Di, Pc, Et> {
        Context {
            node_id,
            cluster,
            options,
            current_term: 0,
            voted_for: None,
            votes_received: HashSet::new(),
            commit_index: 0,
            current_leader: None,
            store,
            pending_commits: BTreeMap::new(),
            next_index: HashMap::new(),
            peer_communicator,
            election_timer,
            peer_reply_tx,
            election_deadline: None,
            heartbeat_rx: never(),
        }
    }

    pub fn set_current_term(&mut self, term: u64) {
        debug_assert!(term >= self.current_term, "term must never decrease");
        self.current_term = term;
    }

    pub fn reset_election_deadline(&mut self) {
        let timeout = self.election_timer.next_election_timeout();
        self.election_deadline = Some(Instant::now() + timeout);
    }

    pub fn quorum_size(&self) -> u32 {
        self.cluster.quorum_size()
    }

    pub fn peers(&self) -> Vec<u32> {
        self.cluster.peers(self.node_id)
    }

    /// Term of the entry at `id`, looking through both the committed
    /// store and the staged tail. 0 when there is no such entry.
    pub fn entry_term(&self, id: u64) -> u64 {
        if id < self.store.count() {
            return self.store.get(id).map_or(0, |entry| entry.term);
        }
        self.pending_commits
            .get(&id)
            .map_or(0, |pending| pending.entry.term)
    }

    /// Id the next staged entry must carry.
    pub fn next_entry_id(&self) -> u64 {
        self.store.count() + self.pending_commits.len() as u64
    }
}
