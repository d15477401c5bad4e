use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use crossbeam_channel::{never, tick, Receiver, Sender};

use crate::common::peer_requester::{
    broadcast_append_entries, broadcast_vote_request, AppendBroadcastParams, PeerAppendRequest,
    VoteBroadcastParams,
};
use crate::communication::client::{CommitDataRequest, CommitDataResponse};
use crate::communication::peers::{
    AppendEntriesRequest, AppendEntriesResponse, PeerRequestHandler, VoteRequest, VoteResponse,
};
use crate::configuration::node::ElectionTimer;
use crate::data::{DataInterface, LogEntry};
use crate::errors::RaftError;
use crate::raft::context::{Context, PeerReply, PendingCommit};
use crate::raft::{next_role, RaftEvent, RaftRole};

/// The four-role consensus state machine.
///
/// Owns the [`Context`] and lends it to the per-role handlers for the
/// duration of a single event dispatch. Events emitted by handlers are
/// queued and dispatched after the current dispatch completes, so a
/// dispatch always observes a settled role.
pub(crate) struct RaftStateMachine<Di, Pc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
{
    role: RaftRole,
    pub(crate) ctx: Context<Di, Pc, Et>,
    emitted: VecDeque<RaftEvent>,
}

impl<Di, Pc, Et> RaftStateMachine<Di, Pc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
{
    pub fn new(ctx: Context<Di, Pc, Et>) -> RaftStateMachine<Di, Pc, Et> {
        RaftStateMachine {
            role: RaftRole::Standby,
            ctx,
            emitted: VecDeque::new(),
        }
    }

    pub fn role(&self) -> RaftRole {
        self.role
    }

    pub fn node_id(&self) -> u32 {
        self.ctx.node_id
    }

    pub fn election_deadline(&self) -> Option<Instant> {
        self.ctx.election_deadline
    }

    pub fn heartbeat_rx(&self) -> Receiver<Instant> {
        self.ctx.heartbeat_rx.clone()
    }

    /// Dispatches an event and every follow-up event it emits.
    pub fn handle(&mut self, event: RaftEvent) {
        self.dispatch(event);
        while let Some(follow_up) = self.emitted.pop_front() {
            self.dispatch(follow_up);
        }
    }

    fn emit(&mut self, event: RaftEvent) {
        self.emitted.push_back(event);
    }

    fn dispatch(&mut self, event: RaftEvent) {
        let next = match next_role(self.role, &event) {
            Some(next) => next,
            None => {
                trace!(
                    "Node {} Role {:?} ignores event {:?}",
                    self.ctx.node_id,
                    self.role,
                    event
                );
                return;
            }
        };

        match event {
            RaftEvent::Started => {}
            RaftEvent::Timedout => self.on_timedout(),
            RaftEvent::LeaderDiscovered { term } => self.on_leader_discovered(term),
            RaftEvent::VoteReceived { from } => self.on_vote_received(from),
            RaftEvent::Elected => {}
            RaftEvent::Terminated => {}
        }

        if next != self.role {
            self.exit_role();
            info!(
                "Node {} Role changed {:?} -> {:?} (term {})",
                self.ctx.node_id, self.role, next, self.ctx.current_term
            );
            self.role = next;
            self.enter_role();
        }
    }

    // Event handlers. A same-role transition runs these without the
    // entry/exit hooks.

    fn on_timedout(&mut self) {
        // a timed out candidate starts over with a fresh election;
        // a follower gets its election through the Candidate entry hook
        if self.role == RaftRole::Candidate {
            self.start_election();
        }
    }

    fn on_leader_discovered(&mut self, term: u64) {
        if term > self.ctx.current_term {
            self.ctx.set_current_term(term);
            self.ctx.voted_for = None;
        }
        // a follower staying follower still defers the next election
        self.ctx.reset_election_deadline();
    }

    fn on_vote_received(&mut self, from: u32) {
        self.ctx.votes_received.insert(from);
        let votes = self.ctx.votes_received.len() as u32;
        if votes >= self.ctx.quorum_size() {
            info!(
                "Node {} Gathered vote quorum ({}) for term {}",
                self.ctx.node_id, votes, self.ctx.current_term
            );
            self.emit(RaftEvent::Elected);
        }
    }

    // Entry/exit hooks.

    fn enter_role(&mut self) {
        match self.role {
            RaftRole::Standby => {
                self.ctx.election_deadline = None;
                self.ctx.heartbeat_rx = never();
                self.ctx.votes_received.clear();
                self.ctx.current_leader = None;
            }
            RaftRole::Follower => {
                self.ctx.votes_received.clear();
                self.ctx.reset_election_deadline();
            }
            RaftRole::Candidate => self.start_election(),
            RaftRole::Leader => self.enter_leader(),
        }
    }

    fn exit_role(&mut self) {
        if self.role == RaftRole::Leader {
            self.ctx.heartbeat_rx = never();
            self.ctx.next_index.clear();
            self.fail_pending_commits(RaftError::QuorumLost);
        }
    }

    fn start_election(&mut self) {
        let term = self.ctx.current_term + 1;
        self.ctx.set_current_term(term);
        self.ctx.voted_for = Some(self.ctx.node_id);
        self.ctx.votes_received = HashSet::new();
        self.ctx.votes_received.insert(self.ctx.node_id);
        self.ctx.current_leader = None;
        self.ctx.reset_election_deadline();

        info!(
            "Node {} Starting election for term {}",
            self.ctx.node_id, term
        );

        let request = VoteRequest {
            term,
            candidate_id: self.ctx.node_id,
            last_log_index: self.ctx.store.count(),
            last_log_term: self.ctx.store.last_term(),
        };
        broadcast_vote_request(VoteBroadcastParams {
            node_id: self.ctx.node_id,
            peers: self.ctx.peers(),
            request,
            communicator: self.ctx.peer_communicator.clone(),
            reply_tx: self.ctx.peer_reply_tx.clone(),
        });

        // a single node cluster elects itself on the spot
        if self.ctx.votes_received.len() as u32 >= self.ctx.quorum_size() {
            self.emit(RaftEvent::Elected);
        }
    }

    fn enter_leader(&mut self) {
        self.ctx.election_deadline = None;
        self.ctx.heartbeat_rx = tick(self.ctx.options.heartbeat_interval);
        self.ctx.current_leader = Some(self.ctx.node_id);

        let count = self.ctx.store.count();
        self.ctx.next_index.clear();
        for peer_id in self.ctx.peers() {
            self.ctx.next_index.insert(peer_id, count);
        }

        info!(
            "Node {} Became leader for term {}",
            self.ctx.node_id, self.ctx.current_term
        );

        self.broadcast_append_entries();
    }

    // Request handlers, driven by the node event loop.

    /// Serves an AppendEntries request: heartbeat, replication, or both.
    pub fn on_append_entries(&mut self, request: AppendEntriesRequest) -> AppendEntriesResponse {
        if request.term < self.ctx.current_term {
            trace!(
                "Node {} Rejected append entries: {}",
                self.ctx.node_id,
                RaftError::StaleTerm {
                    request_term: request.term,
                    current_term: self.ctx.current_term,
                }
            );
            return AppendEntriesResponse {
                term: self.ctx.current_term,
                success: false,
            };
        }
        if self.role == RaftRole::Standby {
            return AppendEntriesResponse {
                term: self.ctx.current_term,
                success: false,
            };
        }

        self.handle(RaftEvent::LeaderDiscovered { term: request.term });
        self.ctx.current_leader = Some(request.leader_id);

        let success = self.process_entries(request);
        AppendEntriesResponse {
            term: self.ctx.current_term,
            success,
        }
    }

    fn process_entries(&mut self, request: AppendEntriesRequest) -> bool {
        if request.prev_log_index > self.ctx.store.count() {
            trace!(
                "Node {} Missing entries before {} (count {})",
                self.ctx.node_id,
                request.prev_log_index,
                self.ctx.store.count()
            );
            return false;
        }
        if request.prev_log_index > 0 {
            let prev_term = match self.ctx.store.get(request.prev_log_index - 1) {
                Some(entry) => entry.term,
                None => {
                    error!(
                        "Node {} Store has no entry at {} below count {}",
                        self.ctx.node_id,
                        request.prev_log_index - 1,
                        self.ctx.store.count()
                    );
                    return false;
                }
            };
            if prev_term != request.prev_log_term {
                trace!(
                    "Node {} Previous entry term mismatch at {}: ours {}, leader {}",
                    self.ctx.node_id,
                    request.prev_log_index - 1,
                    prev_term,
                    request.prev_log_term
                );
                return false;
            }
        }

        for entry in request.entries {
            if !self.accept_entry(entry) {
                return false;
            }
        }

        let new_commit = request.leader_commit.min(self.ctx.store.count());
        if new_commit > self.ctx.commit_index {
            trace!(
                "Node {} Commit index {} -> {}",
                self.ctx.node_id,
                self.ctx.commit_index,
                new_commit
            );
            self.ctx.commit_index = new_commit;
        }
        true
    }

    fn accept_entry(&mut self, entry: LogEntry) -> bool {
        let count = self.ctx.store.count();
        if entry.id > count {
            trace!(
                "Node {} Gap before entry {} (count {})",
                self.ctx.node_id,
                entry.id,
                count
            );
            return false;
        }
        if entry.id < count {
            let existing_term = self.ctx.entry_term(entry.id);
            if existing_term == entry.term {
                // duplicate delivery, already stored
                return true;
            }
            if entry.id < self.ctx.commit_index {
                error!(
                    "Node {} {}",
                    self.ctx.node_id,
                    RaftError::ProtocolViolation(format!(
                        "conflicting entry {} below commit index {}",
                        entry.id, self.ctx.commit_index
                    ))
                );
                return false;
            }
            info!(
                "Node {} Rolling back divergent tail from entry {} (term {} -> {})",
                self.ctx.node_id, entry.id, existing_term, entry.term
            );
            if let Err(err) = self.ctx.store.rollback(entry.id) {
                error!("Node {} Rollback failed: {}", self.ctx.node_id, err);
                return false;
            }
        }

        if let Err(err) = self.ctx.store.commit(entry) {
            error!("Node {} Append refused: {}", self.ctx.node_id, err);
            return false;
        }
        true
    }

    /// Serves a RequestVote request.
    pub fn on_request_vote(&mut self, request: VoteRequest) -> VoteResponse {
        if request.term < self.ctx.current_term || self.role == RaftRole::Standby {
            trace!(
                "Node {} Denied vote for {}: {}",
                self.ctx.node_id,
                request.candidate_id,
                RaftError::StaleTerm {
                    request_term: request.term,
                    current_term: self.ctx.current_term,
                }
            );
            return VoteResponse {
                term: self.ctx.current_term,
                vote_granted: false,
                peer_id: self.ctx.node_id,
            };
        }

        if request.term > self.ctx.current_term {
            match self.role {
                // a higher term dethrones a candidate or leader
                RaftRole::Candidate | RaftRole::Leader => {
                    self.handle(RaftEvent::LeaderDiscovered { term: request.term })
                }
                _ => {
                    self.ctx.set_current_term(request.term);
                    self.ctx.voted_for = None;
                }
            }
        }

        let up_to_date = request.last_log_term > self.ctx.store.last_term()
            || (request.last_log_term == self.ctx.store.last_term()
                && request.last_log_index >= self.ctx.store.count());
        let free_to_vote = match self.ctx.voted_for {
            None => true,
            Some(id) => id == request.candidate_id,
        };
        let vote_granted = free_to_vote && up_to_date;

        if vote_granted {
            self.ctx.voted_for = Some(request.candidate_id);
            self.ctx.reset_election_deadline();
        }

        info!(
            "Node {} Vote for candidate {} in term {}: {}",
            self.ctx.node_id, request.candidate_id, self.ctx.current_term, vote_granted
        );

        VoteResponse {
            term: self.ctx.current_term,
            vote_granted,
            peer_id: self.ctx.node_id,
        }
    }

    /// Handles a peer response posted back by a broadcast worker.
    pub fn on_peer_reply(&mut self, reply: PeerReply) {
        match reply {
            PeerReply::Vote(response) => self.on_vote_reply(response),
            PeerReply::AppendEntries {
                peer_id,
                match_index,
                response,
            } => self.on_append_entries_reply(peer_id, match_index, response),
        }
    }

    fn on_vote_reply(&mut self, response: VoteResponse) {
        if response.term > self.ctx.current_term {
            self.handle(RaftEvent::LeaderDiscovered {
                term: response.term,
            });
            return;
        }
        if self.role != RaftRole::Candidate || response.term < self.ctx.current_term {
            trace!(
                "Node {} Ignoring stale vote response {}",
                self.ctx.node_id,
                response
            );
            return;
        }
        if response.vote_granted {
            self.handle(RaftEvent::VoteReceived {
                from: response.peer_id,
            });
        }
    }

    fn on_append_entries_reply(
        &mut self,
        peer_id: u32,
        match_index: u64,
        response: AppendEntriesResponse,
    ) {
        if response.term > self.ctx.current_term {
            self.handle(RaftEvent::LeaderDiscovered {
                term: response.term,
            });
            return;
        }
        if self.role != RaftRole::Leader || response.term < self.ctx.current_term {
            trace!(
                "Node {} Ignoring stale append entries response from {}",
                self.ctx.node_id,
                peer_id
            );
            return;
        }

        if response.success {
            self.ctx.next_index.insert(peer_id, match_index);
            for (_, pending) in self.ctx.pending_commits.range_mut(..match_index) {
                pending.acks.insert(peer_id);
            }
            self.try_commit_pending();
        } else {
            // the follower's log diverges; back off one entry and retry
            // on the next heartbeat
            let count = self.ctx.store.count();
            let slot = self.ctx.next_index.entry(peer_id).or_insert(count);
            *slot = slot.saturating_sub(1);
            trace!(
                "Node {} Peer {} rejected append entries, next index {}",
                self.ctx.node_id,
                peer_id,
                slot
            );
        }
    }

    /// Stages a client commit on the leader, or refuses it outright.
    pub fn on_commit_data(&mut self, request: CommitDataRequest) {
        if self.role != RaftRole::Leader {
            trace!(
                "Node {} Refused commit: {}",
                self.ctx.node_id,
                RaftError::NotLeader(self.ctx.current_leader)
            );
            self.resolve_completion(
                &request.completion_tx,
                CommitDataResponse {
                    result: false,
                    entry: None,
                    current_leader: self.ctx.current_leader,
                },
            );
            return;
        }

        if request.payload.len() > self.ctx.options.max_payload_size {
            warn!(
                "Node {} Refused commit of {} bytes (limit {})",
                self.ctx.node_id,
                request.payload.len(),
                self.ctx.options.max_payload_size
            );
            self.refuse_commit(&request);
            return;
        }

        let expected = self.ctx.next_entry_id();
        if request.id != expected {
            warn!(
                "Node {} Refused commit: {}",
                self.ctx.node_id,
                RaftError::InvalidCommitOrder {
                    id: request.id,
                    count: expected,
                }
            );
            self.refuse_commit(&request);
            return;
        }

        let entry = LogEntry {
            id: request.id,
            term: self.ctx.current_term,
            payload: request.payload,
        };
        info!("Node {} Staged {}", self.ctx.node_id, entry);
        self.ctx.pending_commits.insert(
            entry.id,
            PendingCommit {
                entry,
                acks: HashSet::new(),
                completion_tx: request.completion_tx,
            },
        );

        // a single node cluster needs no peer acknowledgements
        self.try_commit_pending();
        self.broadcast_append_entries();
    }

    fn refuse_commit(&mut self, request: &CommitDataRequest) {
        let current_leader = self.ctx.current_leader;
        self.resolve_completion(
            &request.completion_tx,
            CommitDataResponse {
                result: false,
                entry: None,
                current_leader,
            },
        );
    }

    /// Commits every staged entry that has gathered quorum, in id order.
    fn try_commit_pending(&mut self) {
        loop {
            let ready = match self.ctx.pending_commits.iter().next() {
                Some((&id, pending))
                    if pending.acks.len() as u32 + 1 >= self.ctx.quorum_size() =>
                {
                    id
                }
                _ => break,
            };
            let pending = match self.ctx.pending_commits.remove(&ready) {
                Some(pending) => pending,
                None => break,
            };

            match self.ctx.store.commit(pending.entry.clone()) {
                Ok(()) => {
                    self.ctx.commit_index = ready + 1;
                    info!("Node {} Committed {}", self.ctx.node_id, pending.entry);
                    self.resolve_completion(
                        &pending.completion_tx,
                        CommitDataResponse {
                            result: true,
                            entry: Some(pending.entry),
                            current_leader: self.ctx.current_leader,
                        },
                    );
                }
                Err(err) => {
                    error!(
                        "Node {} Commit of {} failed: {}",
                        self.ctx.node_id, pending.entry, err
                    );
                    self.resolve_completion(
                        &pending.completion_tx,
                        CommitDataResponse {
                            result: false,
                            entry: None,
                            current_leader: self.ctx.current_leader,
                        },
                    );
                }
            }
        }
    }

    fn fail_pending_commits(&mut self, reason: RaftError) {
        if self.ctx.pending_commits.is_empty() {
            return;
        }
        warn!(
            "Node {} Failing {} pending commits: {}",
            self.ctx.node_id,
            self.ctx.pending_commits.len(),
            reason
        );
        let pending_commits = std::mem::replace(&mut self.ctx.pending_commits, Default::default());
        for (_, pending) in pending_commits {
            self.resolve_completion(
                &pending.completion_tx,
                CommitDataResponse {
                    result: false,
                    entry: None,
                    current_leader: self.ctx.current_leader,
                },
            );
        }
    }

    fn resolve_completion(&self, completion_tx: &Sender<CommitDataResponse>, response: CommitDataResponse) {
        if completion_tx.send(response).is_err() {
            warn!(
                "Node {} Commit completion dropped by the client",
                self.ctx.node_id
            );
        }
    }

    /// Injects an election timeout into the state machine.
    pub fn on_election_timedout(&mut self) {
        info!(
            "Node {} Election timeout in role {:?} (term {})",
            self.ctx.node_id, self.role, self.ctx.current_term
        );
        self.handle(RaftEvent::Timedout);
    }

    /// Broadcasts heartbeats carrying whatever entries each peer is
    /// still missing.
    pub fn on_heartbeat_tick(&mut self) {
        if self.role != RaftRole::Leader {
            return;
        }
        self.broadcast_append_entries();
    }

    fn broadcast_append_entries(&mut self) {
        let mut requests = Vec::new();
        for peer_id in self.ctx.peers() {
            let next = *self
                .ctx
                .next_index
                .get(&peer_id)
                .unwrap_or(&self.ctx.store.count());
            let request = self.build_append_request(next);
            let match_index = request.prev_log_index + request.entries.len() as u64;
            requests.push(PeerAppendRequest {
                peer_id,
                match_index,
                request,
            });
        }
        if requests.is_empty() {
            return;
        }
        broadcast_append_entries(AppendBroadcastParams {
            node_id: self.ctx.node_id,
            requests,
            communicator: self.ctx.peer_communicator.clone(),
            reply_tx: self.ctx.peer_reply_tx.clone(),
        });
    }

    fn build_append_request(&self, next: u64) -> AppendEntriesRequest {
        let count = self.ctx.store.count();
        let mut entries = Vec::new();
        for id in next..count {
            match self.ctx.store.get(id) {
                Some(entry) => entries.push(entry),
                None => {
                    error!(
                        "Node {} Store has no entry at {} below count {}",
                        self.ctx.node_id, id, count
                    );
                    break;
                }
            }
        }
        for (_, pending) in self.ctx.pending_commits.range(next.max(count)..) {
            entries.push(pending.entry.clone());
        }

        let prev_log_term = if next > 0 {
            self.ctx.entry_term(next - 1)
        } else {
            0
        };

        AppendEntriesRequest {
            term: self.ctx.current_term,
            leader_id: self.ctx.node_id,
            prev_log_index: next,
            prev_log_term,
            entries,
            leader_commit: self.ctx.commit_index,
        }
    }
}
