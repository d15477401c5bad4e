use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use failover::{
    AppendEntriesRequest, AppendEntriesResponse, PeerRequestChannels, PeerRequestHandler,
    RaftError, VoteRequest, VoteResponse,
};
use failover_modules::InProcPeerCommunicator;

/// Communicator wrapper that drops every request from or to a blocked
/// node, emulating a network partition around it.
#[derive(Clone, Debug)]
pub struct PartitionedPeerCommunicator {
    node_id: u32,
    blocked: Arc<Mutex<HashSet<u32>>>,
    inner: InProcPeerCommunicator,
}

impl PartitionedPeerCommunicator {
    pub fn new(
        node_id: u32,
        inner: InProcPeerCommunicator,
        blocked: Arc<Mutex<HashSet<u32>>>,
    ) -> PartitionedPeerCommunicator {
        PartitionedPeerCommunicator {
            node_id,
            blocked,
            inner,
        }
    }

    fn is_cut_off(&self, destination_node_id: u32) -> bool {
        let blocked = self.blocked.lock().expect("blocked lock is not poisoned");

        blocked.contains(&self.node_id) || blocked.contains(&destination_node_id)
    }

    fn partition_error(&self, destination_node_id: u32) -> RaftError {
        RaftError::Communication(format!(
            "partition between {} and {}",
            self.node_id, destination_node_id
        ))
    }
}

impl PeerRequestHandler for PartitionedPeerCommunicator {
    fn send_vote_request(
        &self,
        destination_node_id: u32,
        request: VoteRequest,
    ) -> Result<VoteResponse, RaftError> {
        if self.is_cut_off(destination_node_id) {
            return Err(self.partition_error(destination_node_id));
        }
        self.inner.send_vote_request(destination_node_id, request)
    }

    fn send_append_entries_request(
        &self,
        destination_node_id: u32,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError> {
        if self.is_cut_off(destination_node_id) {
            return Err(self.partition_error(destination_node_id));
        }
        self.inner
            .send_append_entries_request(destination_node_id, request)
    }
}

impl PeerRequestChannels for PartitionedPeerCommunicator {
    fn vote_request_rx(&self, node_id: u32) -> Receiver<VoteRequest> {
        self.inner.vote_request_rx(node_id)
    }

    fn vote_response_tx(&self, node_id: u32) -> Sender<VoteResponse> {
        self.inner.vote_response_tx(node_id)
    }

    fn append_entries_request_rx(&self, node_id: u32) -> Receiver<AppendEntriesRequest> {
        self.inner.append_entries_request_rx(node_id)
    }

    fn append_entries_response_tx(&self, node_id: u32) -> Sender<AppendEntriesResponse> {
        self.inner.append_entries_response_tx(node_id)
    }
}
