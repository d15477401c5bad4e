use crate::communication::duplex_channel::DuplexChannel;

use crossbeam_channel::{Receiver, Sender};
use failover::{
    service_endpoint, AppendEntriesRequest, AppendEntriesResponse, PeerRequestChannels,
    PeerRequestHandler, RaftError, VoteRequest, VoteResponse, APPEND_ENTRIES_SERVICE,
    REQUEST_VOTE_SERVICE,
};

use std::collections::HashMap;
use std::time::Duration;

/// In-process implementation of the PeerRequestHandler and
/// PeerRequestChannels traits. One shared instance carries the
/// endpoints of the whole cluster.
#[derive(Clone, Debug)]
pub struct InProcPeerCommunicator {
    vote_channels: HashMap<u32, DuplexChannel<VoteRequest, VoteResponse>>,
    append_entries_channels: HashMap<u32, DuplexChannel<AppendEntriesRequest, AppendEntriesResponse>>,
}

impl InProcPeerCommunicator {
    /// Creates endpoints for every node of the cluster with the given
    /// request timeout.
    pub fn new(cluster_name: &str, nodes: Vec<u32>, timeout: Duration) -> InProcPeerCommunicator {
        let mut vote_channels = HashMap::new();
        let mut append_entries_channels = HashMap::new();

        for node_id in nodes {
            let vote_duplex = DuplexChannel::new(
                service_endpoint(cluster_name, node_id, REQUEST_VOTE_SERVICE),
                timeout,
            );
            let append_entries_duplex = DuplexChannel::new(
                service_endpoint(cluster_name, node_id, APPEND_ENTRIES_SERVICE),
                timeout,
            );

            vote_channels.insert(node_id, vote_duplex);
            append_entries_channels.insert(node_id, append_entries_duplex);
        }

        InProcPeerCommunicator {
            vote_channels,
            append_entries_channels,
        }
    }

    fn vote_channel(
        &self,
        node_id: u32,
    ) -> Result<&DuplexChannel<VoteRequest, VoteResponse>, RaftError> {
        self.vote_channels.get(&node_id).ok_or_else(|| {
            RaftError::Communication(format!("unknown vote endpoint for node {}", node_id))
        })
    }

    fn append_entries_channel(
        &self,
        node_id: u32,
    ) -> Result<&DuplexChannel<AppendEntriesRequest, AppendEntriesResponse>, RaftError> {
        self.append_entries_channels.get(&node_id).ok_or_else(|| {
            RaftError::Communication(format!(
                "unknown append entries endpoint for node {}",
                node_id
            ))
        })
    }
}

impl PeerRequestHandler for InProcPeerCommunicator {
    fn send_vote_request(
        &self,
        destination_node_id: u32,
        request: VoteRequest,
    ) -> Result<VoteResponse, RaftError> {
        trace!(
            "Destination Node {} Sending request {}",
            destination_node_id,
            request
        );

        let response = self.vote_channel(destination_node_id)?.send_request(request);

        trace!(
            "Destination Node {} Response {:?}",
            destination_node_id,
            response
        );

        response
    }

    fn send_append_entries_request(
        &self,
        destination_node_id: u32,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError> {
        trace!(
            "Destination Node {} Sending request {}",
            destination_node_id,
            request
        );

        let response = self
            .append_entries_channel(destination_node_id)?
            .send_request(request);

        trace!(
            "Destination Node {} Response {:?}",
            destination_node_id,
            response
        );

        response
    }
}

impl PeerRequestChannels for InProcPeerCommunicator {
    fn vote_request_rx(&self, node_id: u32) -> Receiver<VoteRequest> {
        self.vote_channels[&node_id].request_rx()
    }

    fn vote_response_tx(&self, node_id: u32) -> Sender<VoteResponse> {
        self.vote_channels[&node_id].response_tx()
    }

    fn append_entries_request_rx(&self, node_id: u32) -> Receiver<AppendEntriesRequest> {
        self.append_entries_channels[&node_id].request_rx()
    }

    fn append_entries_response_tx(&self, node_id: u32) -> Sender<AppendEntriesResponse> {
        self.append_entries_channels[&node_id].response_tx()
    }
}
