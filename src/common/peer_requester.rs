use crossbeam_channel::Sender;
use rayon::prelude::*;

use crate::common::run_worker_thread;
use crate::communication::peers::{AppendEntriesRequest, PeerRequestHandler, VoteRequest};
use crate::raft::context::PeerReply;

pub(crate) struct VoteBroadcastParams<Pc: PeerRequestHandler> {
    pub node_id: u32,
    pub peers: Vec<u32>,
    pub request: VoteRequest,
    pub communicator: Pc,
    pub reply_tx: Sender<PeerReply>,
}

/// Broadcasts one vote request to every peer from a worker thread.
///
/// Each response is posted back onto the node event loop; transport
/// failures surface only as missing replies.
pub(crate) fn broadcast_vote_request<Pc: PeerRequestHandler>(params: VoteBroadcastParams<Pc>) {
    run_worker_thread(request_votes, params);
}

fn request_votes<Pc: PeerRequestHandler>(params: VoteBroadcastParams<Pc>) {
    let VoteBroadcastParams {
        node_id,
        peers,
        request,
        communicator,
        reply_tx,
    } = params;

    peers.into_par_iter().for_each(|peer_id| {
        trace!("Node {} Vote request to {}: {}", node_id, peer_id, request);
        match communicator.send_vote_request(peer_id, request) {
            Ok(response) => {
                if reply_tx.send(PeerReply::Vote(response)).is_err() {
                    trace!("Node {} stopped, vote response from {} dropped", node_id, peer_id);
                }
            }
            Err(err) => trace!("Node {} Vote request to {} failed: {}", node_id, peer_id, err),
        }
    });
}

pub(crate) struct PeerAppendRequest {
    pub peer_id: u32,
    /// Log length the peer matches once it accepts the request.
    pub match_index: u64,
    pub request: AppendEntriesRequest,
}

pub(crate) struct AppendBroadcastParams<Pc: PeerRequestHandler> {
    pub node_id: u32,
    pub requests: Vec<PeerAppendRequest>,
    pub communicator: Pc,
    pub reply_tx: Sender<PeerReply>,
}

/// Sends per-peer AppendEntries requests from a worker thread, posting
/// every response back onto the node event loop.
pub(crate) fn broadcast_append_entries<Pc: PeerRequestHandler>(params: AppendBroadcastParams<Pc>) {
    run_worker_thread(request_append_entries, params);
}

fn request_append_entries<Pc: PeerRequestHandler>(params: AppendBroadcastParams<Pc>) {
    let AppendBroadcastParams {
        node_id,
        requests,
        communicator,
        reply_tx,
    } = params;

    requests.into_par_iter().for_each(|peer_request| {
        let PeerAppendRequest {
            peer_id,
            match_index,
            request,
        } = peer_request;
        trace!("Node {} Append entries to {}: {}", node_id, peer_id, request);
        match communicator.send_append_entries_request(peer_id, request) {
            Ok(response) => {
                let reply = PeerReply::AppendEntries {
                    peer_id,
                    match_index,
                    response,
                };
                if reply_tx.send(reply).is_err() {
                    trace!(
                        "Node {} stopped, append entries response from {} dropped",
                        node_id,
                        peer_id
                    );
                }
            }
            Err(err) => trace!(
                "Node {} Append entries to {} failed: {}",
                node_id,
                peer_id,
                err
            ),
        }
    });
}
