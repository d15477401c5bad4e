use std::time::Duration;

use crossbeam_channel::{at, never, Receiver, Sender};

use crate::communication::client::CommitDataRequest;
use crate::communication::peers::{
    AppendEntriesRequest, AppendEntriesResponse, PeerRequestHandler, VoteRequest, VoteResponse,
};
use crate::configuration::node::ElectionTimer;
use crate::data::DataInterface;
use crate::lifecycle::LifecycleStateMachine;
use crate::raft::context::PeerReply;
use crate::raft::fsm::RaftStateMachine;
use crate::raft::RaftEvent;

/// Upper bound for handing a response back to a requester. A requester
/// that gave up on its timeout must not stall the loop for good.
const RESPONSE_SEND_TIMEOUT: Duration = Duration::from_millis(100);

pub(crate) struct EventLoopChannels {
    pub vote_request_rx: Receiver<VoteRequest>,
    pub vote_response_tx: Sender<VoteResponse>,
    pub append_entries_request_rx: Receiver<AppendEntriesRequest>,
    pub append_entries_response_tx: Sender<AppendEntriesResponse>,
    pub commit_data_request_rx: Receiver<CommitDataRequest>,
    pub peer_reply_rx: Receiver<PeerReply>,
}

/// The single serial executor of a cluster node.
///
/// Every state transition, request handler, timer fire and peer reply
/// runs here, one at a time; handlers run to completion. Outbound
/// requests never block the loop: broadcast workers post their
/// responses back through `peer_reply_rx`.
pub(crate) fn run_event_loop<Di, Pc, Et>(
    mut fsm: RaftStateMachine<Di, Pc, Et>,
    mut lifecycle: LifecycleStateMachine,
    channels: EventLoopChannels,
    terminate_rx: Receiver<()>,
) where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
{
    let node_id = fsm.node_id();
    let EventLoopChannels {
        vote_request_rx,
        vote_response_tx,
        append_entries_request_rx,
        append_entries_response_tx,
        commit_data_request_rx,
        peer_reply_rx,
    } = channels;
    let mut client_channel_open = true;

    info!("Node {} Event loop started", node_id);
    dispatch(&mut fsm, &mut lifecycle, |fsm| {
        fsm.handle(RaftEvent::Started)
    });

    loop {
        let election_rx = match fsm.election_deadline() {
            Some(deadline) => at(deadline),
            None => never(),
        };
        let heartbeat_rx = fsm.heartbeat_rx();
        let commit_rx = if client_channel_open {
            commit_data_request_rx.clone()
        } else {
            never()
        };

        select!(
            recv(terminate_rx) -> result => {
                if result.is_err() {
                    error!("Node {} Terminate channel closed abnormally", node_id);
                }
                dispatch(&mut fsm, &mut lifecycle, |fsm| {
                    fsm.handle(RaftEvent::Terminated)
                });
                break;
            },
            recv(append_entries_request_rx) -> result => match result {
                Ok(request) => {
                    let response = dispatch(&mut fsm, &mut lifecycle, |fsm| {
                        fsm.on_append_entries(request)
                    });
                    if append_entries_response_tx
                        .send_timeout(response, RESPONSE_SEND_TIMEOUT)
                        .is_err()
                    {
                        warn!("Node {} Append entries response dropped", node_id);
                    }
                }
                Err(_) => {
                    error!("Node {} Append entries channel closed", node_id);
                    break;
                }
            },
            recv(vote_request_rx) -> result => match result {
                Ok(request) => {
                    let response = dispatch(&mut fsm, &mut lifecycle, |fsm| {
                        fsm.on_request_vote(request)
                    });
                    if vote_response_tx
                        .send_timeout(response, RESPONSE_SEND_TIMEOUT)
                        .is_err()
                    {
                        warn!("Node {} Vote response dropped", node_id);
                    }
                }
                Err(_) => {
                    error!("Node {} Vote channel closed", node_id);
                    break;
                }
            },
            recv(commit_rx) -> result => match result {
                Ok(request) => dispatch(&mut fsm, &mut lifecycle, |fsm| {
                    fsm.on_commit_data(request)
                }),
                Err(_) => {
                    // clients may come and go; consensus keeps running
                    trace!("Node {} Client channel closed", node_id);
                    client_channel_open = false;
                }
            },
            recv(peer_reply_rx) -> result => {
                if let Ok(reply) = result {
                    dispatch(&mut fsm, &mut lifecycle, |fsm| fsm.on_peer_reply(reply));
                }
            },
            recv(election_rx) -> _ => dispatch(&mut fsm, &mut lifecycle, |fsm| {
                fsm.on_election_timedout()
            }),
            recv(heartbeat_rx) -> _ => dispatch(&mut fsm, &mut lifecycle, |fsm| {
                fsm.on_heartbeat_tick()
            }),
        );
    }

    info!("Node {} Event loop stopped", node_id);
}

/// Runs one handler on the consensus machine and forwards any resulting
/// role change to the lifecycle machine, its sole subscriber.
fn dispatch<Di, Pc, Et, R, F>(
    fsm: &mut RaftStateMachine<Di, Pc, Et>,
    lifecycle: &mut LifecycleStateMachine,
    handler: F,
) -> R
where
    Di: DataInterface,
    Pc: PeerRequestHandler,
    Et: ElectionTimer,
    F: FnOnce(&mut RaftStateMachine<Di, Pc, Et>) -> R,
{
    let role_before = fsm.role();
    let result = handler(fsm);
    let role_after = fsm.role();
    if role_after != role_before {
        lifecycle.apply_role(role_after);
    }
    result
}
