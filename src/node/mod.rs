mod event_loop;

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use crate::common::NodeWorker;
use crate::communication::client::{
    ClientRequestChannels, ClientRequestHandler, CommitDataResponse,
};
use crate::communication::peers::{PeerRequestChannels, PeerRequestHandler};
use crate::configuration::node::{ElectionTimer, NodeConfiguration};
use crate::data::{DataInterface, DataStore};
use crate::errors::RaftError;
use crate::lifecycle::{LifecycleCallbacks, LifecycleStateMachine};
use crate::node::event_loop::EventLoopChannels;
use crate::raft::context::Context;
use crate::raft::fsm::RaftStateMachine;

/// Failover cluster node facade.
///
/// Composes the consensus state machine, the lifecycle machine, the
/// data store proxy and the communicators, and drives them on a single
/// event loop thread.
pub struct ClusterNode<Di, Pc, Cc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels,
    Et: ElectionTimer,
{
    config: NodeConfiguration<Di, Pc, Cc, Et>,
    callbacks: LifecycleCallbacks,
}

impl<Di, Pc, Cc, Et> ClusterNode<Di, Pc, Cc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels,
    Et: ElectionTimer,
{
    /// Validates the configuration and assembles a node. Configuration
    /// errors are fatal here, before anything runs.
    pub fn new(config: NodeConfiguration<Di, Pc, Cc, Et>) -> Result<ClusterNode<Di, Pc, Cc, Et>, RaftError> {
        config.validate()?;
        Ok(ClusterNode {
            config,
            callbacks: LifecycleCallbacks::default(),
        })
    }

    /// Invoked once each time this node becomes the cluster leader.
    pub fn register_on_activated<F: Fn() + Send + 'static>(&mut self, callback: F) {
        self.callbacks.on_activated = Some(Box::new(callback));
    }

    /// Invoked once each time this node stops being the leader.
    pub fn register_on_deactivated<F: Fn() + Send + 'static>(&mut self, callback: F) {
        self.callbacks.on_deactivated = Some(Box::new(callback));
    }

    /// Invoked once each time this node leaves the running cluster.
    pub fn register_on_standby<F: Fn() + Send + 'static>(&mut self, callback: F) {
        self.callbacks.on_standby = Some(Box::new(callback));
    }

    /// Spawns the node event loop and returns its worker handle.
    pub fn start(self) -> NodeWorker {
        let (terminate_worker_tx, terminate_rx) = crossbeam_channel::unbounded();
        let join_handle = thread::spawn(move || self.run_event_loop(terminate_rx));
        NodeWorker {
            join_handle,
            terminate_worker_tx,
        }
    }

    /// Runs the node on the calling thread until it is shut down.
    pub fn run(self) {
        let worker = self.start();
        // keep the terminate channel open while the loop runs
        let _terminate_tx = worker.terminate_worker_tx;
        if worker.join_handle.join().is_err() {
            error!("Node worker panicked");
        }
    }

    fn run_event_loop(self, terminate_rx: Receiver<()>) {
        let ClusterNode { config, callbacks } = self;
        let node_id = config.node_id;

        let (peer_reply_tx, peer_reply_rx) = crossbeam_channel::unbounded();
        let store = DataStore::new(config.data_interface);
        let context = Context::new(
            node_id,
            config.cluster,
            config.options,
            store,
            config.peer_communicator.clone(),
            config.election_timer,
            peer_reply_tx,
        );
        let fsm = RaftStateMachine::new(context);
        let lifecycle = LifecycleStateMachine::new(callbacks);
        let channels = EventLoopChannels {
            vote_request_rx: config.peer_communicator.vote_request_rx(node_id),
            vote_response_tx: config.peer_communicator.vote_response_tx(node_id),
            append_entries_request_rx: config.peer_communicator.append_entries_request_rx(node_id),
            append_entries_response_tx: config
                .peer_communicator
                .append_entries_response_tx(node_id),
            commit_data_request_rx: config.client_communicator.commit_data_request_rx(),
            peer_reply_rx,
        };

        info!("Node {} of cluster '{}' started", node_id, config.cluster_name);
        event_loop::run_event_loop(fsm, lifecycle, channels, terminate_rx);
    }
}

impl<Di, Pc, Cc, Et> ClusterNode<Di, Pc, Cc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels + ClientRequestHandler,
    Et: ElectionTimer,
{
    /// Proposes a new data entry through this node and blocks until it
    /// is committed or refused.
    pub fn commit_data(&self, id: u64, payload: Arc<[u8]>) -> Result<CommitDataResponse, RaftError> {
        self.config.client_communicator.commit_data(id, payload)
    }

    /// Client handle for commit_data requests against this node.
    pub fn client_handler(&self) -> Cc {
        self.config.client_communicator.clone()
    }
}

/// Starts a cluster node worker from a validated configuration.
pub fn start_node<Di, Pc, Cc, Et>(
    config: NodeConfiguration<Di, Pc, Cc, Et>,
) -> Result<NodeWorker, RaftError>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels,
    Et: ElectionTimer,
{
    Ok(ClusterNode::new(config)?.start())
}
