// Shared bring-up helpers for the cluster scenarios.

pub mod partitioned_peer_communicator;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::info;

use failover::{
    ClientRequestHandler, ClusterConfig, ClusterNode, ClusterNodeOptions, CommitDataResponse,
    ElectionTimer, NodeConfiguration, NodeWorker, PeerRequestChannels, PeerRequestHandler,
};
use failover_modules::{InProcClientCommunicator, MemoryDataInterface, RandomizedElectionTimer};

pub const CLUSTER_NAME: &str = "test_cluster";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn peers_communication_timeout() -> Duration {
    Duration::from_millis(500)
}

pub fn client_communication_timeout() -> Duration {
    Duration::from_millis(2500)
}

pub fn sleep(seconds: u64) {
    thread::sleep(Duration::from_secs(seconds));
}

pub fn sleep_ms(milliseconds: u64) {
    thread::sleep(Duration::from_millis(milliseconds));
}

/// The usual bias: `leader_id` runs a short deterministic timer,
/// everyone else a much longer randomized one.
pub fn leader_biased_timer(leader_id: u32) -> impl Fn(u32) -> RandomizedElectionTimer {
    move |node_id| {
        if node_id == leader_id {
            RandomizedElectionTimer::fixed(Duration::from_millis(1000))
        } else {
            RandomizedElectionTimer::new(Duration::from_millis(2000), Duration::from_millis(4000))
        }
    }
}

pub struct TestCluster {
    pub nodes: Vec<u32>,
    pub workers: Vec<NodeWorker>,
    pub client_handlers: HashMap<u32, InProcClientCommunicator>,
    pub stores: HashMap<u32, MemoryDataInterface>,
}

impl TestCluster {
    pub fn terminate(self) {
        for worker in &self.workers {
            worker
                .terminate_worker_tx
                .send(())
                .expect("can send termination signal");
        }
        for worker in self.workers {
            if worker.join_handle.join().is_err() {
                panic!("worker panicked!")
            }
        }
    }
}

/// Builds and starts one node; `configure` runs before the worker
/// spawns, for callback registration.
pub fn start_node_with<Pc, Et, F>(
    node_id: u32,
    all_nodes: &[u32],
    peer_communicator: Pc,
    election_timer: Et,
    configure: F,
) -> (NodeWorker, InProcClientCommunicator, MemoryDataInterface)
where
    Pc: PeerRequestHandler + PeerRequestChannels,
    Et: ElectionTimer,
    F: FnOnce(&mut ClusterNode<MemoryDataInterface, Pc, InProcClientCommunicator, Et>),
{
    let data_interface = MemoryDataInterface::new();
    let client_communicator =
        InProcClientCommunicator::new(CLUSTER_NAME, node_id, client_communication_timeout());

    let config = NodeConfiguration {
        cluster_name: CLUSTER_NAME.to_string(),
        node_id,
        cluster: ClusterConfig::new(all_nodes.to_vec()),
        peer_communicator,
        client_communicator: client_communicator.clone(),
        election_timer,
        data_interface: data_interface.clone(),
        options: ClusterNodeOptions::default(),
    };

    let mut node = ClusterNode::new(config).expect("valid node configuration");
    configure(&mut node);

    (node.start(), client_communicator, data_interface)
}

pub fn start_cluster<Pc, Et, Cf, Tf>(
    node_ids: Vec<u32>,
    communicator_for: Cf,
    timer_for: Tf,
) -> TestCluster
where
    Pc: PeerRequestHandler + PeerRequestChannels,
    Et: ElectionTimer,
    Cf: Fn(u32) -> Pc,
    Tf: Fn(u32) -> Et,
{
    let mut workers = Vec::new();
    let mut client_handlers = HashMap::new();
    let mut stores = HashMap::new();

    for &node_id in &node_ids {
        let (worker, client_handler, store) = start_node_with(
            node_id,
            &node_ids,
            communicator_for(node_id),
            timer_for(node_id),
            |_| {},
        );
        workers.push(worker);
        client_handlers.insert(node_id, client_handler);
        stores.insert(node_id, store);
    }

    TestCluster {
        nodes: node_ids,
        workers,
        client_handlers,
        stores,
    }
}

/// Finds the elected leader by probing commit_data against the given
/// nodes, the way a real client would. The probe entry is committed by
/// whoever answers as leader.
pub fn find_a_leader_by_committing(
    cluster: &TestCluster,
    probe_nodes: &[u32],
    next_id: u64,
) -> (u32, CommitDataResponse) {
    for _ in 0..20 {
        for &node_id in probe_nodes {
            let handler = &cluster.client_handlers[&node_id];
            match handler.commit_data(next_id, Arc::from(&b"find a leader"[..])) {
                Ok(response) => {
                    if response.result {
                        return (node_id, response);
                    }
                }
                Err(err) => info!("Find a leader error: {}", err),
            }
        }
        sleep_ms(500);
    }
    panic!("cannot get a leader!")
}
