//! Four in-process nodes replicate a stream of one-letter entries.
//!
//! One process hosts the whole cluster; a client keeps committing the
//! next letter through whichever node currently leads, and the demo
//! finishes by dumping every node's store.

#[macro_use]
extern crate log;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use failover::{
    ClientRequestHandler, ClusterConfig, ClusterNode, ClusterNodeOptions, NodeConfiguration,
    NodeWorker,
};
use failover_modules::{
    InProcClientCommunicator, InProcPeerCommunicator, MemoryDataInterface,
    RandomizedElectionTimer,
};

const CLUSTER_NAME: &str = "demo_cluster";
const DATA_COUNT: u64 = 8;

fn main() {
    env_logger::builder().format_timestamp_millis().init();

    let node_ids = vec![1, 2, 3, 4];
    let options = ClusterNodeOptions {
        election_timeout_min: Duration::from_millis(1500),
        election_timeout_max: Duration::from_millis(2000),
        heartbeat_interval: Duration::from_millis(200),
        ..ClusterNodeOptions::default()
    };

    let peer_communicator = InProcPeerCommunicator::new(
        CLUSTER_NAME,
        node_ids.clone(),
        Duration::from_millis(500),
    );

    let mut workers: Vec<NodeWorker> = Vec::new();
    let mut client_handlers: HashMap<u32, InProcClientCommunicator> = HashMap::new();
    let mut stores: HashMap<u32, MemoryDataInterface> = HashMap::new();

    for &node_id in &node_ids {
        let data_interface = MemoryDataInterface::new();
        let client_communicator =
            InProcClientCommunicator::new(CLUSTER_NAME, node_id, Duration::from_millis(2500));

        let config = NodeConfiguration {
            cluster_name: CLUSTER_NAME.to_string(),
            node_id,
            cluster: ClusterConfig::new(node_ids.clone()),
            peer_communicator: peer_communicator.clone(),
            client_communicator: client_communicator.clone(),
            election_timer: RandomizedElectionTimer::from_options(&options),
            data_interface: data_interface.clone(),
            options: options.clone(),
        };

        let mut node = ClusterNode::new(config).expect("valid node configuration");
        node.register_on_activated(move || info!("Node {} activated", node_id));
        node.register_on_deactivated(move || info!("Node {} deactivated", node_id));
        node.register_on_standby(move || info!("Node {} standby", node_id));

        workers.push(node.start());
        client_handlers.insert(node_id, client_communicator);
        stores.insert(node_id, data_interface);
    }

    let mut letter = b'a';
    let mut next_id = 0;
    while next_id < DATA_COUNT {
        thread::sleep(Duration::from_secs(2));

        let payload: Arc<[u8]> = Arc::from(vec![letter]);
        match commit_anywhere(&node_ids, &client_handlers, next_id, payload) {
            Some(entry) => {
                info!("Committed '{}' as {}", letter as char, entry);
                letter += 1;
                next_id += 1;
            }
            None => warn!("No leader answered for id {}, retrying", next_id),
        }
    }

    thread::sleep(Duration::from_secs(1));
    for &node_id in &node_ids {
        let dump: String = stores[&node_id]
            .entries()
            .iter()
            .map(|entry| entry.payload[0] as char)
            .collect();
        info!("Node {} store: '{}'", node_id, dump);
    }

    for worker in &workers {
        let _ = worker.terminate_worker_tx.send(());
    }
    for worker in workers {
        let _ = worker.join_handle.join();
    }
}

fn commit_anywhere(
    node_ids: &[u32],
    client_handlers: &HashMap<u32, InProcClientCommunicator>,
    id: u64,
    payload: Arc<[u8]>,
) -> Option<failover::LogEntry> {
    for node_id in node_ids {
        match client_handlers[node_id].commit_data(id, payload.clone()) {
            Ok(response) => {
                if response.result {
                    return response.entry;
                }
            }
            Err(err) => trace!("Commit through node {} failed: {}", node_id, err),
        }
    }
    None
}
