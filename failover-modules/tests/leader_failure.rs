mod steps;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use failover_modules::InProcPeerCommunicator;

use crate::steps::partitioned_peer_communicator::PartitionedPeerCommunicator;

/// When the leader drops off the network, the surviving nodes elect a
/// new leader in a strictly greater term and keep accepting commits.
#[test]
fn surviving_nodes_elect_a_new_leader_in_a_higher_term() {
    steps::init_logger();

    let node_ids = vec![1, 2, 3];
    let inner = InProcPeerCommunicator::new(
        steps::CLUSTER_NAME,
        node_ids.clone(),
        steps::peers_communication_timeout(),
    );
    let blocked: Arc<Mutex<HashSet<u32>>> = Arc::new(Mutex::new(HashSet::new()));

    let cluster = steps::start_cluster(
        node_ids.clone(),
        |node_id| PartitionedPeerCommunicator::new(node_id, inner.clone(), blocked.clone()),
        steps::leader_biased_timer(1),
    );

    steps::sleep(3);

    let (first_leader, first) = steps::find_a_leader_by_committing(&cluster, &node_ids, 0);
    assert_eq!(1, first_leader, "the biased timer wins the first election");
    let first_term = first.entry.expect("committed entry").term;

    // cut the leader off
    blocked
        .lock()
        .expect("blocked lock is not poisoned")
        .insert(1);

    steps::sleep(6);

    let (new_leader, second) = steps::find_a_leader_by_committing(&cluster, &[2, 3], 1);
    let second_term = second.entry.expect("committed entry").term;

    assert_ne!(1, new_leader);
    assert!(
        second_term > first_term,
        "new leader term {} must exceed the old one {}",
        second_term,
        first_term
    );

    cluster.terminate();
}
