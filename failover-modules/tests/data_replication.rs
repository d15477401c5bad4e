mod steps;

use std::sync::Arc;

use failover::ClientRequestHandler;
use failover_modules::InProcPeerCommunicator;

/// A committed entry ends up identical in the store of every node, and
/// an out-of-order commit id is refused without touching any store.
#[test]
fn committed_entry_reaches_every_node() {
    steps::init_logger();

    let node_ids = vec![1, 2, 3, 4];
    let peer_communicator = InProcPeerCommunicator::new(
        steps::CLUSTER_NAME,
        node_ids.clone(),
        steps::peers_communication_timeout(),
    );
    let cluster = steps::start_cluster(
        node_ids.clone(),
        |_| peer_communicator.clone(),
        steps::leader_biased_timer(1),
    );

    steps::sleep(3);

    // entry 0 is the leader probe itself
    let (leader_id, probe) = steps::find_a_leader_by_committing(&cluster, &node_ids, 0);
    let probe_entry = probe.entry.expect("committed probe entry");
    assert_eq!(0, probe_entry.id);
    assert!(probe_entry.term >= 1);

    let leader_handler = &cluster.client_handlers[&leader_id];
    let response = leader_handler
        .commit_data(1, Arc::from(&b"a"[..]))
        .expect("commit succeeds");
    assert!(response.result);
    let committed = response.entry.expect("committed entry");
    assert_eq!(1, committed.id);
    assert_eq!(b"a".to_vec(), committed.payload.to_vec());

    // stragglers catch up with the next heartbeats
    steps::sleep(1);

    for &node_id in &node_ids {
        let entries = cluster.stores[&node_id].entries();
        assert_eq!(2, entries.len(), "node {} holds both entries", node_id);
        assert_eq!(b"a".to_vec(), entries[1].payload.to_vec());
        assert_eq!(committed.term, entries[1].term);
    }

    // an id that skips ahead is refused and changes nothing
    let stale = leader_handler
        .commit_data(5, Arc::from(&b"x"[..]))
        .expect("response arrives");
    assert!(!stale.result);
    assert_eq!(None, stale.entry);
    assert_eq!(2, cluster.stores[&leader_id].count());

    cluster.terminate();
}
