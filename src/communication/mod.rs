pub mod client;
pub mod peers;

/// Service name of the log replication and heartbeat endpoint.
pub const APPEND_ENTRIES_SERVICE: &str = "append_entries";

/// Service name of the leader election endpoint.
pub const REQUEST_VOTE_SERVICE: &str = "request_vote";

/// Service name of the client-facing commit endpoint.
pub const COMMIT_DATA_SERVICE: &str = "commit_data";

/// Composes the full endpoint name of a node service.
pub fn service_endpoint(cluster_name: &str, node_id: u32, service_name: &str) -> String {
    format!("{}/{}/{}", cluster_name, node_id, service_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_name_contains_namespace_node_and_service() {
        assert_eq!(
            "test_cluster/3/append_entries",
            service_endpoint("test_cluster", 3, APPEND_ENTRIES_SERVICE)
        );
    }
}
