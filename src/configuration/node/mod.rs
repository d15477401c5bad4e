use std::time::Duration;

use crate::communication::client::ClientRequestChannels;
use crate::communication::peers::{PeerRequestChannels, PeerRequestHandler};
use crate::configuration::cluster::ClusterConfig;
use crate::data::DataInterface;
use crate::errors::RaftError;

/// Provides the next election timeout.
///
/// Drawn fresh on every entry to the Follower or Candidate role so that
/// simultaneous candidacies desynchronize.
pub trait ElectionTimer: Send + 'static {
    fn next_election_timeout(&self) -> Duration;
}

/// Tunables of a cluster node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterNodeOptions {
    /// Lower bound of the randomized election timeout.
    pub election_timeout_min: Duration,

    /// Upper bound of the randomized election timeout.
    pub election_timeout_max: Duration,

    /// Leader heartbeat period. Must stay well below the election
    /// timeout or followers will keep calling elections.
    pub heartbeat_interval: Duration,

    /// Largest accepted `commit_data` payload.
    pub max_payload_size: usize,
}

impl Default for ClusterNodeOptions {
    fn default() -> ClusterNodeOptions {
        ClusterNodeOptions {
            election_timeout_min: Duration::from_millis(150),
            election_timeout_max: Duration::from_millis(300),
            heartbeat_interval: Duration::from_millis(50),
            max_payload_size: 1024 * 1024,
        }
    }
}

impl ClusterNodeOptions {
    pub fn validate(&self) -> Result<(), RaftError> {
        if self.election_timeout_min.as_millis() == 0 {
            return Err(RaftError::Config(
                "election_timeout_min must be nonzero".to_string(),
            ));
        }
        if self.election_timeout_max < self.election_timeout_min {
            return Err(RaftError::Config(format!(
                "election_timeout_max ({:?}) below election_timeout_min ({:?})",
                self.election_timeout_max, self.election_timeout_min
            )));
        }
        if self.heartbeat_interval.as_millis() == 0
            || self.heartbeat_interval >= self.election_timeout_min
        {
            return Err(RaftError::Config(format!(
                "heartbeat_interval ({:?}) must be nonzero and below election_timeout_min ({:?})",
                self.heartbeat_interval, self.election_timeout_min
            )));
        }
        if self.max_payload_size == 0 {
            return Err(RaftError::Config(
                "max_payload_size must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to assemble a cluster node.
pub struct NodeConfiguration<Di, Pc, Cc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels,
    Et: ElectionTimer,
{
    /// Namespace of the service endpoints of this cluster.
    pub cluster_name: String,

    /// Identity of this node. Must be a member of `cluster`.
    pub node_id: u32,

    pub cluster: ClusterConfig,
    pub peer_communicator: Pc,
    pub client_communicator: Cc,
    pub election_timer: Et,
    pub data_interface: Di,
    pub options: ClusterNodeOptions,
}

impl<Di, Pc, Cc, Et> NodeConfiguration<Di, Pc, Cc, Et>
where
    Di: DataInterface,
    Pc: PeerRequestHandler + PeerRequestChannels,
    Cc: ClientRequestChannels,
    Et: ElectionTimer,
{
    pub fn validate(&self) -> Result<(), RaftError> {
        self.options.validate()?;
        if self.cluster.node_count() == 0 {
            return Err(RaftError::Config("empty cluster membership".to_string()));
        }
        if !self.cluster.contains(self.node_id) {
            return Err(RaftError::Config(format!(
                "node {} is not a member of cluster {:?}",
                self.node_id,
                self.cluster.all_nodes()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert_eq!(Ok(()), ClusterNodeOptions::default().validate());
    }

    #[test]
    fn inverted_election_range_is_refused() {
        let options = ClusterNodeOptions {
            election_timeout_min: Duration::from_millis(300),
            election_timeout_max: Duration::from_millis(150),
            ..ClusterNodeOptions::default()
        };

        assert!(options.validate().is_err());
    }

    #[test]
    fn heartbeat_above_election_timeout_is_refused() {
        let options = ClusterNodeOptions {
            heartbeat_interval: Duration::from_millis(200),
            ..ClusterNodeOptions::default()
        };

        assert!(options.validate().is_err());
    }

    #[test]
    fn zero_payload_limit_is_refused() {
        let options = ClusterNodeOptions {
            max_payload_size: 0,
            ..ClusterNodeOptions::default()
        };

        assert!(options.validate().is_err());
    }
}
