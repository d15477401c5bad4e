use failover::{ClusterNodeOptions, ElectionTimer};
use rand::Rng;
use std::time::Duration;

/// Draws every election timeout uniformly from a closed range of
/// durations.
///
/// A fresh draw happens on each entry to the Follower or Candidate
/// role, which is what keeps simultaneous candidacies from colliding
/// forever.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RandomizedElectionTimer {
    min: Duration,
    max: Duration,
}

impl RandomizedElectionTimer {
    /// Timer over the closed range `[min, max]`.
    pub fn new(min: Duration, max: Duration) -> RandomizedElectionTimer {
        assert!(
            min <= max && max > Duration::from_millis(0),
            "invalid election timeout range {:?}..={:?}",
            min,
            max
        );
        RandomizedElectionTimer { min, max }
    }

    /// Timer spanning the election timeout range of the options.
    pub fn from_options(options: &ClusterNodeOptions) -> RandomizedElectionTimer {
        RandomizedElectionTimer::new(options.election_timeout_min, options.election_timeout_max)
    }

    /// Degenerate range that always yields `timeout`. Handy where a
    /// predictable first election is wanted, tests mostly.
    pub fn fixed(timeout: Duration) -> RandomizedElectionTimer {
        RandomizedElectionTimer::new(timeout, timeout)
    }
}

impl ElectionTimer for RandomizedElectionTimer {
    fn next_election_timeout(&self) -> Duration {
        let span_ms = (self.max - self.min).as_millis() as u64;
        let offset = rand::thread_rng().gen_range(0, span_ms + 1);

        self.min + Duration::from_millis(offset)
    }
}
