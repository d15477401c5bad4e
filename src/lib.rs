#[macro_use]
extern crate log;
#[macro_use]
extern crate crossbeam_channel;
#[macro_use]
extern crate derive_more;

mod common;
mod communication;
mod configuration;
mod data;
mod errors;
mod lifecycle;
mod node;
mod raft;

pub use common::NodeWorker;
pub use communication::client::{
    ClientRequestChannels, ClientRequestHandler, CommitDataRequest, CommitDataResponse,
};
pub use communication::peers::{
    AppendEntriesRequest, AppendEntriesResponse, PeerRequestChannels, PeerRequestHandler,
    VoteRequest, VoteResponse,
};
pub use communication::{
    service_endpoint, APPEND_ENTRIES_SERVICE, COMMIT_DATA_SERVICE, REQUEST_VOTE_SERVICE,
};
pub use configuration::cluster::ClusterConfig;
pub use configuration::node::{ClusterNodeOptions, ElectionTimer, NodeConfiguration};
pub use data::{DataInterface, LogEntry};
pub use errors::RaftError;
pub use lifecycle::LifecycleState;
pub use node::{start_node, ClusterNode};
pub use raft::RaftRole;
