#[macro_use]
extern crate log;
#[macro_use]
extern crate crossbeam_channel;

mod communication;
mod election;
mod memory_data;

pub use communication::duplex_channel::DuplexChannel;
pub use communication::inproc::inproc_client_communicator::InProcClientCommunicator;
pub use communication::inproc::inproc_peer_communicator::InProcPeerCommunicator;
pub use election::RandomizedElectionTimer;
pub use memory_data::MemoryDataInterface;
