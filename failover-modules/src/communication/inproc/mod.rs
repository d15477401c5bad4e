pub mod inproc_client_communicator;
pub mod inproc_peer_communicator;
