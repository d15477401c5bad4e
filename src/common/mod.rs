use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

pub(crate) mod peer_requester;

/// Handle to a running cluster node worker thread.
pub struct NodeWorker {
    pub join_handle: JoinHandle<()>,
    pub terminate_worker_tx: Sender<()>,
}

pub(crate) fn run_worker_thread<T, F>(worker: F, params: T) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    thread::spawn(move || worker(params))
}
