use crossbeam_channel::{Receiver, Sender};
use failover::{
    service_endpoint, ClientRequestChannels, ClientRequestHandler, CommitDataRequest,
    CommitDataResponse, RaftError, COMMIT_DATA_SERVICE,
};

use std::sync::Arc;
use std::time::Duration;

/// In-process client endpoint of a single node.
///
/// Each request carries its own one-shot completion channel; the
/// blocking `commit_data` waits on it with the configured timeout, so
/// concurrent clients never steal each other's responses.
#[derive(Clone, Debug)]
pub struct InProcClientCommunicator {
    endpoint: String,
    timeout: Duration,
    request_tx: Sender<CommitDataRequest>,
    request_rx: Receiver<CommitDataRequest>,
}

impl InProcClientCommunicator {
    pub fn new(cluster_name: &str, node_id: u32, timeout: Duration) -> InProcClientCommunicator {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();

        InProcClientCommunicator {
            endpoint: service_endpoint(cluster_name, node_id, COMMIT_DATA_SERVICE),
            timeout,
            request_tx,
            request_rx,
        }
    }
}

impl ClientRequestHandler for InProcClientCommunicator {
    fn commit_data(&self, id: u64, payload: Arc<[u8]>) -> Result<CommitDataResponse, RaftError> {
        let (completion_tx, completion_rx) = crossbeam_channel::bounded(1);
        let request = CommitDataRequest {
            id,
            payload,
            completion_tx,
        };

        trace!("{} Sending {}", self.endpoint, request);
        self.request_tx.send(request).map_err(|_| {
            RaftError::Communication(format!("{}: node unavailable", self.endpoint))
        })?;

        completion_rx.recv_timeout(self.timeout).map_err(|_| {
            RaftError::Communication(format!("{}: commit response timeout", self.endpoint))
        })
    }
}

impl ClientRequestChannels for InProcClientCommunicator {
    fn commit_data_request_rx(&self) -> Receiver<CommitDataRequest> {
        self.request_rx.clone()
    }
}
