use crossbeam_channel::{Receiver, Sender};
use failover::RaftError;
use std::time::Duration;

/// Named request/response channel pair with send and receive timeouts.
///
/// `send_request` pairs one request with one response; the serving side
/// takes the request from `request_rx` and answers on `response_tx`.
#[derive(Clone, Debug)]
pub struct DuplexChannel<Request, Response> {
    name: String,
    timeout: Duration,
    request_tx: Sender<Request>,
    request_rx: Receiver<Request>,
    response_tx: Sender<Response>,
    response_rx: Receiver<Response>,
}

impl<Request, Response> DuplexChannel<Request, Response> {
    pub fn new(name: String, timeout: Duration) -> DuplexChannel<Request, Response> {
        let (request_tx, request_rx) = crossbeam_channel::bounded(0);
        let (response_tx, response_rx) = crossbeam_channel::bounded(0);

        DuplexChannel {
            name,
            timeout,
            request_tx,
            request_rx,
            response_tx,
            response_rx,
        }
    }

    pub fn request_rx(&self) -> Receiver<Request> {
        self.request_rx.clone()
    }

    pub fn response_tx(&self) -> Sender<Response> {
        self.response_tx.clone()
    }

    pub fn send_request(&self, request: Request) -> Result<Response, RaftError> {
        let timeout = crossbeam_channel::after(self.timeout);
        select!(
            recv(timeout) -> _ => {
                return Err(RaftError::Communication(format!(
                    "{}: send request timeout",
                    self.name
                )))
            },
            send(self.request_tx, request) -> result => {
                if result.is_err() {
                    return Err(RaftError::Communication(format!(
                        "{}: cannot send request",
                        self.name
                    )));
                }
            },
        );

        select!(
            recv(timeout) -> _ => {
                Err(RaftError::Communication(format!(
                    "{}: receive response timeout",
                    self.name
                )))
            },
            recv(self.response_rx) -> result => {
                result.map_err(|_| {
                    RaftError::Communication(format!(
                        "{}: cannot receive response",
                        self.name
                    ))
                })
            },
        )
    }
}
