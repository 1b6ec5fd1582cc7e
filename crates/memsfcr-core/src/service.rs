//! ECU service
//!
//! A [`Connection`] is owned by one dedicated OS thread. Callers talk to it
//! through a cloneable [`EcuHandle`]; requests are queued on a channel and
//! executed strictly one at a time, so a command and its response are never
//! interleaved with another caller's.

use tokio::sync::{mpsc, oneshot};

use crate::decode::MemsSnapshot;
use crate::diagnostics::AnalysisReport;
use crate::protocol::{Connection, ConnectionStatus, ProtocolError};

/// Depth of the request queue
const REQUEST_QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, ProtocolError>>;

enum Request {
    ConnectAndInitialise { port: String, reply: Reply<bool> },
    Disconnect { reply: Reply<()> },
    SendCommand { command: Vec<u8>, reply: Reply<Vec<u8>> },
    DataFrame { reply: Reply<MemsSnapshot> },
    GetDiagnostics { reply: oneshot::Sender<AnalysisReport> },
    Status { reply: oneshot::Sender<ConnectionStatus> },
    Shutdown,
}

/// Owner of the ECU connection
pub struct EcuService {
    connection: Connection,
    requests: mpsc::Receiver<Request>,
}

impl EcuService {
    /// Move `connection` onto its own thread and return a handle to it
    pub fn spawn(connection: Connection) -> Result<EcuHandle, ProtocolError> {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let service = EcuService {
            connection,
            requests: rx,
        };

        std::thread::Builder::new()
            .name("memsfcr-ecu".into())
            .spawn(move || service.run())?;

        Ok(EcuHandle { requests: tx })
    }

    fn run(mut self) {
        tracing::debug!("ECU service started");

        while let Some(request) = self.requests.blocking_recv() {
            match request {
                Request::ConnectAndInitialise { port, reply } => {
                    let result = self.connection.connect_and_initialise(&port);
                    if let Err(e) = &result {
                        tracing::warn!(port = %port, error = %e, "connect and initialise failed");
                    }
                    let _ = reply.send(result);
                }
                Request::Disconnect { reply } => {
                    let _ = reply.send(self.connection.disconnect());
                }
                Request::SendCommand { command, reply } => {
                    let result = self.connection.send_command(&command);
                    if let Err(e) = &result {
                        tracing::warn!(command = %hex::encode(&command), error = %e, "command failed");
                    }
                    let _ = reply.send(result);
                }
                Request::DataFrame { reply } => {
                    let result = self.connection.get_telemetry();
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, "telemetry read failed");
                    }
                    let _ = reply.send(result);
                }
                Request::GetDiagnostics { reply } => {
                    let _ = reply.send(self.connection.get_diagnostics());
                }
                Request::Status { reply } => {
                    let _ = reply.send(self.connection.status());
                }
                Request::Shutdown => break,
            }
        }

        let _ = self.connection.disconnect();
        tracing::debug!("ECU service stopped");
    }
}

/// Cloneable handle to a running [`EcuService`]
#[derive(Clone)]
pub struct EcuHandle {
    requests: mpsc::Sender<Request>,
}

impl EcuHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, ProtocolError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(make(tx))
            .await
            .map_err(|_| ProtocolError::ServiceStopped)?;
        rx.await.map_err(|_| ProtocolError::ServiceStopped)
    }

    pub async fn connect_and_initialise(&self, port: &str) -> Result<bool, ProtocolError> {
        let port = port.to_string();
        self.call(|reply| Request::ConnectAndInitialise { port, reply })
            .await?
    }

    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        self.call(|reply| Request::Disconnect { reply }).await?
    }

    /// Send a raw command and wait for its full response
    pub async fn send_command(&self, command: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let command = command.to_vec();
        self.call(|reply| Request::SendCommand { command, reply })
            .await?
    }

    /// Read, decode and analyse one snapshot
    pub async fn get_telemetry(&self) -> Result<MemsSnapshot, ProtocolError> {
        self.call(|reply| Request::DataFrame { reply }).await?
    }

    pub async fn get_diagnostics(&self) -> Result<AnalysisReport, ProtocolError> {
        self.call(|reply| Request::GetDiagnostics { reply }).await
    }

    pub async fn status(&self) -> Result<ConnectionStatus, ProtocolError> {
        self.call(|reply| Request::Status { reply }).await
    }

    /// Stop the service after queued requests complete. The connection is
    /// closed on the way out.
    pub async fn shutdown(&self) -> Result<(), ProtocolError> {
        self.requests
            .send(Request::Shutdown)
            .await
            .map_err(|_| ProtocolError::ServiceStopped)
    }

    /// Whether the service thread is still accepting requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }
}
