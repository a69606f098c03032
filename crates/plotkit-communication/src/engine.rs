//! The protocol engine: a single-outstanding-request state machine over
//! the serial port.
//!
//! The engine is a spawned task owning the port. Callers talk to it
//! through a `ProtocolHandle`. Fire-and-forget writes go straight to the
//! wire; queries make the engine wait for a fixed number of CR-terminated
//! reply lines or a 500 ms timeout. Requests that arrive while a query is
//! outstanding are stashed (bounded) and drained FIFO when the query
//! completes.

use crate::command::EbbCommand;
use crate::port::PlotterPort;
use plotkit_core::{ProtocolError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long a query may wait for its reply.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Capacity of the stash for requests arriving while a query is
/// outstanding.
pub const STASH_CAPACITY: usize = 100;

/// Wire length limit including the trailing CR.
const MAX_COMMAND_LEN: usize = 64;

/// Engine poll period; the port read timeout keeps each pass short.
const LOOP_DELAY: Duration = Duration::from_millis(5);

/// A request to the engine.
#[derive(Debug)]
pub enum ProtocolRequest {
    /// Fire-and-forget write.
    Write { data: String },
    /// Write, then await `expected_lines` CR-terminated reply lines.
    Query {
        data: String,
        expected_lines: usize,
        correlation_id: String,
        reply: oneshot::Sender<ProtocolResponse>,
    },
    /// Clear the port's I/O buffers.
    Flush,
}

/// The outcome of a query, delivered on its reply channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolResponse {
    /// The expected reply lines arrived.
    Success {
        correlation_id: String,
        command: String,
        payload: String,
    },
    /// The request was rejected before or at the wire.
    Failure {
        correlation_id: String,
        command: String,
        reason: String,
    },
    /// No complete reply within the response timeout.
    Timeout {
        correlation_id: String,
        command: String,
        partial: String,
    },
}

/// A query in flight. At most one exists at a time.
struct PendingCommand {
    original: String,
    expected_lines: usize,
    reply: oneshot::Sender<ProtocolResponse>,
    buffer: String,
    correlation_id: String,
    timer_key: Uuid,
    timer: JoinHandle<()>,
}

/// Caller-side handle to the engine task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProtocolHandle {
    tx: mpsc::Sender<ProtocolRequest>,
    shutdown: mpsc::Sender<()>,
}

impl ProtocolHandle {
    /// Send a typed command fire-and-forget.
    pub async fn send(&self, command: &EbbCommand) -> Result<()> {
        self.write_raw(command.encode()?).await
    }

    /// Send a raw command string fire-and-forget.
    pub async fn write_raw(&self, data: impl Into<String>) -> Result<()> {
        self.tx
            .send(ProtocolRequest::Write { data: data.into() })
            .await
            .map_err(|_| ProtocolError::EngineStopped.into())
    }

    /// Send a typed command and await its reply.
    pub async fn query(&self, command: &EbbCommand) -> Result<ProtocolResponse> {
        self.query_raw(command.encode()?, command.expected_lines())
            .await
    }

    /// Send a raw command string and await `expected_lines` reply lines.
    pub async fn query_raw(
        &self,
        data: impl Into<String>,
        expected_lines: usize,
    ) -> Result<ProtocolResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProtocolRequest::Query {
                data: data.into(),
                expected_lines,
                correlation_id: Uuid::new_v4().to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| plotkit_core::Error::from(ProtocolError::EngineStopped))?;
        reply_rx
            .await
            .map_err(|_| ProtocolError::EngineStopped.into())
    }

    /// Submit a pre-built request, e.g. a query carrying a
    /// caller-chosen correlation id.
    pub async fn request(&self, request: ProtocolRequest) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| ProtocolError::EngineStopped.into())
    }

    /// Clear the port's I/O buffers.
    pub async fn flush(&self) -> Result<()> {
        self.tx
            .send(ProtocolRequest::Flush)
            .await
            .map_err(|_| ProtocolError::EngineStopped.into())
    }

    /// Ask the engine task to stop after its current pass.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(()).await;
    }
}

/// Spawn the engine task over a port. Returns the caller handle and the
/// task's join handle.
pub fn spawn_engine(port: Box<dyn PlotterPort>) -> (ProtocolHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(STASH_CAPACITY);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let (timer_tx, timer_rx) = mpsc::channel(8);

    let engine = Engine {
        port,
        inbox: rx,
        shutdown: shutdown_rx,
        timer_tx,
        timer_rx,
        stash: VecDeque::new(),
        pending: None,
    };
    let task = tokio::spawn(engine.run());

    (
        ProtocolHandle {
            tx,
            shutdown: shutdown_tx,
        },
        task,
    )
}

struct Engine {
    port: Box<dyn PlotterPort>,
    inbox: mpsc::Receiver<ProtocolRequest>,
    shutdown: mpsc::Receiver<()>,
    timer_tx: mpsc::Sender<Uuid>,
    timer_rx: mpsc::Receiver<Uuid>,
    stash: VecDeque<ProtocolRequest>,
    pending: Option<PendingCommand>,
}

impl Engine {
    async fn run(mut self) {
        let mut buf = [0u8; 256];
        loop {
            if self.shutdown.try_recv().is_ok() {
                // Requests sent before the shutdown signal are already in
                // the inbox; flush them to the wire before stopping.
                while let Ok(request) = self.inbox.try_recv() {
                    self.on_request(request);
                }
                break;
            }

            // Read phase: pull whatever the port has buffered.
            match self.port.read(&mut buf) {
                Ok(n) if n > 0 => self.on_data(&buf[..n]),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("port read error on {}: {}", self.port.name(), e);
                }
            }

            // Timer phase: expire the pending query if its timer fired.
            while let Ok(key) = self.timer_rx.try_recv() {
                self.on_timer(key);
            }

            // Request phase: accept new work.
            loop {
                match self.inbox.try_recv() {
                    Ok(request) => self.on_request(request),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => return self.abandon(),
                }
            }

            tokio::time::sleep(LOOP_DELAY).await;
        }
        self.abandon();
    }

    /// Drop the pending query and stash on the way out so callers see
    /// closed reply channels rather than a silent hang.
    fn abandon(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
        self.stash.clear();
    }

    fn on_request(&mut self, request: ProtocolRequest) {
        if self.pending.is_some() {
            match request {
                ProtocolRequest::Flush => {
                    if let Err(e) = self.port.flush_io() {
                        tracing::warn!("flush failed: {}", e);
                    }
                }
                other => {
                    if self.stash.len() >= STASH_CAPACITY {
                        tracing::warn!("protocol stash full, rejecting request");
                        if let ProtocolRequest::Query {
                            data,
                            correlation_id,
                            reply,
                            ..
                        } = other
                        {
                            let _ = reply.send(ProtocolResponse::Failure {
                                correlation_id,
                                command: data,
                                reason: "queue full".to_string(),
                            });
                        }
                    } else {
                        self.stash.push_back(other);
                    }
                }
            }
            return;
        }
        self.handle_idle(request);
    }

    fn handle_idle(&mut self, request: ProtocolRequest) {
        match request {
            ProtocolRequest::Write { data } => match validate_command(&data) {
                Ok(wire) => self.write_wire(&wire),
                Err(e) => tracing::error!("rejected command {:?}: {}", data, e),
            },
            ProtocolRequest::Query {
                data,
                expected_lines,
                correlation_id,
                reply,
            } => match validate_command(&data) {
                Ok(wire) => {
                    self.write_wire(&wire);
                    let timer_key = Uuid::new_v4();
                    let timer_tx = self.timer_tx.clone();
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(RESPONSE_TIMEOUT).await;
                        let _ = timer_tx.send(timer_key).await;
                    });
                    self.pending = Some(PendingCommand {
                        original: data,
                        expected_lines,
                        reply,
                        buffer: String::new(),
                        correlation_id,
                        timer_key,
                        timer,
                    });
                }
                Err(e) => {
                    let _ = reply.send(ProtocolResponse::Failure {
                        correlation_id,
                        command: data,
                        reason: e.to_string(),
                    });
                }
            },
            ProtocolRequest::Flush => {
                if let Err(e) = self.port.flush_io() {
                    tracing::warn!("flush failed: {}", e);
                }
            }
        }
    }

    fn write_wire(&mut self, wire: &str) {
        tracing::debug!("tx {:?}", wire.trim_end_matches('\r'));
        if let Err(e) = self.port.write_all(wire.as_bytes()) {
            tracing::error!("port write failed on {}: {}", self.port.name(), e);
        }
    }

    fn on_data(&mut self, data: &[u8]) {
        let text = String::from_utf8_lossy(data).replace("\r\n", "\r");
        let payload = match self.pending.as_mut() {
            None => {
                tracing::debug!("discarding {} unsolicited bytes", data.len());
                return;
            }
            Some(pending) => {
                pending.buffer.push_str(&text);
                // All fragments but the last are complete CR-terminated
                // lines.
                let fragments: Vec<&str> = pending.buffer.split('\r').collect();
                if fragments.len() - 1 < pending.expected_lines {
                    return;
                }
                fragments[..pending.expected_lines].join("\r")
            }
        };

        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
            tracing::debug!("rx {:?} for {:?}", payload, pending.original);
            let _ = pending.reply.send(ProtocolResponse::Success {
                correlation_id: pending.correlation_id,
                command: pending.original,
                payload,
            });
        }
        self.drain_stash();
    }

    fn on_timer(&mut self, key: Uuid) {
        let expired = self
            .pending
            .as_ref()
            .map(|p| p.timer_key == key)
            .unwrap_or(false);
        if !expired {
            // A completed query's timer fired late; ignore it.
            return;
        }
        if let Some(pending) = self.pending.take() {
            tracing::warn!(
                "query {:?} timed out with partial reply {:?}",
                pending.original,
                pending.buffer
            );
            let _ = pending.reply.send(ProtocolResponse::Timeout {
                correlation_id: pending.correlation_id,
                command: pending.original,
                partial: pending.buffer,
            });
        }
        self.drain_stash();
    }

    /// FIFO-replay stashed requests until one becomes the new pending
    /// query or the stash runs dry.
    fn drain_stash(&mut self) {
        while self.pending.is_none() {
            let Some(request) = self.stash.pop_front() else {
                break;
            };
            self.handle_idle(request);
        }
    }
}

/// Validate and normalise an outbound command.
///
/// Uppercases, appends the trailing CR if absent, and rejects oversize
/// commands or any byte outside printable ASCII.
fn validate_command(data: &str) -> Result<String> {
    let mut wire = data.to_ascii_uppercase();
    if !wire.ends_with('\r') {
        wire.push('\r');
    }
    if wire.len() > MAX_COMMAND_LEN {
        return Err(ProtocolError::TooLong { len: wire.len() }.into());
    }
    for &byte in wire[..wire.len() - 1].as_bytes() {
        if !(0x21..=0x7E).contains(&byte) {
            return Err(ProtocolError::NonPrintable { byte }.into());
        }
    }
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_normalises_case_and_terminator() {
        assert_eq!(validate_command("qb").unwrap(), "QB\r");
        assert_eq!(validate_command("EM,1,1\r").unwrap(), "EM,1,1\r");
    }

    #[test]
    fn validation_rejects_spaces() {
        let err = validate_command("XM ,100,10,10").unwrap_err();
        assert!(err.to_string().contains("non-ASCII-printable"));
    }

    #[test]
    fn validation_rejects_oversize() {
        let long = "X".repeat(100);
        let err = validate_command(&long).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn validation_rejects_control_bytes() {
        assert!(validate_command("QP\nQP").is_err());
    }
}
