//! Dispatcher actor: request/response correlation and session routing.
//!
//! The dispatcher is the single owner of the packet-id counter, the pending
//! request map and the sessions table. Everything that touches that state
//! arrives as a [`Command`] on its channel, so no locking is needed and
//! packet ids are unique by construction.

use crate::client::pipeline::TxMessage;
use crate::error::{Error, Result};
use crate::pdu::{Frame, Header, Pdu};
use crate::session::SessionCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Commands accepted by the dispatcher.
pub(crate) enum Command {
    /// Stamp a packet id onto the frame, remember the reply slot, forward
    /// to the transmitter.
    Request {
        frame: Frame,
        reply: oneshot::Sender<Frame>,
    },
    /// A frame arrived from the master.
    Inbound { header: Header, pdu: Pdu },
    /// Route master-initiated PDUs for `id` to this session.
    AddSession { id: u32, core: Arc<SessionCore> },
    /// The session closed; stop routing to it.
    RemoveSession { id: u32 },
    /// The receiver established a fresh connection; replay sessions.
    Reconnected,
    /// A session finished replaying Open and holds a new id.
    SessionReopened { old_id: u32, new_id: u32 },
}

/// Cloneable handle used by sessions and the client to reach the
/// dispatcher.
#[derive(Clone)]
pub(crate) struct DispatchHandle {
    cmd_tx: mpsc::Sender<Command>,
    timeout: Option<Duration>,
}

impl DispatchHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<Command>, timeout: Option<Duration>) -> Self {
        Self { cmd_tx, timeout }
    }

    /// The configured session timeout, if any.
    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) async fn send(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| Error::Closed.boxed())
    }

    /// Issue a request and wait for the correlated response.
    ///
    /// The wait is bounded by the configured timeout; without one a lost
    /// response blocks until the client closes.
    pub(crate) async fn request(&self, frame: Frame) -> Result<Frame> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Request {
            frame,
            reply: reply_tx,
        })
        .await?;

        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, reply_rx).await {
                Ok(response) => response,
                Err(_) => return Err(Error::Timeout { elapsed: limit }.boxed()),
            },
            None => reply_rx.await,
        };
        response.map_err(|_| Error::Closed.boxed())
    }
}

/// Dispatcher task.
///
/// `handle` is a loopback handle used to run session replays after a
/// reconnect; the replay issues ordinary requests, so it must run off the
/// dispatcher task while this loop keeps serving.
pub(crate) async fn run_dispatcher(
    mut rx: mpsc::Receiver<Command>,
    handle: DispatchHandle,
    out_tx: mpsc::Sender<TxMessage>,
    token: CancellationToken,
) {
    let mut next_packet_id: u32 = 0;
    let mut pending: HashMap<u32, oneshot::Sender<Frame>> = HashMap::new();
    let mut sessions: HashMap<u32, Arc<SessionCore>> = HashMap::new();

    loop {
        let command = tokio::select! {
            _ = token.cancelled() => break,
            command = rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::Request { mut frame, reply } => {
                frame.header.packet_id = next_packet_id;
                pending.insert(next_packet_id, reply);
                next_packet_id = next_packet_id.wrapping_add(1);
                if out_tx.send(TxMessage::Frame(frame)).await.is_err() {
                    break;
                }
            }

            Command::Inbound { header, pdu } => {
                if let Some(reply) = pending.remove(&header.packet_id) {
                    // Receiver dropped means the requester gave up (timeout);
                    // the late response is discarded.
                    let _ = reply.send(Frame::new(header, pdu));
                } else if let Some(session) = sessions.get(&header.session_id) {
                    let response = session.handle_frame(&header, &pdu);
                    if out_tx.send(TxMessage::Frame(response)).await.is_err() {
                        break;
                    }
                } else {
                    tracing::warn!(
                        target: "async_agentx::dispatch",
                        packet_type = %header.ty,
                        session_id = header.session_id,
                        packet_id = header.packet_id,
                        awaiting_responses = pending.len(),
                        "got packet without session",
                    );
                }
            }

            Command::AddSession { id, core } => {
                sessions.insert(id, core);
            }

            Command::RemoveSession { id } => {
                sessions.remove(&id);
            }

            Command::Reconnected => {
                let snapshot: Vec<Arc<SessionCore>> = sessions.values().cloned().collect();
                let handle = handle.clone();
                tokio::spawn(async move {
                    for core in snapshot {
                        let old_id = core.session_id();
                        match core.reopen().await {
                            Ok(()) => {
                                let _ = handle
                                    .send(Command::SessionReopened {
                                        old_id,
                                        new_id: core.session_id(),
                                    })
                                    .await;
                            }
                            Err(err) => {
                                tracing::error!(
                                    target: "async_agentx::dispatch",
                                    session_id = old_id,
                                    error = %err,
                                    "re-open error",
                                );
                                return;
                            }
                        }
                    }
                    tracing::info!(target: "async_agentx::dispatch", "re-connect successful");
                });
            }

            Command::SessionReopened { old_id, new_id } => {
                if let Some(core) = sessions.remove(&old_id) {
                    sessions.insert(new_id, core);
                }
            }
        }
    }
}
