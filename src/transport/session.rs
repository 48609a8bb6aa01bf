//! Socket session and its I/O loops.
//!
//! A [`Session`] owns one opened transport. It spawns two tokio tasks that
//! share a single unbounded outgoing queue:
//!
//! - **Write loop**: sends the handshake, then drains the queue
//! - **Read loop**: reads frames and dispatches them by opcode
//!
//! Whichever loop stops first cancels the other. Once both have stopped the
//! queue is closed, the transport is shut down and exactly one
//! [`SessionEvent::Closed`] is emitted. A session is never reopened.
//!
//! # Dispatch
//!
//! | Opcode | Action |
//! |--------|--------|
//! | `Message` | `READY` dispatch → [`SessionEvent::Ready`]; `ERROR` event → logged |
//! | `Close` | error body logged, read loop ends |
//! | `Ping` | payload echoed back as `Pong` |
//! | `Pong` | ignored |
//! | other | protocol violation, read loop ends |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::activity::Activity;
use crate::error::{Error, Result};
use crate::identifiers::{ClientId, SessionId};
use crate::protocol::{
    CommandArgs, Frame, Handshake, IncomingMessage, Opcode, OutgoingMessage, RpcError,
    SetActivityArgs, read_frame, write_frame,
};

use super::discovery::Transport;

// ============================================================================
// SessionEvent
// ============================================================================

/// Notification from a session to its owner.
///
/// Events carry the session id so the owner can discard events from a
/// session it no longer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The peer dispatched `READY` and accepts updates.
    Ready(SessionId),
    /// Both loops stopped and the transport is closed.
    Closed(SessionId),
}

impl SessionEvent {
    /// Returns the id of the emitting session.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Ready(id) | Self::Closed(id) => *id,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// One live connection to the peer.
///
/// Cheap to clone; all clones refer to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Process-unique id.
    id: SessionId,
    /// Outgoing queue drained by the write loop.
    outgoing: mpsc::UnboundedSender<Frame>,
    /// Cancelled when shutdown begins.
    shutdown: CancellationToken,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Starts a session over an opened transport.
    ///
    /// The handshake for `client_id` is the first frame written. Events are
    /// delivered on `events`; cancelling `shutdown` closes the session.
    /// The I/O tasks run on `runtime`.
    pub fn spawn(
        runtime: &Handle,
        client_id: ClientId,
        transport: Transport,
        events: mpsc::UnboundedSender<SessionEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let id = SessionId::next();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        runtime.spawn(Self::run(
            runtime.clone(),
            id,
            client_id,
            transport,
            outgoing_tx.clone(),
            outgoing_rx,
            shutdown.clone(),
            events,
        ));

        debug!(session_id = %id, "Session started");

        Self {
            inner: Arc::new(SessionInner {
                id,
                outgoing: outgoing_tx,
                shutdown,
            }),
        }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns `true` once shutdown has begun.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Queues a command for the peer.
    ///
    /// Returns `false` if the session is shutting down. Delivery is
    /// best-effort and at most once.
    pub fn send<T: CommandArgs>(&self, args: T) -> bool {
        let message = OutgoingMessage::new(args);
        match Frame::json(Opcode::Message, &message) {
            Ok(frame) => {
                debug!(session_id = %self.inner.id, cmd = message.cmd, "Queueing message");
                self.enqueue(frame)
            }
            Err(e) => {
                warn!(session_id = %self.inner.id, error = %e, "Failed to encode message");
                false
            }
        }
    }

    /// Queues a `SET_ACTIVITY` command for this process.
    ///
    /// `None` clears the presence.
    pub fn send_activity(&self, activity: Option<&Activity>) -> bool {
        self.send(SetActivityArgs {
            pid: std::process::id(),
            activity,
        })
    }

    /// Requests shutdown. Idempotent.
    ///
    /// [`SessionEvent::Closed`] follows once both loops have stopped.
    pub fn close(&self) {
        if !self.inner.shutdown.is_cancelled() {
            debug!(session_id = %self.inner.id, "Session close requested");
        }
        self.inner.shutdown.cancel();
    }

    /// Pushes a frame onto the outgoing queue.
    fn enqueue(&self, frame: Frame) -> bool {
        if self.inner.shutdown.is_cancelled() {
            return false;
        }
        self.inner.outgoing.send(frame).is_ok()
    }
}

// ============================================================================
// Session - Loops
// ============================================================================

impl Session {
    /// Drives both loops and tears the session down.
    async fn run(
        runtime: Handle,
        id: SessionId,
        client_id: ClientId,
        transport: Transport,
        outgoing_tx: mpsc::UnboundedSender<Frame>,
        outgoing_rx: mpsc::UnboundedReceiver<Frame>,
        shutdown: CancellationToken,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) {
        let (reader, writer) = tokio::io::split(transport);

        let read = runtime.spawn(Self::read_loop(
            id,
            reader,
            outgoing_tx,
            shutdown.clone(),
            events.clone(),
        ));
        let write = runtime.spawn(Self::write_loop(
            id,
            client_id,
            writer,
            outgoing_rx,
            shutdown.clone(),
        ));

        let (read, write) = tokio::join!(read, write);
        shutdown.cancel();

        if let Err(e) = read {
            error!(session_id = %id, error = %e, "Read loop panicked");
        }

        match write {
            Ok((mut writer, mut outgoing)) => {
                outgoing.close();
                if let Err(e) = writer.shutdown().await {
                    trace!(session_id = %id, error = %e, "Transport shutdown failed");
                }
            }
            Err(e) => error!(session_id = %id, error = %e, "Write loop panicked"),
        }

        debug!(session_id = %id, "Closed connection");
        let _ = events.send(SessionEvent::Closed(id));
    }

    /// Reads and dispatches frames until the peer closes, an error occurs or
    /// shutdown is requested.
    async fn read_loop(
        id: SessionId,
        mut reader: ReadHalf<Transport>,
        outgoing: mpsc::UnboundedSender<Frame>,
        shutdown: CancellationToken,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) {
        let result = tokio::select! {
            _ = shutdown.cancelled() => Ok(()),
            result = Self::read_frames(id, &mut reader, &outgoing, &events) => result,
        };

        match result {
            Ok(()) => trace!(session_id = %id, "Read loop stopped"),
            Err(Error::ChannelClosed) => debug!(session_id = %id, "Connection closed by peer"),
            Err(Error::RemoteError { code, message }) => {
                error!(session_id = %id, code, %message, "Peer closed the connection with an error");
            }
            Err(e) => {
                error!(session_id = %id, error = %e, "Error while reading, closing the connection");
            }
        }

        shutdown.cancel();
    }

    /// The read loop body.
    async fn read_frames(
        id: SessionId,
        reader: &mut ReadHalf<Transport>,
        outgoing: &mpsc::UnboundedSender<Frame>,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<()> {
        loop {
            let frame = read_frame(reader).await?;

            match frame.kind()? {
                Opcode::Message => {
                    let message: IncomingMessage = serde_json::from_slice(&frame.payload)?;
                    debug!(
                        session_id = %id,
                        cmd = %message.cmd,
                        evt = ?message.evt,
                        "Received message"
                    );

                    if message.is_error() {
                        let err = message.error()?;
                        error!(session_id = %id, code = err.code, message = %err.message, "Received error");
                    } else if message.is_ready() {
                        let _ = events.send(SessionEvent::Ready(id));
                    }
                }

                Opcode::Close => {
                    let err: RpcError = serde_json::from_slice(&frame.payload)?;
                    return Err(err.into());
                }

                Opcode::Ping => {
                    trace!(session_id = %id, "Responding to PING");
                    let pong = Frame {
                        opcode: Opcode::Pong.as_i32(),
                        payload: frame.payload,
                    };
                    outgoing.send(pong).map_err(|_| Error::ChannelClosed)?;
                }

                Opcode::Pong => trace!(session_id = %id, "Received PONG"),

                Opcode::Handshake => {
                    return Err(Error::protocol_violation("unexpected handshake from peer"));
                }
            }
        }
    }

    /// Writes the handshake and then queued frames until shutdown.
    ///
    /// Hands the writer and queue back so the driver can close both.
    async fn write_loop(
        id: SessionId,
        client_id: ClientId,
        mut writer: WriteHalf<Transport>,
        mut outgoing: mpsc::UnboundedReceiver<Frame>,
        shutdown: CancellationToken,
    ) -> (WriteHalf<Transport>, mpsc::UnboundedReceiver<Frame>) {
        let result = tokio::select! {
            _ = shutdown.cancelled() => Ok(()),
            result = Self::write_frames(id, client_id, &mut writer, &mut outgoing) => result,
        };

        match result {
            Ok(()) => trace!(session_id = %id, "Write loop stopped"),
            Err(Error::ChannelClosed) => debug!(session_id = %id, "Connection closed while writing"),
            Err(e) => {
                error!(session_id = %id, error = %e, "Error while writing, closing the connection");
            }
        }

        shutdown.cancel();
        (writer, outgoing)
    }

    /// The write loop body.
    async fn write_frames(
        id: SessionId,
        client_id: ClientId,
        writer: &mut WriteHalf<Transport>,
        outgoing: &mut mpsc::UnboundedReceiver<Frame>,
    ) -> Result<()> {
        debug!(session_id = %id, %client_id, "Sending handshake");
        let handshake = Frame::json(Opcode::Handshake, &Handshake::new(client_id))?;
        write_frame(writer, &handshake).await?;

        while let Some(frame) = outgoing.recv().await {
            write_frame(writer, &frame).await?;
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
