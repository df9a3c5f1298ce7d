//! Session: the live connection plus its single in-flight request.
//!
//! A [`Session`] handle is a thin front over a spawned task that
//! exclusively owns the transport halves, the pending-request slot, and the
//! request deadline. All session state is mutated by that one task, one
//! event at a time: a submission, an inbound frame, a deadline firing, or a
//! disconnect. Callers suspend on [`submit`](Session::submit) until their
//! request completes.
//!
//! # Architecture
//!
//! ```text
//! caller ──► mpsc::Sender<Command> ──► session task ──► FrameWriter ──► store
//!    ▲                                      │
//!    └────── oneshot reply ◄────────────────┴◄── FrameReader ◄── store
//! ```
//!
//! # Correlation
//!
//! The wire carries no request id, so the session enforces strict
//! single-flight: a second submission while one is pending is rejected with
//! [`Busy`](crate::CrdtWireError::Busy). Each timed-out request leaves a
//! stale-response debt; inbound frames pay that debt (and are discarded)
//! before one may resolve the pending slot, so a late reply for a timed-out
//! request is never misrouted to a later request.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{self, Message};
use crate::error::{CrdtWireError, Result};
use crate::protocol::{Frame, DEFAULT_MAX_FRAME_SIZE};
use crate::response::Response;
use crate::transport::{self, split_frames, FrameReader, FrameWriter};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout used by the high-level operations.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on the connection attempt.
    pub connect_timeout: Duration,
    /// Whether to enable `SO_KEEPALIVE` on the connection.
    pub keepalive: bool,
    /// Maximum accepted inbound frame size (code byte + payload).
    pub max_frame_size: u32,
    /// Timeout the high-level operations pass to `submit`;
    /// `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Commands from the handle to the session task.
enum Command {
    Submit {
        message: Message,
        timeout: Option<Duration>,
        reply: oneshot::Sender<Result<Response>>,
    },
    Close,
}

/// The single in-flight request.
struct Pending {
    reply: oneshot::Sender<Result<Response>>,
    timeout: Option<Duration>,
    generation: u64,
}

/// A live session with the store.
///
/// Created by [`connect`](Session::connect); destroyed by
/// [`close`](Session::close), by dropping the handle, or by a transport
/// failure. There is no reconnection: once disconnected, every call fails
/// with [`Disconnected`](crate::CrdtWireError::Disconnected) and a fresh
/// session must be created to retry.
pub struct Session {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
    request_timeout: Option<Duration>,
}

impl Session {
    /// Connect to the store and spawn the session task.
    pub async fn connect(address: &str, port: u16, config: SessionConfig) -> Result<Session> {
        let stream = transport::connect(address, port, &config).await?;
        Ok(Self::spawn(stream, config))
    }

    /// Spawn a session over an already-connected stream.
    pub(crate) fn spawn<S>(stream: S, config: SessionConfig) -> Session
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = split_frames(stream, config.max_frame_size);
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(run(reader, writer, rx));
        Session {
            tx,
            task,
            request_timeout: config.request_timeout,
        }
    }

    /// Submit one message and wait for its response or error.
    ///
    /// With `Some(timeout)`, the request fails with
    /// [`Timeout`](CrdtWireError::Timeout) if no response arrives in time;
    /// the session stays usable. With `None`, the caller waits until a
    /// response, a disconnect, or a send failure.
    ///
    /// # Errors
    ///
    /// [`Busy`](CrdtWireError::Busy) if a request is already in flight;
    /// [`Disconnected`](CrdtWireError::Disconnected) if the session has
    /// terminated; otherwise whatever the request itself produced.
    pub async fn submit(&self, message: Message, timeout: Option<Duration>) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Submit {
                message,
                timeout,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CrdtWireError::Disconnected)?;
        reply_rx.await.map_err(|_| CrdtWireError::Disconnected)?
    }

    /// Close the session and wait for the task to finish.
    ///
    /// A request pending at close time resolves with
    /// [`Disconnected`](CrdtWireError::Disconnected).
    pub async fn close(self) {
        let _ = self.tx.send(Command::Close).await;
        let _ = self.task.await;
    }

    /// Whether the session task has terminated.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// The timeout the high-level operations use for their submissions.
    pub(crate) fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

/// The session task: serializes every event touching session state.
async fn run<S>(
    mut reader: FrameReader<S>,
    mut writer: FrameWriter<S>,
    mut rx: mpsc::Receiver<Command>,
) where
    S: AsyncRead + AsyncWrite,
{
    let mut pending: Option<Pending> = None;
    let mut generation: u64 = 0;
    let mut stale_responses: u64 = 0;

    let deadline = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(deadline);
    let mut deadline_armed = false;

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Submit { message, timeout, reply }) => {
                    if pending.is_some() {
                        let _ = reply.send(Err(CrdtWireError::Busy));
                        continue;
                    }

                    let (code, payload) = match codec::encode_message(&message) {
                        Ok(encoded) => encoded,
                        Err(e) => {
                            let _ = reply.send(Err(e));
                            continue;
                        }
                    };

                    if let Err(e) = writer.send(code, &payload).await {
                        // Send failure is fatal; the caller observes the
                        // error before the session terminates.
                        tracing::error!(error = %e, "send failed, terminating session");
                        let _ = reply.send(Err(e));
                        return;
                    }

                    generation += 1;
                    if let Some(t) = timeout {
                        deadline.as_mut().reset(tokio::time::Instant::now() + t);
                        deadline_armed = true;
                    }
                    tracing::debug!(generation, code, "request in flight");
                    pending = Some(Pending { reply, timeout, generation });
                }
                Some(Command::Close) | None => {
                    if let Some(p) = pending.take() {
                        let _ = p.reply.send(Err(CrdtWireError::Disconnected));
                    }
                    tracing::debug!("session closed");
                    return;
                }
            },

            read = reader.read_chunk() => match read {
                Ok(frames) => {
                    for frame in frames {
                        on_frame(frame, &mut pending, &mut stale_responses, &mut deadline_armed);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "transport closed");
                    if let Some(p) = pending.take() {
                        let _ = p.reply.send(Err(CrdtWireError::Disconnected));
                    }
                    return;
                }
            },

            () = &mut deadline, if deadline_armed => {
                deadline_armed = false;
                if let Some(p) = pending.take() {
                    // The reply may still arrive; remember to discard it.
                    stale_responses += 1;
                    tracing::debug!(generation = p.generation, "request timed out");
                    let elapsed = p.timeout.unwrap_or_default();
                    let _ = p.reply.send(Err(CrdtWireError::Timeout(elapsed)));
                }
            },
        }
    }
}

/// Handle one inbound frame against the pending slot.
fn on_frame(
    frame: Frame,
    pending: &mut Option<Pending>,
    stale_responses: &mut u64,
    deadline_armed: &mut bool,
) {
    if *stale_responses > 0 {
        *stale_responses -= 1;
        tracing::debug!(code = frame.code(), "discarding reply for a timed-out request");
        return;
    }

    match pending.take() {
        Some(p) => {
            // Clearing the slot cancels the deadline with it.
            *deadline_armed = false;
            let result =
                codec::decode_response(frame.code(), frame.payload()).map(Response::from_wire);
            if let Err(e) = &result {
                tracing::warn!(code = frame.code(), error = %e, "undecodable response");
            }
            tracing::debug!(generation = p.generation, code = frame.code(), "request resolved");
            let _ = p.reply.send(result);
        }
        None => {
            tracing::warn!(code = frame.code(), "unsolicited frame, dropping");
        }
    }
}
