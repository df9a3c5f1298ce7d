//! Error types for crdtwire.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all crdtwire operations.
///
/// Transport-fatal errors ([`Send`](CrdtWireError::Send),
/// [`Disconnected`](CrdtWireError::Disconnected)) terminate the session;
/// every other variant leaves the session usable.
#[derive(Debug, Error)]
pub enum CrdtWireError {
    /// Connection to the store could not be established.
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Connection attempt did not complete within the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Write failure on the transport. Fatal: the session is terminated.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// No matching response arrived within the request deadline.
    /// Request-local: the session remains usable.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The remote closed the connection, or the session was closed while a
    /// request was pending. Fatal: no further submissions are accepted.
    #[error("session disconnected")]
    Disconnected,

    /// A request is already in flight on this session.
    #[error("a request is already in flight")]
    Busy,

    /// MsgPack serialization error while encoding an outbound message.
    #[error("MsgPack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error while decoding an inbound payload.
    #[error("MsgPack decode error: {0}")]
    DecodeFailed(#[from] rmp_serde::decode::Error),

    /// Protocol error (malformed frame, oversized payload, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A well-formed frame that does not match what the request expects
    /// (unknown message code, wrong response shape). Non-fatal.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A well-formed response whose success flag is false (rejected
    /// operation or aborted transaction).
    #[error("server reported failure: {0}")]
    Application(String),

    /// I/O error outside the connect/send paths.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrdtWireError {
    /// Whether this error terminates the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrdtWireError::Send(_) | CrdtWireError::Disconnected)
    }
}

/// Result type alias using CrdtWireError.
pub type Result<T> = std::result::Result<T, CrdtWireError>;
