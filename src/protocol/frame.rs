//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame: one message-type code plus its
//! payload. Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use crdtwire::protocol::{codes, Frame};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(codes::COUNTER_VALUE, Bytes::from_static(b"\x05"));
//! assert_eq!(frame.code(), codes::COUNTER_VALUE);
//! assert!(frame.is_response());
//! ```

use bytes::Bytes;

use super::wire_format::{codes, encode_prefix, LENGTH_PREFIX_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Message-type code.
    pub code: u8,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from code and payload.
    pub fn new(code: u8, payload: Bytes) -> Self {
        Self { code, payload }
    }

    /// Create a frame from code and raw bytes (copies data).
    pub fn from_parts(code: u8, payload: &[u8]) -> Self {
        Self {
            code,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the message-type code.
    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Check if this frame carries a response code.
    #[inline]
    pub fn is_response(&self) -> bool {
        codes::is_response(self.code)
    }
}

/// Build a complete frame as a single byte vector.
///
/// Encodes the length prefix, the code byte, and the payload into one
/// contiguous buffer ready for the wire.
///
/// # Example
///
/// ```
/// use crdtwire::protocol::{build_frame, codes, LENGTH_PREFIX_SIZE};
///
/// let bytes = build_frame(codes::INCREMENT, b"hello");
/// assert_eq!(bytes.len(), LENGTH_PREFIX_SIZE + 1 + 5);
/// ```
pub fn build_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + 1 + payload.len());
    buf.extend_from_slice(&encode_prefix(payload.len() as u32));
    buf.push(code);
    buf.extend_from_slice(payload);
    buf
}
