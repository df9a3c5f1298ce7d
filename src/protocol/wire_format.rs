//! Wire format encoding and decoding.
//!
//! Implements the length-prefixed frame layout:
//! ```text
//! ┌──────────┬──────────┬─────────────┐
//! │ Length   │ Code     │ Payload     │
//! │ 4 bytes  │ 1 byte   │ N bytes     │
//! │ uint32 BE│          │             │
//! └──────────┴──────────┴─────────────┘
//! ```
//!
//! The length covers the code byte plus the payload, so it is always at
//! least 1. All multi-byte integers are Big Endian.

use crate::error::{CrdtWireError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum frame size (16 MiB, code byte + payload).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Message-type codes for the store protocol.
///
/// Request codes occupy `0x01..=0x07`; response codes mirror them with the
/// [`RESPONSE_BIT`](codes::RESPONSE_BIT) set.
pub mod codes {
    /// Bit set on every response code.
    pub const RESPONSE_BIT: u8 = 0x80;

    /// Increment a counter.
    pub const INCREMENT: u8 = 0x01;
    /// Decrement a counter.
    pub const DECREMENT: u8 = 0x02;
    /// Add/remove elements of a set.
    pub const SET_UPDATE: u8 = 0x03;
    /// Read a counter value.
    pub const GET_COUNTER: u8 = 0x04;
    /// Read a set value.
    pub const GET_SET: u8 = 0x05;
    /// Atomic multi-operation update envelope.
    pub const ATOMIC_UPDATE: u8 = 0x06;
    /// Consistent multi-key read envelope.
    pub const SNAPSHOT_READ: u8 = 0x07;

    /// Success/failure acknowledgment for a single update.
    pub const OPERATION_RESULT: u8 = 0x81;
    /// Counter read reply.
    pub const COUNTER_VALUE: u8 = 0x82;
    /// Set read reply (opaque element blob).
    pub const SET_VALUE: u8 = 0x83;
    /// Atomic update outcome with commit clock.
    pub const ATOMIC_UPDATE_RESULT: u8 = 0x84;
    /// Snapshot read outcome with clock and ordered sub-results.
    pub const SNAPSHOT_READ_RESULT: u8 = 0x85;

    /// Check if a code is a response code.
    #[inline]
    pub fn is_response(code: u8) -> bool {
        code & RESPONSE_BIT != 0
    }
}

/// Encode a length prefix for a frame carrying `payload_len` payload bytes.
///
/// The encoded length includes the code byte.
///
/// # Example
///
/// ```
/// use crdtwire::protocol::encode_prefix;
///
/// let prefix = encode_prefix(4);
/// assert_eq!(prefix, [0, 0, 0, 5]);
/// ```
#[inline]
pub fn encode_prefix(payload_len: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    (payload_len + 1).to_be_bytes()
}

/// Decode a length prefix. Returns `None` if the buffer is too short.
#[inline]
pub fn decode_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Validate a decoded frame length against protocol limits.
///
/// Checks:
/// - Length is not 0 (every frame carries at least the code byte)
/// - Length doesn't exceed `max_frame_size`
pub fn validate_length(length: u32, max_frame_size: u32) -> Result<()> {
    if length == 0 {
        return Err(CrdtWireError::Protocol(
            "frame length 0 is invalid, a frame carries at least a code byte".to_string(),
        ));
    }

    if length > max_frame_size {
        return Err(CrdtWireError::Protocol(format!(
            "frame length {} exceeds maximum {}",
            length, max_frame_size
        )));
    }

    Ok(())
}
