//! Wire protocol: length-prefixed binary framing.
//!
//! Every exchange with the store is one frame:
//!
//! ```text
//! [4-byte big-endian length][1-byte message-type code][payload]
//! ```
//!
//! The length counts the code byte plus the payload. The payload format per
//! message type is defined by the [`codec`](crate::codec) boundary and is
//! opaque at this layer.
//!
//! # Key components
//!
//! - [`Frame`]: a decoded frame (code + payload)
//! - [`FrameBuffer`]: incremental parser handling fragmented reads
//! - [`codes`]: the message-type code table

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    codes, decode_prefix, encode_prefix, validate_length, DEFAULT_MAX_FRAME_SIZE,
    LENGTH_PREFIX_SIZE,
};
