//! Codec boundary - serialization/deserialization for message payloads.
//!
//! The session treats payload bytes as opaque; this module owns the mapping
//! between typed messages and the wire:
//!
//! - [`encode_message`] / [`decode_message`] - outbound requests
//! - [`encode_response`] / [`decode_response`] - inbound responses
//! - [`MsgPackCodec`] - the underlying MessagePack codec (`rmp-serde`,
//!   struct-as-map via `to_vec_named`)
//!
//! # Example
//!
//! ```
//! use crdtwire::codec::{decode_message, encode_message, Message};
//! use crdtwire::types::UpdateOperation;
//!
//! let message = Message::update(UpdateOperation::Increment {
//!     key: "hits".to_string(),
//!     amount: 1,
//! });
//! let (code, payload) = encode_message(&message).unwrap();
//! assert_eq!(decode_message(code, &payload).unwrap(), message);
//! ```

mod message;
mod msgpack;

pub use message::{
    decode_message, decode_response, encode_message, encode_response, Message, WireReadResult,
    WireResponse,
};
pub use msgpack::MsgPackCodec;
