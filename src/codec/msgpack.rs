//! MsgPack codec using `rmp-serde`.
//!
//! Always uses `to_vec_named` so structs serialize as maps with field
//! names rather than positional arrays. The store's payloads are
//! self-describing maps; positional encoding would not survive field
//! reordering between versions.
//!
//! # Example
//!
//! ```
//! use crdtwire::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Payload {
//!     key: String,
//!     amount: u64,
//! }
//!
//! let payload = Payload { key: "visits".to_string(), amount: 3 };
//! let encoded = MsgPackCodec::encode(&payload).unwrap();
//! let decoded: Payload = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, payload);
//! ```

use crate::error::Result;

/// MessagePack codec for structured payloads.
///
/// Uses `rmp_serde::to_vec_named` for struct-as-map format.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
