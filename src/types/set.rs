//! Set data type.
//!
//! A set of binary elements. Local `add`/`remove` calls are buffered and
//! flushed as a single `SetUpdate` operation. The value the store returns
//! for a set is an opaque blob at the session layer; only this type knows
//! how to decode it (a MessagePack array of binary elements).

use std::collections::BTreeSet;

use serde_bytes::ByteBuf;

use super::{CrdtKind, CrdtObject, UpdateOperation};
use crate::codec::MsgPackCodec;
use crate::error::Result;

/// A replicated set of binary elements.
///
/// # Example
///
/// ```
/// use crdtwire::types::{CrdtObject, RwSet};
///
/// let mut set = RwSet::new("post:tags");
/// set.add(b"rust".to_vec());
/// set.add(b"crdt".to_vec());
/// set.remove(b"draft".to_vec());
/// assert_eq!(set.to_operations().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RwSet {
    key: String,
    elements: BTreeSet<Vec<u8>>,
    adds: Vec<Vec<u8>>,
    removes: Vec<Vec<u8>>,
}

impl RwSet {
    /// Create an empty set under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            elements: BTreeSet::new(),
            adds: Vec::new(),
            removes: Vec::new(),
        }
    }

    /// Reconstruct a set from the opaque value blob returned by a read.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the blob is not a MessagePack array of
    /// binary elements.
    pub fn from_value(key: impl Into<String>, blob: &[u8]) -> Result<Self> {
        let elements: Vec<ByteBuf> = MsgPackCodec::decode(blob)?;
        Ok(Self {
            key: key.into(),
            elements: elements.into_iter().map(ByteBuf::into_vec).collect(),
            adds: Vec::new(),
            removes: Vec::new(),
        })
    }

    /// Encode a list of elements into the opaque value blob a read returns.
    ///
    /// Inverse of [`from_value`](RwSet::from_value); servers and test
    /// doubles use this to produce `SetValue` payloads.
    pub fn encode_value(elements: &[Vec<u8>]) -> Result<Vec<u8>> {
        let elements: Vec<&serde_bytes::Bytes> = elements
            .iter()
            .map(|e| serde_bytes::Bytes::new(e))
            .collect();
        MsgPackCodec::encode(&elements)
    }

    /// The key this set lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Buffer the addition of an element.
    pub fn add(&mut self, element: impl Into<Vec<u8>>) {
        self.adds.push(element.into());
    }

    /// Buffer the removal of an element.
    pub fn remove(&mut self, element: impl Into<Vec<u8>>) {
        self.removes.push(element.into());
    }

    /// Whether the reconstructed state contains `element`.
    pub fn contains(&self, element: &[u8]) -> bool {
        self.elements.contains(element)
    }

    /// The reconstructed elements, in lexicographic order.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        self.elements.iter().map(Vec::as_slice)
    }

    /// Number of elements in the reconstructed state.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the reconstructed state is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether any local updates are buffered.
    pub fn is_dirty(&self) -> bool {
        !self.adds.is_empty() || !self.removes.is_empty()
    }
}

impl CrdtObject for RwSet {
    fn key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> CrdtKind {
        CrdtKind::Set
    }

    fn to_operations(&self) -> Vec<UpdateOperation> {
        if !self.is_dirty() {
            return Vec::new();
        }
        vec![UpdateOperation::SetUpdate {
            key: self.key.clone(),
            adds: self.adds.clone(),
            removes: self.removes.clone(),
        }]
    }
}
