//! Replicated data types and their primitive operations.
//!
//! Application-level objects ([`Counter`], [`RwSet`]) buffer local updates
//! and convert them into primitive operations for the wire
//! ([`CrdtObject::to_operations`]); reads reconstruct an object from the
//! value the store returns (`from_value` on each type).
//!
//! Write-side and read-side primitives are separate enums, so an atomic
//! update envelope cannot carry a read and a snapshot envelope cannot carry
//! a write.

mod counter;
mod set;

pub use counter::Counter;
pub use set::RwSet;

/// The data-type kinds the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrdtKind {
    /// A PN-counter: concurrent increments and decrements merge by summing.
    Counter,
    /// A set of binary elements with add/remove updates.
    Set,
}

impl CrdtKind {
    /// Human-readable name of the reply this kind expects, for error text.
    pub(crate) fn reply_name(&self) -> &'static str {
        match self {
            CrdtKind::Counter => "CounterValue",
            CrdtKind::Set => "SetValue",
        }
    }
}

/// A write-side primitive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOperation {
    /// Increase a counter by `amount`.
    Increment { key: String, amount: u64 },
    /// Decrease a counter by `amount`.
    Decrement { key: String, amount: u64 },
    /// Add and remove elements of a set in one step.
    SetUpdate {
        key: String,
        adds: Vec<Vec<u8>>,
        removes: Vec<Vec<u8>>,
    },
}

impl UpdateOperation {
    /// The key this operation targets.
    pub fn key(&self) -> &str {
        match self {
            UpdateOperation::Increment { key, .. } => key,
            UpdateOperation::Decrement { key, .. } => key,
            UpdateOperation::SetUpdate { key, .. } => key,
        }
    }
}

/// A read-side primitive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOperation {
    /// Read a counter value.
    Counter { key: String },
    /// Read a set value.
    Set { key: String },
}

impl ReadOperation {
    /// Build the read primitive for a (key, kind) pair.
    pub fn new(kind: CrdtKind, key: impl Into<String>) -> Self {
        match kind {
            CrdtKind::Counter => ReadOperation::Counter { key: key.into() },
            CrdtKind::Set => ReadOperation::Set { key: key.into() },
        }
    }

    /// The key this operation targets.
    pub fn key(&self) -> &str {
        match self {
            ReadOperation::Counter { key } => key,
            ReadOperation::Set { key } => key,
        }
    }

    /// The kind this operation reads.
    pub fn kind(&self) -> CrdtKind {
        match self {
            ReadOperation::Counter { .. } => CrdtKind::Counter,
            ReadOperation::Set { .. } => CrdtKind::Set,
        }
    }
}

/// An application-level object that can be written to the store.
pub trait CrdtObject {
    /// The key this object lives under.
    fn key(&self) -> &str;

    /// The data-type kind of this object.
    fn kind(&self) -> CrdtKind;

    /// Convert buffered local updates into primitive operations,
    /// in application order. Empty when there is nothing to write.
    fn to_operations(&self) -> Vec<UpdateOperation>;
}

/// A heterogeneous object, for multi-object operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// A counter object.
    Counter(Counter),
    /// A set object.
    Set(RwSet),
}

impl Object {
    /// Borrow the counter inside, if this is one.
    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Object::Counter(counter) => Some(counter),
            Object::Set(_) => None,
        }
    }

    /// Borrow the set inside, if this is one.
    pub fn as_set(&self) -> Option<&RwSet> {
        match self {
            Object::Counter(_) => None,
            Object::Set(set) => Some(set),
        }
    }
}

impl CrdtObject for Object {
    fn key(&self) -> &str {
        match self {
            Object::Counter(counter) => counter.key(),
            Object::Set(set) => set.key(),
        }
    }

    fn kind(&self) -> CrdtKind {
        match self {
            Object::Counter(_) => CrdtKind::Counter,
            Object::Set(_) => CrdtKind::Set,
        }
    }

    fn to_operations(&self) -> Vec<UpdateOperation> {
        match self {
            Object::Counter(counter) => counter.to_operations(),
            Object::Set(set) => set.to_operations(),
        }
    }
}
