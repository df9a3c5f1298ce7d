//! Wire message vocabulary and the operation encoder.
//!
//! One [`Message`] variant per outbound code, one [`WireResponse`] variant
//! per inbound code. Payloads are MessagePack maps built from the private
//! payload structs in this module; the rest of the crate never sees raw
//! payload bytes.
//!
//! The operation-encoder constructors keep the envelope invariants: a
//! single write maps to its own message, multi-operation calls concatenate
//! operations in caller order into one envelope, and a causal clock is
//! attached only when explicitly supplied.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::{CrdtWireError, Result};
use crate::protocol::codes;
use crate::response::Clock;
use crate::types::{ReadOperation, UpdateOperation};

use super::MsgPackCodec;

/// An outbound wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A single write primitive.
    Update(UpdateOperation),
    /// A single read primitive.
    Read(ReadOperation),
    /// Atomic multi-operation update envelope.
    AtomicUpdate {
        operations: Vec<UpdateOperation>,
        clock: Option<Clock>,
    },
    /// Consistent multi-key read envelope.
    SnapshotRead {
        operations: Vec<ReadOperation>,
        clock: Option<Clock>,
    },
}

impl Message {
    /// A single write maps directly to its own message.
    pub fn update(operation: UpdateOperation) -> Self {
        Message::Update(operation)
    }

    /// A single read maps directly to its own message.
    pub fn read(operation: ReadOperation) -> Self {
        Message::Read(operation)
    }

    /// Bundle write operations, in caller order, into one atomic envelope.
    ///
    /// The clock is attached only when supplied; `None` means "ignore",
    /// never a zero clock.
    pub fn atomic_update(operations: Vec<UpdateOperation>, clock: Option<Clock>) -> Self {
        Message::AtomicUpdate { operations, clock }
    }

    /// Bundle read operations, in caller order, into one snapshot envelope.
    pub fn snapshot_read(operations: Vec<ReadOperation>, clock: Option<Clock>) -> Self {
        Message::SnapshotRead { operations, clock }
    }

    /// The message-type code this message travels under.
    pub fn code(&self) -> u8 {
        match self {
            Message::Update(UpdateOperation::Increment { .. }) => codes::INCREMENT,
            Message::Update(UpdateOperation::Decrement { .. }) => codes::DECREMENT,
            Message::Update(UpdateOperation::SetUpdate { .. }) => codes::SET_UPDATE,
            Message::Read(ReadOperation::Counter { .. }) => codes::GET_COUNTER,
            Message::Read(ReadOperation::Set { .. }) => codes::GET_SET,
            Message::AtomicUpdate { .. } => codes::ATOMIC_UPDATE,
            Message::SnapshotRead { .. } => codes::SNAPSHOT_READ,
        }
    }
}

/// An inbound wire response, decoded from code + payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireResponse {
    /// Success/failure acknowledgment for a single update.
    OperationResult { success: bool },
    /// Counter read reply.
    CounterValue { value: i64 },
    /// Set read reply: an opaque element blob.
    SetValue { elements: Bytes },
    /// Atomic update outcome.
    AtomicUpdateResult {
        success: bool,
        commit_clock: Option<Bytes>,
    },
    /// Snapshot read outcome with ordered sub-results.
    SnapshotReadResult {
        success: bool,
        clock: Option<Bytes>,
        entries: Vec<WireReadResult>,
    },
}

/// One sub-result inside a snapshot read reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireReadResult {
    /// A counter sub-result.
    Counter { value: i64 },
    /// A set sub-result: an opaque element blob.
    Set { elements: Bytes },
}

impl WireResponse {
    /// The message-type code this response travels under.
    pub fn code(&self) -> u8 {
        match self {
            WireResponse::OperationResult { .. } => codes::OPERATION_RESULT,
            WireResponse::CounterValue { .. } => codes::COUNTER_VALUE,
            WireResponse::SetValue { .. } => codes::SET_VALUE,
            WireResponse::AtomicUpdateResult { .. } => codes::ATOMIC_UPDATE_RESULT,
            WireResponse::SnapshotReadResult { .. } => codes::SNAPSHOT_READ_RESULT,
        }
    }
}

// Payload shapes. Binary fields use serde_bytes so they travel as msgpack
// bin, not arrays of integers.

#[derive(Debug, Serialize, Deserialize)]
struct CounterUpdatePayload {
    key: String,
    amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetUpdatePayload {
    key: String,
    adds: Vec<ByteBuf>,
    removes: Vec<ByteBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReadPayload {
    key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UpdateEntry {
    Increment { key: String, amount: u64 },
    Decrement { key: String, amount: u64 },
    SetUpdate {
        key: String,
        adds: Vec<ByteBuf>,
        removes: Vec<ByteBuf>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReadEntry {
    Counter { key: String },
    Set { key: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopePayload<T> {
    clock: Option<ByteBuf>,
    operations: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OperationResultPayload {
    success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterValuePayload {
    value: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetValuePayload {
    elements: ByteBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct AtomicUpdateResultPayload {
    success: bool,
    commit_clock: Option<ByteBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotReadResultPayload {
    success: bool,
    clock: Option<ByteBuf>,
    entries: Vec<SubResultPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SubResultPayload {
    Counter { value: i64 },
    Set { elements: ByteBuf },
}

fn update_entry(operation: &UpdateOperation) -> UpdateEntry {
    match operation {
        UpdateOperation::Increment { key, amount } => UpdateEntry::Increment {
            key: key.clone(),
            amount: *amount,
        },
        UpdateOperation::Decrement { key, amount } => UpdateEntry::Decrement {
            key: key.clone(),
            amount: *amount,
        },
        UpdateOperation::SetUpdate { key, adds, removes } => UpdateEntry::SetUpdate {
            key: key.clone(),
            adds: adds.iter().cloned().map(ByteBuf::from).collect(),
            removes: removes.iter().cloned().map(ByteBuf::from).collect(),
        },
    }
}

fn update_operation(entry: UpdateEntry) -> UpdateOperation {
    match entry {
        UpdateEntry::Increment { key, amount } => UpdateOperation::Increment { key, amount },
        UpdateEntry::Decrement { key, amount } => UpdateOperation::Decrement { key, amount },
        UpdateEntry::SetUpdate { key, adds, removes } => UpdateOperation::SetUpdate {
            key,
            adds: adds.into_iter().map(ByteBuf::into_vec).collect(),
            removes: removes.into_iter().map(ByteBuf::into_vec).collect(),
        },
    }
}

fn read_entry(operation: &ReadOperation) -> ReadEntry {
    match operation {
        ReadOperation::Counter { key } => ReadEntry::Counter { key: key.clone() },
        ReadOperation::Set { key } => ReadEntry::Set { key: key.clone() },
    }
}

fn read_operation(entry: ReadEntry) -> ReadOperation {
    match entry {
        ReadEntry::Counter { key } => ReadOperation::Counter { key },
        ReadEntry::Set { key } => ReadOperation::Set { key },
    }
}

fn clock_bytes(clock: &Option<Clock>) -> Option<ByteBuf> {
    clock
        .as_ref()
        .map(|c| ByteBuf::from(c.as_bytes().to_vec()))
}

/// Serialize a message to its code and payload bytes.
pub fn encode_message(message: &Message) -> Result<(u8, Vec<u8>)> {
    let code = message.code();
    let payload = match message {
        Message::Update(UpdateOperation::Increment { key, amount })
        | Message::Update(UpdateOperation::Decrement { key, amount }) => {
            MsgPackCodec::encode(&CounterUpdatePayload {
                key: key.clone(),
                amount: *amount,
            })?
        }
        Message::Update(UpdateOperation::SetUpdate { key, adds, removes }) => {
            MsgPackCodec::encode(&SetUpdatePayload {
                key: key.clone(),
                adds: adds.iter().cloned().map(ByteBuf::from).collect(),
                removes: removes.iter().cloned().map(ByteBuf::from).collect(),
            })?
        }
        Message::Read(operation) => MsgPackCodec::encode(&ReadPayload {
            key: operation.key().to_string(),
        })?,
        Message::AtomicUpdate { operations, clock } => {
            MsgPackCodec::encode(&EnvelopePayload {
                clock: clock_bytes(clock),
                operations: operations.iter().map(update_entry).collect::<Vec<_>>(),
            })?
        }
        Message::SnapshotRead { operations, clock } => {
            MsgPackCodec::encode(&EnvelopePayload {
                clock: clock_bytes(clock),
                operations: operations.iter().map(read_entry).collect::<Vec<_>>(),
            })?
        }
    };
    Ok((code, payload))
}

/// Deserialize a request message from its code and payload bytes.
///
/// The server side of the protocol; in this crate it is exercised by test
/// doubles inspecting what the client sent.
pub fn decode_message(code: u8, payload: &[u8]) -> Result<Message> {
    match code {
        codes::INCREMENT => {
            let p: CounterUpdatePayload = MsgPackCodec::decode(payload)?;
            Ok(Message::Update(UpdateOperation::Increment {
                key: p.key,
                amount: p.amount,
            }))
        }
        codes::DECREMENT => {
            let p: CounterUpdatePayload = MsgPackCodec::decode(payload)?;
            Ok(Message::Update(UpdateOperation::Decrement {
                key: p.key,
                amount: p.amount,
            }))
        }
        codes::SET_UPDATE => {
            let p: SetUpdatePayload = MsgPackCodec::decode(payload)?;
            Ok(Message::Update(UpdateOperation::SetUpdate {
                key: p.key,
                adds: p.adds.into_iter().map(ByteBuf::into_vec).collect(),
                removes: p.removes.into_iter().map(ByteBuf::into_vec).collect(),
            }))
        }
        codes::GET_COUNTER => {
            let p: ReadPayload = MsgPackCodec::decode(payload)?;
            Ok(Message::Read(ReadOperation::Counter { key: p.key }))
        }
        codes::GET_SET => {
            let p: ReadPayload = MsgPackCodec::decode(payload)?;
            Ok(Message::Read(ReadOperation::Set { key: p.key }))
        }
        codes::ATOMIC_UPDATE => {
            let p: EnvelopePayload<UpdateEntry> = MsgPackCodec::decode(payload)?;
            Ok(Message::AtomicUpdate {
                operations: p.operations.into_iter().map(update_operation).collect(),
                clock: p.clock.map(|c| Clock::new(c.into_vec())),
            })
        }
        codes::SNAPSHOT_READ => {
            let p: EnvelopePayload<ReadEntry> = MsgPackCodec::decode(payload)?;
            Ok(Message::SnapshotRead {
                operations: p.operations.into_iter().map(read_operation).collect(),
                clock: p.clock.map(|c| Clock::new(c.into_vec())),
            })
        }
        other => Err(CrdtWireError::Protocol(format!(
            "unknown request code 0x{:02x}",
            other
        ))),
    }
}

/// Serialize a response to its code and payload bytes.
///
/// The server side of the protocol; in this crate it is exercised by test
/// doubles crafting replies.
pub fn encode_response(response: &WireResponse) -> Result<(u8, Vec<u8>)> {
    let code = response.code();
    let payload = match response {
        WireResponse::OperationResult { success } => {
            MsgPackCodec::encode(&OperationResultPayload { success: *success })?
        }
        WireResponse::CounterValue { value } => {
            MsgPackCodec::encode(&CounterValuePayload { value: *value })?
        }
        WireResponse::SetValue { elements } => MsgPackCodec::encode(&SetValuePayload {
            elements: ByteBuf::from(elements.to_vec()),
        })?,
        WireResponse::AtomicUpdateResult {
            success,
            commit_clock,
        } => MsgPackCodec::encode(&AtomicUpdateResultPayload {
            success: *success,
            commit_clock: commit_clock.as_ref().map(|c| ByteBuf::from(c.to_vec())),
        })?,
        WireResponse::SnapshotReadResult {
            success,
            clock,
            entries,
        } => MsgPackCodec::encode(&SnapshotReadResultPayload {
            success: *success,
            clock: clock.as_ref().map(|c| ByteBuf::from(c.to_vec())),
            entries: entries
                .iter()
                .map(|entry| match entry {
                    WireReadResult::Counter { value } => {
                        SubResultPayload::Counter { value: *value }
                    }
                    WireReadResult::Set { elements } => SubResultPayload::Set {
                        elements: ByteBuf::from(elements.to_vec()),
                    },
                })
                .collect(),
        })?,
    };
    Ok((code, payload))
}

/// Deserialize a response from its code and payload bytes.
///
/// An unknown code is an [`UnexpectedResponse`](CrdtWireError::UnexpectedResponse),
/// never a panic: the session logs it and stays alive.
pub fn decode_response(code: u8, payload: &[u8]) -> Result<WireResponse> {
    match code {
        codes::OPERATION_RESULT => {
            let p: OperationResultPayload = MsgPackCodec::decode(payload)?;
            Ok(WireResponse::OperationResult { success: p.success })
        }
        codes::COUNTER_VALUE => {
            let p: CounterValuePayload = MsgPackCodec::decode(payload)?;
            Ok(WireResponse::CounterValue { value: p.value })
        }
        codes::SET_VALUE => {
            let p: SetValuePayload = MsgPackCodec::decode(payload)?;
            Ok(WireResponse::SetValue {
                elements: Bytes::from(p.elements.into_vec()),
            })
        }
        codes::ATOMIC_UPDATE_RESULT => {
            let p: AtomicUpdateResultPayload = MsgPackCodec::decode(payload)?;
            Ok(WireResponse::AtomicUpdateResult {
                success: p.success,
                commit_clock: p.commit_clock.map(|c| Bytes::from(c.into_vec())),
            })
        }
        codes::SNAPSHOT_READ_RESULT => {
            let p: SnapshotReadResultPayload = MsgPackCodec::decode(payload)?;
            Ok(WireResponse::SnapshotReadResult {
                success: p.success,
                clock: p.clock.map(|c| Bytes::from(c.into_vec())),
                entries: p
                    .entries
                    .into_iter()
                    .map(|entry| match entry {
                        SubResultPayload::Counter { value } => WireReadResult::Counter { value },
                        SubResultPayload::Set { elements } => WireReadResult::Set {
                            elements: Bytes::from(elements.into_vec()),
                        },
                    })
                    .collect(),
            })
        }
        other => Err(CrdtWireError::UnexpectedResponse(format!(
            "unknown message code 0x{:02x}",
            other
        ))),
    }
}
