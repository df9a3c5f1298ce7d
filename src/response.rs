//! Domain responses and the wire-to-domain decoder.
//!
//! The codec hands the session a [`WireResponse`](crate::codec::WireResponse);
//! this module maps it onto the typed [`Response`] the caller works with.
//! Snapshot sub-results recurse through the same counter/set mapping.

use bytes::Bytes;

use crate::codec::{WireReadResult, WireResponse};

/// An opaque causal token: a point in the store's event history.
///
/// Returned by committed transactions and consistent reads; passed back to
/// request a snapshot at or after that point. `Option<Clock>` is the
/// "ignore" marker; absence is never a zero clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clock(Bytes);

impl Clock {
    /// Wrap a raw clock token.
    pub fn new(token: impl Into<Bytes>) -> Self {
        Self(token.into())
    }

    /// The raw token bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the clock, yielding the raw token.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// One sub-result of a snapshot read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// A counter value.
    Counter(i64),
    /// An opaque set value blob, decoded by the set data type.
    Set(Bytes),
}

impl ReadResult {
    fn from_wire(wire: WireReadResult) -> Self {
        match wire {
            WireReadResult::Counter { value } => ReadResult::Counter(value),
            WireReadResult::Set { elements } => ReadResult::Set(elements),
        }
    }
}

/// A decoded domain response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Outcome of a single update operation.
    Operation { success: bool },
    /// A counter read reply.
    Counter(i64),
    /// A set read reply: an opaque value blob.
    Set(Bytes),
    /// Outcome of an atomic update envelope.
    AtomicUpdate {
        success: bool,
        commit_clock: Option<Clock>,
    },
    /// Outcome of a snapshot read envelope, sub-results in request order.
    SnapshotRead {
        success: bool,
        clock: Option<Clock>,
        results: Vec<ReadResult>,
    },
}

impl Response {
    /// Map a decoded wire response onto the domain.
    pub fn from_wire(wire: WireResponse) -> Self {
        match wire {
            WireResponse::OperationResult { success } => Response::Operation { success },
            WireResponse::CounterValue { value } => Response::Counter(value),
            WireResponse::SetValue { elements } => Response::Set(elements),
            WireResponse::AtomicUpdateResult {
                success,
                commit_clock,
            } => Response::AtomicUpdate {
                success,
                commit_clock: commit_clock.map(Clock::new),
            },
            WireResponse::SnapshotReadResult {
                success,
                clock,
                entries,
            } => Response::SnapshotRead {
                success,
                clock: clock.map(Clock::new),
                results: entries.into_iter().map(ReadResult::from_wire).collect(),
            },
        }
    }

    /// Short variant name, for error text.
    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Response::Operation { .. } => "OperationResult",
            Response::Counter(_) => "CounterValue",
            Response::Set(_) => "SetValue",
            Response::AtomicUpdate { .. } => "AtomicUpdateResult",
            Response::SnapshotRead { .. } => "SnapshotReadResult",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_mapping() {
        let response = Response::from_wire(WireResponse::OperationResult { success: true });
        assert_eq!(response, Response::Operation { success: true });
    }

    #[test]
    fn test_counter_value_mapping() {
        let response = Response::from_wire(WireResponse::CounterValue { value: 5 });
        assert_eq!(response, Response::Counter(5));
    }

    #[test]
    fn test_set_value_stays_opaque() {
        let blob = Bytes::from_static(b"\x90");
        let response = Response::from_wire(WireResponse::SetValue {
            elements: blob.clone(),
        });
        assert_eq!(response, Response::Set(blob));
    }

    #[test]
    fn test_atomic_result_wraps_commit_clock() {
        let response = Response::from_wire(WireResponse::AtomicUpdateResult {
            success: true,
            commit_clock: Some(Bytes::from_static(b"clock-1")),
        });
        assert_eq!(
            response,
            Response::AtomicUpdate {
                success: true,
                commit_clock: Some(Clock::new(&b"clock-1"[..])),
            }
        );
    }

    #[test]
    fn test_absent_clock_stays_absent() {
        let response = Response::from_wire(WireResponse::AtomicUpdateResult {
            success: false,
            commit_clock: None,
        });
        assert_eq!(
            response,
            Response::AtomicUpdate {
                success: false,
                commit_clock: None,
            }
        );
    }

    #[test]
    fn test_snapshot_sub_results_recurse_in_order() {
        let response = Response::from_wire(WireResponse::SnapshotReadResult {
            success: true,
            clock: Some(Bytes::from_static(b"clock-2")),
            entries: vec![
                WireReadResult::Counter { value: 7 },
                WireReadResult::Set {
                    elements: Bytes::from_static(b"\x90"),
                },
            ],
        });

        match response {
            Response::SnapshotRead {
                success,
                clock,
                results,
            } => {
                assert!(success);
                assert_eq!(clock, Some(Clock::new(&b"clock-2"[..])));
                assert_eq!(results.len(), 2);
                assert_eq!(results[0], ReadResult::Counter(7));
                assert_eq!(results[1], ReadResult::Set(Bytes::from_static(b"\x90")));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }
}
