//! Counter data type.
//!
//! A PN-counter: the value is the server-side base plus any locally
//! buffered deltas. Each `increment`/`decrement` call buffers one primitive
//! operation, preserved in call order.

use super::{CrdtKind, CrdtObject, UpdateOperation};

/// A replicated counter.
///
/// # Example
///
/// ```
/// use crdtwire::types::{Counter, CrdtObject};
///
/// let mut counter = Counter::new("page:hits");
/// counter.increment(3);
/// counter.decrement(1);
/// assert_eq!(counter.value(), 2);
/// assert_eq!(counter.to_operations().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    key: String,
    base: i64,
    deltas: Vec<i64>,
}

impl Counter {
    /// Create an empty counter under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base: 0,
            deltas: Vec::new(),
        }
    }

    /// Reconstruct a counter from the value returned by a read.
    pub fn from_value(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            base: value,
            deltas: Vec::new(),
        }
    }

    /// The key this counter lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value: the server base plus buffered local deltas.
    pub fn value(&self) -> i64 {
        self.base + self.deltas.iter().sum::<i64>()
    }

    /// Buffer an increment by `amount`.
    pub fn increment(&mut self, amount: u64) {
        if amount > 0 {
            self.deltas.push(amount as i64);
        }
    }

    /// Buffer a decrement by `amount`.
    pub fn decrement(&mut self, amount: u64) {
        if amount > 0 {
            self.deltas.push(-(amount as i64));
        }
    }

    /// Whether any local updates are buffered.
    pub fn is_dirty(&self) -> bool {
        !self.deltas.is_empty()
    }
}

impl CrdtObject for Counter {
    fn key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> CrdtKind {
        CrdtKind::Counter
    }

    fn to_operations(&self) -> Vec<UpdateOperation> {
        self.deltas
            .iter()
            .map(|&delta| {
                if delta >= 0 {
                    UpdateOperation::Increment {
                        key: self.key.clone(),
                        amount: delta as u64,
                    }
                } else {
                    UpdateOperation::Decrement {
                        key: self.key.clone(),
                        amount: delta.unsigned_abs(),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_counter_has_no_operations() {
        let counter = Counter::new("hits");
        assert_eq!(counter.value(), 0);
        assert!(!counter.is_dirty());
        assert!(counter.to_operations().is_empty());
    }

    #[test]
    fn test_value_includes_buffered_deltas() {
        let mut counter = Counter::from_value("hits", 10);
        counter.increment(5);
        counter.decrement(3);
        assert_eq!(counter.value(), 12);
    }

    #[test]
    fn test_operations_preserve_call_order() {
        let mut counter = Counter::new("hits");
        counter.increment(1);
        counter.decrement(2);
        counter.increment(3);

        let ops = counter.to_operations();
        assert_eq!(
            ops,
            vec![
                UpdateOperation::Increment {
                    key: "hits".to_string(),
                    amount: 1,
                },
                UpdateOperation::Decrement {
                    key: "hits".to_string(),
                    amount: 2,
                },
                UpdateOperation::Increment {
                    key: "hits".to_string(),
                    amount: 3,
                },
            ]
        );
    }

    #[test]
    fn test_zero_amount_is_a_noop() {
        let mut counter = Counter::new("hits");
        counter.increment(0);
        counter.decrement(0);
        assert!(counter.to_operations().is_empty());
    }

    #[test]
    fn test_from_value_roundtrip() {
        let counter = Counter::from_value("hits", -7);
        assert_eq!(counter.value(), -7);
        assert!(!counter.is_dirty());
    }
}
