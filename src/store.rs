//! High-level store operations.
//!
//! The four public operations sequence calls through the session: convert
//! objects to primitive operations, submit, and map responses back onto
//! objects.
//!
//! `store` and `atomic_store` are two deliberately different consistency
//! contracts: `store` applies one operation per request, sequentially,
//! short-circuiting on the first error with no rollback of operations
//! already applied; `atomic_store` bundles everything into one transaction
//! envelope that commits or aborts as a whole.

use crate::codec::Message;
use crate::error::{CrdtWireError, Result};
use crate::response::{Clock, ReadResult, Response};
use crate::session::Session;
use crate::types::{Counter, CrdtKind, CrdtObject, Object, ReadOperation, RwSet};

fn unexpected(expected: &str, got: &Response) -> CrdtWireError {
    CrdtWireError::UnexpectedResponse(format!(
        "expected {}, got {}",
        expected,
        got.variant_name()
    ))
}

fn object_from_result(key: &str, kind: CrdtKind, result: ReadResult) -> Result<Object> {
    match (kind, result) {
        (CrdtKind::Counter, ReadResult::Counter(value)) => {
            Ok(Object::Counter(Counter::from_value(key, value)))
        }
        (CrdtKind::Set, ReadResult::Set(blob)) => Ok(Object::Set(RwSet::from_value(key, &blob)?)),
        (kind, result) => Err(CrdtWireError::UnexpectedResponse(format!(
            "sub-result for key {:?} does not match requested kind {:?}: {:?}",
            key, kind, result
        ))),
    }
}

impl Session {
    /// Write an object's buffered updates, one operation per request.
    ///
    /// Operations are applied **sequentially and non-atomically**: on the
    /// first failure the remaining operations are not sent and nothing
    /// already applied is rolled back. Callers that need all-or-nothing
    /// semantics use [`atomic_store`](Session::atomic_store). An object
    /// with no buffered updates succeeds trivially.
    pub async fn store(&self, object: &impl CrdtObject) -> Result<()> {
        for operation in object.to_operations() {
            let response = self
                .submit(Message::update(operation), self.request_timeout())
                .await?;
            match response {
                Response::Operation { success: true } => {}
                Response::Operation { success: false } => {
                    return Err(CrdtWireError::Application(
                        "operation rejected by the store".to_string(),
                    ));
                }
                other => return Err(unexpected("OperationResult", &other)),
            }
        }
        Ok(())
    }

    /// Read one object by key and kind.
    pub async fn get(&self, key: &str, kind: CrdtKind) -> Result<Object> {
        let message = Message::read(ReadOperation::new(kind, key));
        let response = self.submit(message, self.request_timeout()).await?;
        match (kind, response) {
            (CrdtKind::Counter, Response::Counter(value)) => {
                Ok(Object::Counter(Counter::from_value(key, value)))
            }
            (CrdtKind::Set, Response::Set(blob)) => {
                Ok(Object::Set(RwSet::from_value(key, &blob)?))
            }
            (kind, other) => Err(unexpected(kind.reply_name(), &other)),
        }
    }

    /// Write several objects' updates as one atomic transaction.
    ///
    /// All operations are flattened, in object order, into a single update
    /// envelope; the store applies them all or none. `clock` requests a
    /// causal position for the transaction; `None` lets the store pick.
    ///
    /// Returns the commit clock on success.
    pub async fn atomic_store(&self, objects: &[Object], clock: Option<Clock>) -> Result<Clock> {
        let operations = objects
            .iter()
            .flat_map(CrdtObject::to_operations)
            .collect::<Vec<_>>();
        let message = Message::atomic_update(operations, clock);
        let response = self.submit(message, self.request_timeout()).await?;
        match response {
            Response::AtomicUpdate {
                success: true,
                commit_clock: Some(clock),
            } => Ok(clock),
            Response::AtomicUpdate {
                success: true,
                commit_clock: None,
            } => Err(CrdtWireError::UnexpectedResponse(
                "atomic update committed without a commit clock".to_string(),
            )),
            Response::AtomicUpdate { success: false, .. } => Err(CrdtWireError::Application(
                "transaction aborted by the store".to_string(),
            )),
            other => Err(unexpected("AtomicUpdateResult", &other)),
        }
    }

    /// Read several objects from one consistent snapshot.
    ///
    /// Builds one read operation per `(key, kind)` pair and submits them as
    /// a single snapshot envelope. Results come back positionally: the
    /// object at index `i` corresponds to `requests[i]`.
    ///
    /// Returns the snapshot clock and the reconstructed objects.
    pub async fn snapshot_get(
        &self,
        requests: &[(String, CrdtKind)],
        clock: Option<Clock>,
    ) -> Result<(Clock, Vec<Object>)> {
        let operations = requests
            .iter()
            .map(|(key, kind)| ReadOperation::new(*kind, key.as_str()))
            .collect::<Vec<_>>();
        let message = Message::snapshot_read(operations, clock);
        let response = self.submit(message, self.request_timeout()).await?;

        let (clock, results) = match response {
            Response::SnapshotRead {
                success: true,
                clock: Some(clock),
                results,
            } => (clock, results),
            Response::SnapshotRead {
                success: true,
                clock: None,
                ..
            } => {
                return Err(CrdtWireError::UnexpectedResponse(
                    "snapshot read succeeded without a clock".to_string(),
                ))
            }
            Response::SnapshotRead { success: false, .. } => {
                return Err(CrdtWireError::Application(
                    "snapshot read failed on the store".to_string(),
                ))
            }
            other => return Err(unexpected("SnapshotReadResult", &other)),
        };

        if results.len() != requests.len() {
            return Err(CrdtWireError::UnexpectedResponse(format!(
                "snapshot returned {} results for {} requests",
                results.len(),
                requests.len()
            )));
        }

        let mut objects = Vec::with_capacity(results.len());
        for ((key, kind), result) in requests.iter().zip(results) {
            objects.push(object_from_result(key, *kind, result)?);
        }

        Ok((clock, objects))
    }
}
