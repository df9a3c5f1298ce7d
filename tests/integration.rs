//! Integration tests for crdtwire.
//!
//! Each test connects a real session to an in-process TCP double that
//! scripts the store's side of the conversation.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crdtwire::codec::{decode_message, encode_response, Message, WireReadResult, WireResponse};
use crdtwire::protocol::{build_frame, Frame, FrameBuffer};
use crdtwire::types::UpdateOperation;
use crdtwire::{
    Clock, Counter, CrdtKind, CrdtObject, CrdtWireError, Object, RwSet, Session, SessionConfig,
};

/// A scripted store double on the server side of one connection.
struct StoreDouble {
    stream: TcpStream,
    buffer: FrameBuffer,
    frames: Vec<Frame>,
    messages_read: usize,
}

impl StoreDouble {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _addr) = listener.accept().await.unwrap();
        Self {
            stream,
            buffer: FrameBuffer::new(),
            frames: Vec::new(),
            messages_read: 0,
        }
    }

    /// Read until one complete message is available.
    async fn read_message(&mut self) -> Message {
        loop {
            if !self.frames.is_empty() {
                let frame = self.frames.remove(0);
                self.messages_read += 1;
                return decode_message(frame.code(), frame.payload()).unwrap();
            }
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed while the double expected a message");
            self.frames.extend(self.buffer.push(&buf[..n]).unwrap());
        }
    }

    /// Read until the client closes; panics if a further message arrives.
    async fn expect_eof(&mut self) {
        loop {
            assert!(
                self.frames.is_empty(),
                "double received an unexpected extra message"
            );
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            self.frames.extend(self.buffer.push(&buf[..n]).unwrap());
        }
    }

    async fn reply(&mut self, response: &WireResponse) {
        let (code, payload) = encode_response(response).unwrap();
        self.stream
            .write_all(&build_frame(code, &payload))
            .await
            .unwrap();
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

async fn connect_pair() -> (Session, StoreDouble) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (session, double) = tokio::join!(
        Session::connect("127.0.0.1", port, SessionConfig::default()),
        StoreDouble::accept(&listener),
    );
    (session.unwrap(), double)
}

fn ok_result() -> WireResponse {
    WireResponse::OperationResult { success: true }
}

/// An echo double that acknowledges any increment makes `store` return Ok.
#[tokio::test]
async fn test_store_counter_against_echo_double() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(1);

    let client = session.store(&hits);
    let server = async {
        let message = double.read_message().await;
        match message {
            Message::Update(UpdateOperation::Increment { key, amount }) => {
                assert_eq!(key, "page:hits");
                assert_eq!(amount, 1);
            }
            other => panic!("expected an increment, got {:?}", other),
        }
        double.reply(&ok_result()).await;
    };

    let (result, ()) = tokio::join!(client, server);
    result.unwrap();
    session.close().await;
}

/// A silent peer trips the request timeout, roughly on schedule.
#[tokio::test]
async fn test_timeout_against_silent_peer() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(1);

    let start = tokio::time::Instant::now();
    let client = session.submit(
        crdtwire::Message::update(hits.to_operations().remove(0)),
        Some(Duration::from_millis(50)),
    );
    let server = double.read_message();

    let (result, _message) = tokio::join!(client, server);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(CrdtWireError::Timeout(_))));
    assert!(elapsed >= Duration::from_millis(45), "fired early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "fired late: {:?}", elapsed);

    // The session accepts a new submission afterwards: the peer stays
    // silent, so it times out too, but it is neither Busy nor Disconnected.
    let client = session.submit(
        crdtwire::Message::read(crdtwire::ReadOperation::Counter {
            key: "page:hits".to_string(),
        }),
        Some(Duration::from_millis(50)),
    );
    let server = double.read_message();
    let (result, _message) = tokio::join!(client, server);
    assert!(matches!(result, Err(CrdtWireError::Timeout(_))));

    session.close().await;
}

/// The late reply to a timed-out request is discarded; the next request
/// receives its own reply.
#[tokio::test]
async fn test_late_reply_is_not_misrouted() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(1);
    let first = session.submit(
        crdtwire::Message::update(hits.to_operations().remove(0)),
        Some(Duration::from_millis(50)),
    );
    let server = double.read_message();
    let (result, _message) = tokio::join!(first, server);
    assert!(matches!(result, Err(CrdtWireError::Timeout(_))));

    let second = session.get("page:hits", CrdtKind::Counter);
    let server = async {
        let _ = double.read_message().await;
        // The reply to the first, timed-out request arrives late...
        double.reply(&ok_result()).await;
        // ...followed by the reply to the current request.
        double.reply(&WireResponse::CounterValue { value: 11 }).await;
    };

    let (result, ()) = tokio::join!(second, server);
    let object = result.unwrap();
    assert_eq!(object.as_counter().unwrap().value(), 11);

    session.close().await;
}

/// The remote closing mid-request resolves that request with Disconnected
/// exactly once, and the session is finished.
#[tokio::test]
async fn test_disconnect_mid_request() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(1);

    let client = session.store(&hits);
    let server = async {
        let _ = double.read_message().await;
        drop(double);
    };

    let (result, ()) = tokio::join!(client, server);
    assert!(matches!(result, Err(CrdtWireError::Disconnected)));

    // Every subsequent call on the terminated session fails.
    let result = session.get("page:hits", CrdtKind::Counter).await;
    assert!(matches!(result, Err(CrdtWireError::Disconnected)));
    assert!(session.is_closed());
}

/// `store` is sequential and non-atomic: the operation after the failing
/// one is never sent, and applied operations are not rolled back.
#[tokio::test]
async fn test_store_short_circuits_on_failure() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(1);
    hits.decrement(2);
    hits.increment(3);

    let client = async {
        let result = session.store(&hits).await;
        session.close().await;
        result
    };
    let server = async {
        let first = double.read_message().await;
        assert!(matches!(
            first,
            Message::Update(UpdateOperation::Increment { amount: 1, .. })
        ));
        double.reply(&ok_result()).await;

        let second = double.read_message().await;
        assert!(matches!(
            second,
            Message::Update(UpdateOperation::Decrement { amount: 2, .. })
        ));
        double
            .reply(&WireResponse::OperationResult { success: false })
            .await;

        // The third operation must never arrive.
        double.expect_eof().await;
        double.messages_read
    };

    let (result, messages_read) = tokio::join!(client, server);
    assert!(matches!(result, Err(CrdtWireError::Application(_))));
    assert_eq!(messages_read, 2);
}

/// `atomic_store` sends exactly one envelope with all objects' operations
/// in order and yields a single commit clock.
#[tokio::test]
async fn test_atomic_store_sends_one_envelope() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(5);
    let mut tags = RwSet::new("page:tags");
    tags.add(b"rust".to_vec());

    let objects = vec![Object::Counter(hits), Object::Set(tags)];

    let client = async {
        let result = session.atomic_store(&objects, None).await;
        session.close().await;
        result
    };
    let server = async {
        let message = double.read_message().await;
        match message {
            Message::AtomicUpdate { operations, clock } => {
                assert_eq!(clock, None);
                assert_eq!(operations.len(), 2);
                assert!(matches!(
                    &operations[0],
                    UpdateOperation::Increment { amount: 5, .. }
                ));
                assert!(matches!(&operations[1], UpdateOperation::SetUpdate { .. }));
            }
            other => panic!("expected one atomic envelope, got {:?}", other),
        }
        double
            .reply(&WireResponse::AtomicUpdateResult {
                success: true,
                commit_clock: Some(bytes::Bytes::from_static(b"clock-42")),
            })
            .await;
        double.expect_eof().await;
        double.messages_read
    };

    let (result, messages_read) = tokio::join!(client, server);
    assert_eq!(result.unwrap(), Clock::new(&b"clock-42"[..]));
    assert_eq!(messages_read, 1);
}

/// An aborted transaction is a single error, never partial success.
#[tokio::test]
async fn test_atomic_store_abort_is_one_error() {
    let (session, mut double) = connect_pair().await;

    let mut hits = Counter::new("page:hits");
    hits.increment(5);
    let objects = vec![Object::Counter(hits)];

    let client = session.atomic_store(&objects, Some(Clock::new(&b"clock-1"[..])));
    let server = async {
        match double.read_message().await {
            Message::AtomicUpdate { clock, .. } => {
                assert_eq!(clock, Some(Clock::new(&b"clock-1"[..])));
            }
            other => panic!("expected one atomic envelope, got {:?}", other),
        }
        double
            .reply(&WireResponse::AtomicUpdateResult {
                success: false,
                commit_clock: None,
            })
            .await;
    };

    let (result, ()) = tokio::join!(client, server);
    assert!(matches!(result, Err(CrdtWireError::Application(_))));
    session.close().await;
}

/// Snapshot results align positionally with the requested (key, kind) pairs.
#[tokio::test]
async fn test_snapshot_get_positional_alignment() {
    let (session, mut double) = connect_pair().await;

    let requests = vec![
        ("k1".to_string(), CrdtKind::Counter),
        ("k2".to_string(), CrdtKind::Set),
    ];

    let client = session.snapshot_get(&requests, None);
    let server = async {
        match double.read_message().await {
            Message::SnapshotRead { operations, clock } => {
                assert_eq!(clock, None);
                assert_eq!(operations.len(), 2);
                assert_eq!(operations[0].key(), "k1");
                assert_eq!(operations[1].key(), "k2");
            }
            other => panic!("expected one snapshot envelope, got {:?}", other),
        }
        let blob = RwSet::encode_value(&[b"a".to_vec()]).unwrap();
        double
            .reply(&WireResponse::SnapshotReadResult {
                success: true,
                clock: Some(bytes::Bytes::from_static(b"clock-7")),
                entries: vec![
                    WireReadResult::Counter { value: 7 },
                    WireReadResult::Set {
                        elements: bytes::Bytes::from(blob),
                    },
                ],
            })
            .await;
    };

    let (result, ()) = tokio::join!(client, server);
    let (clock, objects) = result.unwrap();
    assert_eq!(clock, Clock::new(&b"clock-7"[..]));
    assert_eq!(objects.len(), 2);

    let counter = objects[0].as_counter().expect("result[0] corresponds to k1");
    assert_eq!(counter.key(), "k1");
    assert_eq!(counter.value(), 7);

    let set = objects[1].as_set().expect("result[1] corresponds to k2");
    assert_eq!(set.key(), "k2");
    assert!(set.contains(b"a"));

    session.close().await;
}

/// An encoded empty-set blob reconstructs as an empty structured set.
#[tokio::test]
async fn test_get_empty_set() {
    let (session, mut double) = connect_pair().await;

    let client = session.get("page:tags", CrdtKind::Set);
    let server = async {
        let _ = double.read_message().await;
        let blob = RwSet::encode_value(&[]).unwrap();
        double
            .reply(&WireResponse::SetValue {
                elements: bytes::Bytes::from(blob),
            })
            .await;
    };

    let (result, ()) = tokio::join!(client, server);
    let object = result.unwrap();
    let set = object.as_set().unwrap();
    assert!(set.is_empty());

    session.close().await;
}

/// A counter read reconstructs the returned value.
#[tokio::test]
async fn test_get_counter_value() {
    let (session, mut double) = connect_pair().await;

    let client = session.get("page:hits", CrdtKind::Counter);
    let server = async {
        let message = double.read_message().await;
        assert!(matches!(message, Message::Read(_)));
        double.reply(&WireResponse::CounterValue { value: 5 }).await;
    };

    let (result, ()) = tokio::join!(client, server);
    assert_eq!(result.unwrap().as_counter().unwrap().value(), 5);

    session.close().await;
}

/// An empty object writes nothing and succeeds trivially.
#[tokio::test]
async fn test_store_empty_object_is_trivial() {
    let (session, mut double) = connect_pair().await;

    let clean = Counter::new("page:hits");
    session.store(&clean).await.unwrap();

    // The double saw the connection close without any message.
    session.close().await;
    double.expect_eof().await;
    assert_eq!(double.messages_read, 0);
}
