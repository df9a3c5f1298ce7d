//! # crdtwire
//!
//! Client SDK for a replicated CRDT store speaking a length-framed binary
//! protocol over TCP.
//!
//! A [`Session`] is one connection plus its single in-flight request: it
//! correlates outbound operations with inbound responses, enforces
//! per-request timeouts, and translates data-type updates into wire-level
//! transaction envelopes and back.
//!
//! ## Architecture
//!
//! - **Session** ([`session`]): spawned task exclusively owning the
//!   connection; strict single-flight with stale-response correlation
//! - **Protocol** ([`protocol`]): `[length][code][payload]` framing
//! - **Codec** ([`codec`]): MessagePack payloads for each message type
//! - **Data types** ([`types`]): counters and sets, their primitive
//!   operations, and value reconstruction
//!
//! ## Example
//!
//! ```ignore
//! use crdtwire::{Counter, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> crdtwire::Result<()> {
//!     let session = Session::connect("store.local", 8087, SessionConfig::default()).await?;
//!
//!     let mut hits = Counter::new("page:hits");
//!     hits.increment(1);
//!     session.store(&hits).await?;
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! There is no reconnection: a session that disconnects is finished, and a
//! fresh one must be created to retry.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod response;
pub mod session;
pub mod transport;
pub mod types;

mod store;

pub use codec::Message;
pub use error::{CrdtWireError, Result};
pub use response::{Clock, ReadResult, Response};
pub use session::{Session, SessionConfig};
pub use types::{Counter, CrdtKind, CrdtObject, Object, ReadOperation, RwSet, UpdateOperation};
