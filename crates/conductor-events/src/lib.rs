//! Conductor Events - the ordered, replayable event log for agent sessions.
//!
//! Every observable fact about a session's turns (streamed text, tool
//! dispatch, mode changes, suspensions) is published as an [`AgentEvent`]
//! wrapped in an [`EventEnvelope`] with a monotone per-session id. The
//! [`EventStore`] is the single writer and fan-out point: publishers assign
//! ids synchronously, subscribers can resume from any previously seen id and
//! transparently fall through to live delivery.
//!
//! # Example
//!
//! ```rust
//! use conductor_events::{AgentEvent, EventStore};
//! use conductor_core::SessionId;
//!
//! # async fn example() {
//! let store = EventStore::new();
//! let session = SessionId::new();
//! let mut sub = store.subscribe(session, None, None);
//! store.publish(session, None, AgentEvent::StreamStarted);
//! let envelope = sub.recv().await.unwrap();
//! assert_eq!(envelope.event.event_type(), "stream_started");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod event;
mod store;

pub use error::{EventStoreError, EventStoreResult};
pub use event::{AgentEvent, EventEnvelope, SeqId, SubagentOutcome};
pub use store::{DEFAULT_RING_CAPACITY, EventStore, EventSubscription};
