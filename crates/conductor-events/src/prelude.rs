//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_events::prelude::*;` to import all essential types.

pub use crate::error::{EventStoreError, EventStoreResult};
pub use crate::event::{AgentEvent, EventEnvelope, SeqId, SubagentOutcome};
pub use crate::store::{DEFAULT_RING_CAPACITY, EventStore, EventSubscription};
