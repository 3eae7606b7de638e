//! EventStore error types.

use thiserror::Error;

/// Errors that can occur in EventStore operations.
#[derive(Debug, Error, Clone)]
pub enum EventStoreError {
    /// The requested session has no log (never published to).
    #[error("no event log for session: {0}")]
    UnknownSession(String),

    /// Internal failure (lock poisoning, channel closed unexpectedly).
    #[error("event store error: {0}")]
    Internal(String),
}

/// Result type for EventStore operations.
pub type EventStoreResult<T> = Result<T, EventStoreError>;
