//! The runtime's top-level error enum — the one surfaced across the RPC
//! boundary, mapped onto the §6/§7 error taxonomy tags.

use conductor_core::{BadArgument, SystemError};
use conductor_events::EventStoreError;
use conductor_llm::LlmError;
use conductor_permission::PermissionError;
use conductor_storage::StorageError;
use thiserror::Error;

/// Errors an `AgentLoop`/`AgentActor` operation can fail with.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No actor exists for the given `(sessionId, branchId)` and the
    /// operation requires one (e.g. `steer`, `respondPermission`).
    #[error("no running actor for session {session_id} branch {branch_id}")]
    ActorNotFound {
        /// Session the caller addressed.
        session_id: String,
        /// Branch the caller addressed.
        branch_id: String,
    },

    /// A request id passed to `respondQuestions`/`respondPermission`/`respondPlan`
    /// does not correspond to any suspended prompt.
    #[error("no pending request for id {0}")]
    UnknownRequest(String),

    /// The named agent definition is not registered.
    #[error("unknown agent definition: {0}")]
    UnknownAgent(String),

    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The event store failed to publish or subscribe.
    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    /// The permission subsystem failed (timeout, unknown request).
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The LLM provider failed, tagged with the model in use.
    #[error("{model}: {source}")]
    Provider {
        /// Model identifier in effect for the failing call.
        model: String,
        /// Underlying provider error.
        #[source]
        source: LlmError,
    },

    /// A checkpoint save/restore failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// A subagent run failed (including timeout and retry exhaustion).
    #[error("subagent error: {0}")]
    Subagent(String),

    /// A caller-supplied argument was invalid.
    #[error(transparent)]
    BadArgument(#[from] BadArgument),

    /// A failure outside the normal taxonomy (process/IO level).
    #[error(transparent)]
    System(#[from] SystemError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Single-line diagnostic for user-facing surfaces (spec §7 `formatError`).
    #[must_use]
    pub fn format_error(&self) -> String {
        match self {
            Self::Storage(e) => format!("Storage: {e}"),
            Self::EventStore(e) => format!("EventStore: {e}"),
            Self::Permission(e) => format!("Permission: {e}"),
            Self::Provider { model, source } => format!("{model}: {source}"),
            Self::Checkpoint(msg) => format!("Checkpoint: {msg}"),
            Self::Subagent(msg) => format!("Subagent: {msg}"),
            other => other.to_string(),
        }
    }
}
