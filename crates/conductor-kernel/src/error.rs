//! The kernel's top-level error enum, and its mapping onto JSON-RPC error
//! objects (spec §6/§7's error taxonomy: `StorageError`, `AgentLoopError`,
//! `ProviderError`, `EventStoreError`, `CheckpointError`, `BadArgument`,
//! `SystemError`).

use conductor_core::{BadArgument, SystemError};
use conductor_events::EventStoreError;
use conductor_runtime::{CheckpointError, RuntimeError};
use conductor_storage::StorageError;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

/// JSON-RPC error codes for the conductor namespace, mirrored after the
/// reserved range a jsonrpsee server picks for its own application errors.
pub mod error_codes {
    /// The named session does not exist.
    pub const SESSION_NOT_FOUND: i32 = -32001;
    /// The named branch does not exist.
    pub const BRANCH_NOT_FOUND: i32 = -32002;
    /// No actor is running for the addressed session/branch.
    pub const AGENT_LOOP_ERROR: i32 = -32003;
    /// The LLM provider failed.
    pub const PROVIDER_ERROR: i32 = -32004;
    /// The event store failed.
    pub const EVENT_STORE_ERROR: i32 = -32005;
    /// A checkpoint save/restore failed.
    pub const CHECKPOINT_ERROR: i32 = -32006;
    /// A caller-supplied argument was invalid.
    pub const BAD_ARGUMENT: i32 = -32007;
    /// A failure outside the normal taxonomy.
    pub const SYSTEM_ERROR: i32 = -32008;
    /// An id or suspended request id was not recognized.
    pub const UNKNOWN_REQUEST: i32 = -32009;
}

/// Errors a kernel RPC handler can fail with.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The runtime reported an error (actor lookup, storage, events,
    /// provider, permission, subagent, checkpoint).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A checkpoint save/restore failed, outside a runtime call.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A request id passed to `respond*` does not correspond to any
    /// suspended prompt this kernel is aware of.
    #[error("no pending request for id {0}")]
    UnknownRequest(String),

    /// The requested model is not in the configured catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A failure outside the normal taxonomy (credential store I/O, path
    /// resolution).
    #[error(transparent)]
    System(#[from] SystemError),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

impl From<StorageError> for KernelError {
    fn from(source: StorageError) -> Self {
        Self::Runtime(RuntimeError::Storage(source))
    }
}

impl From<EventStoreError> for KernelError {
    fn from(source: EventStoreError) -> Self {
        Self::Runtime(RuntimeError::EventStore(source))
    }
}

impl From<BadArgument> for KernelError {
    fn from(source: BadArgument) -> Self {
        Self::Runtime(RuntimeError::BadArgument(source))
    }
}

impl KernelError {
    /// Map to the spec §6/§7 error taxonomy tag this error belongs to, used
    /// both in the JSON-RPC error code and in log fields.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Runtime(RuntimeError::ActorNotFound { .. }) => error_codes::AGENT_LOOP_ERROR,
            Self::Runtime(RuntimeError::UnknownRequest(_)) => error_codes::UNKNOWN_REQUEST,
            Self::Runtime(RuntimeError::UnknownAgent(_)) => error_codes::BAD_ARGUMENT,
            Self::Runtime(RuntimeError::Storage(e)) => match e {
                StorageError::NotFound(_) => error_codes::SESSION_NOT_FOUND,
                _ => error_codes::AGENT_LOOP_ERROR,
            },
            Self::Runtime(RuntimeError::EventStore(_)) => error_codes::EVENT_STORE_ERROR,
            Self::Runtime(RuntimeError::Permission(_)) => error_codes::AGENT_LOOP_ERROR,
            Self::Runtime(RuntimeError::Provider { .. }) => error_codes::PROVIDER_ERROR,
            Self::Runtime(RuntimeError::Checkpoint(_)) => error_codes::CHECKPOINT_ERROR,
            Self::Runtime(RuntimeError::Subagent(_)) => error_codes::AGENT_LOOP_ERROR,
            Self::Runtime(RuntimeError::BadArgument(_)) => error_codes::BAD_ARGUMENT,
            Self::Runtime(RuntimeError::System(_)) => error_codes::SYSTEM_ERROR,
            Self::Checkpoint(_) => error_codes::CHECKPOINT_ERROR,
            Self::UnknownRequest(_) => error_codes::UNKNOWN_REQUEST,
            Self::UnknownModel(_) => error_codes::BAD_ARGUMENT,
            Self::System(_) => error_codes::SYSTEM_ERROR,
        }
    }

    /// Single-line diagnostic, reusing `RuntimeError::format_error` where
    /// the underlying error came from the runtime.
    #[must_use]
    pub fn format_error(&self) -> String {
        match self {
            Self::Runtime(e) => e.format_error(),
            Self::Checkpoint(e) => format!("Checkpoint: {e}"),
            other => other.to_string(),
        }
    }
}

impl From<KernelError> for ErrorObjectOwned {
    fn from(err: KernelError) -> Self {
        let code = err.error_code();
        let message = err.format_error();
        Self::owned(code, message, None::<()>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_maps_to_session_not_found_code() {
        let err = KernelError::from(StorageError::NotFound("s1".into()));
        assert_eq!(err.error_code(), error_codes::SESSION_NOT_FOUND);
    }

    #[test]
    fn unknown_request_maps_to_unknown_request_code() {
        let err = KernelError::UnknownRequest("r1".into());
        assert_eq!(err.error_code(), error_codes::UNKNOWN_REQUEST);
        let obj: ErrorObjectOwned = err.into();
        assert_eq!(obj.code(), error_codes::UNKNOWN_REQUEST);
    }
}
