//! Errors that can occur while gating a tool call through the permission system.

use thiserror::Error;

/// Errors from the permission subsystem.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The action was denied.
    #[error("denied: {reason}")]
    Denied {
        /// Why the action was denied.
        reason: String,
    },

    /// An `ask` verdict never arrived before the deadline.
    #[error("permission request timed out after {timeout_ms}ms")]
    Timeout {
        /// How long the request waited, in milliseconds.
        timeout_ms: u64,
    },

    /// A decision arrived for a request that is not pending (already resolved,
    /// timed out, or never registered).
    #[error("no pending permission request for {request_id}")]
    UnknownRequest {
        /// The request id the caller tried to resolve.
        request_id: String,
    },

    /// Internal error in the permission subsystem.
    #[error("internal permission error: {0}")]
    Internal(String),
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;
