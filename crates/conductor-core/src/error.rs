//! Error shapes shared by every crate's own taxonomy.
//!
//! Each crate boundary (storage, events, permission, llm, runtime) defines its own
//! `thiserror` enum; `BadArgument` and `SystemError` are the two leaf shapes that
//! show up verbatim in more than one of those enums, so they live here instead of
//! being duplicated.

use thiserror::Error;

/// A caller passed an invalid argument to an operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("bad argument in {module}::{method}{}", description.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct BadArgument {
    /// Module the call was made against.
    pub module: String,
    /// Method that rejected the argument.
    pub method: String,
    /// Optional human-readable detail.
    pub description: Option<String>,
}

impl BadArgument {
    /// Construct a new `BadArgument`.
    pub fn new(module: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An operation failed for a reason outside the normal error taxonomy
/// (process/OS/IO level failure).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("system error in {module}::{method}: {reason}{}", path_or_descriptor.as_ref().map(|p| format!(" ({p})")).unwrap_or_default())]
pub struct SystemError {
    /// Module the failure originated in.
    pub module: String,
    /// Method that failed.
    pub method: String,
    /// Reason for the failure.
    pub reason: String,
    /// Path or descriptor implicated, if any.
    pub path_or_descriptor: Option<String>,
}

impl SystemError {
    /// Construct a new `SystemError`.
    pub fn new(module: impl Into<String>, method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
            reason: reason.into(),
            path_or_descriptor: None,
        }
    }

    /// Attach the path or descriptor involved.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path_or_descriptor = Some(path.into());
        self
    }
}

/// Catch-all error for the small surface conductor-core exposes directly
/// (retry configuration misuse, id parsing).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A caller-supplied argument was invalid.
    #[error(transparent)]
    BadArgument(#[from] BadArgument),

    /// An id string failed to parse.
    #[error("invalid id: {0}")]
    InvalidId(String),
}

/// Result type for conductor-core operations.
pub type CoreResult<T> = Result<T, CoreError>;
