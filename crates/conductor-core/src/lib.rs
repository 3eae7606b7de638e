//! Conductor Core - foundation types shared across the agent runtime.
//!
//! This crate provides:
//! - The shared `BadArgument`/`SystemError` error shapes used by every crate's own taxonomy
//! - Newtype identifiers for sessions, branches, messages, events, tool calls and requests
//! - A generic exponential-backoff retry helper used by the provider retry policy

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod prelude;
pub mod retry;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use retry::{RetryConfig, RetryOutcome, retry};
pub use types::{BranchId, MessageId, RequestId, Role, SessionId, ToolCallId, Usage};
