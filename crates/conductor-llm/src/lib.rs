//! Conductor LLM — the provider abstraction the agent runtime streams turns
//! against.
//!
//! [`LlmProvider`] is the collaborator interface named in spec §6: the core
//! depends on it for `stream`/`complete`, never on a specific vendor. This
//! crate owns only the trait, its wire types, and retry classification
//! ([`LlmError::is_retryable`]); concrete vendor providers and a scriptable
//! mock (for tests) live outside it.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod prelude;
pub mod provider;
pub mod types;

pub use error::{LlmError, LlmResult};
pub use provider::{LlmProvider, ProviderConfig, StreamBox};
pub use types::{
    ContentPart, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole,
    StopReason, StreamEvent, ToolCall, ToolCallResult, Usage,
};
