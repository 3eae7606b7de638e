//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_llm::prelude::*;` to import all essential types.

// Errors
pub use crate::{LlmError, LlmResult};

// Provider trait and config
pub use crate::{LlmProvider, ProviderConfig, StreamBox};

// Message types
pub use crate::{ContentPart, Message, MessageContent, MessageRole};

// Response types
pub use crate::{LlmResponse, StopReason, StreamEvent, Usage};

// Tool types
pub use crate::{LlmToolDefinition, ToolCall, ToolCallResult};
