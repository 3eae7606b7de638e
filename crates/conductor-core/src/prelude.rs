//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_core::prelude::*;` to import all essential types.

pub use crate::error::{BadArgument, CoreError, CoreResult, SystemError};
pub use crate::retry::{RetryConfig, RetryOutcome, retry};
pub use crate::types::{BranchId, MessageId, RequestId, Role, SessionId, ToolCallId, Usage};
