//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_test::prelude::*;` to import all essential types.

pub use crate::fixtures::{test_assistant_message, test_branch, test_session, test_user_message};
pub use crate::harness::RuntimeHarness;
pub use crate::mock_llm::{MockLlmProvider, StreamScript};
