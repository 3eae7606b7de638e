//! Conductor Test - Shared test utilities for the conductor agent runtime.
//!
//! This crate provides mock implementations and test helpers used as a
//! dev-dependency across the other `conductor-*` crates.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! conductor-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn runs_a_turn() {
//!     let harness = conductor_test::RuntimeHarness::new("build", "stub-model").await;
//!     harness.provider.with_text_reply("hi", Default::default());
//!     let (session_id, branch_id) = harness.ids();
//!     harness.agent_loop.run(session_id, branch_id, &harness.default_agent, /* ... */).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mock_llm;
pub mod prelude;

pub use fixtures::*;
pub use harness::RuntimeHarness;
pub use mock_llm::{MockLlmProvider, StreamScript};
