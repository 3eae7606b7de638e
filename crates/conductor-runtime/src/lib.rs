//! Conductor Runtime — the agentic turn loop (spec §4).
//!
//! This crate provides:
//! - `AgentActor`, the per-`(session, branch)` turn loop: compose, stream,
//!   dispatch tool calls, compact, retry, and the suspend points for
//!   questions/permissions/plan review.
//! - `AgentLoop`, the process-wide registry of live actors and the entry
//!   point for `run`/`steer`/`respond*`.
//! - `ToolRunner`, permission-gated tool dispatch respecting each tool's
//!   declared concurrency class.
//! - `SubagentRunner`, subagent admission under a process-wide pool.
//! - `CheckpointService`, durable markers for long multi-step tools.
//!
//! # Architecture
//!
//! The runtime coordinates:
//! - an LLM provider, resolved per-turn through a `ProviderFactory`
//! - a `Storage` backend for sessions/branches/messages
//! - an `EventStore` for per-session event fan-out
//! - a `PermissionHandler` for tool-call gating
//!
//! # Example
//!
//! ```rust,no_run
//! use conductor_runtime::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> RuntimeResult<()> {
//! let storage: Arc<dyn conductor_storage::Storage> = Arc::new(conductor_storage::MemoryStorage::new());
//! let events = Arc::new(conductor_events::EventStore::new());
//! let agents = Arc::new(AgentRegistry::with_default_agent("claude-sonnet-4-20250514"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod actor;
mod agent_def;
mod agent_loop;
mod checkpoint;
mod compaction;
mod config;
mod deferred;
mod error;
mod subagent;
mod subagent_runner;
mod tool_runner;

pub use actor::{AgentActor, PlanDecision, ProviderFactory, RunMessage, SteerCommand, SubmitMode};
pub use agent_def::{AgentDefinition, AgentKind, AgentRegistry};
pub use agent_loop::AgentLoop;
pub use checkpoint::{CheckpointError, CheckpointResult, CheckpointService, InMemoryCheckpointService};
pub use compaction::{estimate_message_tokens, prune_tool_outputs, summarize_prefix};
pub use config::{estimate_tokens, CompactionConfig, RuntimeConfig, SubagentConfig};
pub use deferred::DeferredSlots;
pub use error::{RuntimeError, RuntimeResult};
pub use subagent::{SubAgentHandle, SubAgentId, SubAgentPool, SubAgentPoolStats, SubAgentStatus};
pub use subagent_runner::SubagentRunner;
pub use tool_runner::{ToolInvocation, ToolRunner};

// Re-export tool types for convenience.
pub use conductor_tools::{self, ToolContext, ToolRegistry};
