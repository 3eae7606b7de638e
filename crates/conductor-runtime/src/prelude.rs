//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Turn loop
pub use crate::{AgentActor, PlanDecision, ProviderFactory, RunMessage, SteerCommand, SubmitMode};

// Registry
pub use crate::{AgentDefinition, AgentKind, AgentRegistry};
pub use crate::AgentLoop;

// Configuration
pub use crate::{CompactionConfig, RuntimeConfig, SubagentConfig};

// Tool dispatch
pub use crate::{ToolInvocation, ToolRunner};

// Checkpointing
pub use crate::{CheckpointService, InMemoryCheckpointService};

// Subagents
pub use crate::{SubAgentHandle, SubAgentId, SubAgentPool, SubagentRunner};
