//! Sub-agent spawner trait for dependency inversion.
//!
//! `conductor-tools` defines this trait; `conductor-runtime` implements it
//! with the full `SubagentRunner` admission flow (spec §4.E) — creating the
//! child session, emitting `SubagentSpawned`/`SubagentCompleted`, applying
//! timeout and bounded retries. This avoids a circular dependency between
//! the two crates: the tool only needs to know `agent` and `prompt`; the
//! runtime fills in `parentSessionId`/`parentBranchId`/`cwd` from its own
//! actor context.

use std::time::Duration;

/// Request to spawn a sub-agent, as seen from the calling tool.
#[derive(Debug, Clone)]
pub struct SubAgentRequest {
    /// Which agent definition the subagent should run as.
    pub agent: String,
    /// Detailed instructions for the sub-agent.
    pub prompt: String,
    /// Optional timeout (falls back to runtime default if `None`).
    pub timeout: Option<Duration>,
}

/// Result returned by a completed sub-agent.
#[derive(Debug, Clone)]
pub struct SubAgentResult {
    /// Whether the sub-agent completed successfully.
    pub success: bool,
    /// Output text from the sub-agent (last assistant message).
    pub output: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Number of tool calls the sub-agent made.
    pub tool_calls: usize,
    /// Error message (if `success` is false).
    pub error: Option<String>,
}

/// Trait for spawning sub-agents from built-in tools.
///
/// Implemented by the `SubagentRunner` in `conductor-runtime`.
/// Injected into `ToolContext` as `Arc<dyn SubAgentSpawner>`.
#[async_trait::async_trait]
pub trait SubAgentSpawner: Send + Sync {
    /// Spawn a sub-agent and wait for its result.
    async fn spawn(&self, request: SubAgentRequest) -> Result<SubAgentResult, String>;
}
