//! `SubagentRunner` (spec §4.E): admits a `task` tool call into a fresh child
//! session/branch, runs one turn of the calling actor's agentic loop against
//! it under a combined timeout/cancellation/retry envelope, and reports the
//! outcome back on the parent session's event stream.
//!
//! Implements `conductor_tools::SubAgentSpawner` so it can be handed to
//! `ToolContext` without `conductor-tools` depending back on this crate.

use std::sync::Arc;

use conductor_core::{BranchId, SessionId};
use conductor_events::{AgentEvent, EventStore, SubagentOutcome};
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Session};
use conductor_tools::{SubAgentRequest, SubAgentResult, SubAgentSpawner, ToolContext};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::actor::{AgentActor, ProviderFactory};
use crate::agent_def::AgentRegistry;
use crate::config::RuntimeConfig;
use crate::subagent::SubAgentPool;
use crate::tool_runner::ToolRunner;

/// Admits and runs subagent turns spawned by the `task` tool.
///
/// Owns the process-wide [`SubAgentPool`] (concurrency + depth enforcement)
/// independently of the per-session `AgentActor` map a calling `AgentLoop`
/// maintains, per the spec's requirement that subagent admission is a
/// process-wide concern, not a per-session one.
pub struct SubagentRunner {
    storage: Arc<dyn Storage>,
    events: Arc<EventStore>,
    tool_runner: Arc<ToolRunner>,
    agents: Arc<AgentRegistry>,
    providers: Arc<dyn ProviderFactory>,
    config: RuntimeConfig,
    pool: Arc<SubAgentPool>,
    parent_session_id: SessionId,
    parent_branch_id: BranchId,
    parent_depth_id: Option<crate::subagent::SubAgentId>,
}

impl SubagentRunner {
    /// Construct a runner scoped to one parent turn's admission context.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        events: Arc<EventStore>,
        tool_runner: Arc<ToolRunner>,
        agents: Arc<AgentRegistry>,
        providers: Arc<dyn ProviderFactory>,
        config: RuntimeConfig,
        pool: Arc<SubAgentPool>,
        parent_session_id: SessionId,
        parent_branch_id: BranchId,
        parent_depth_id: Option<crate::subagent::SubAgentId>,
    ) -> Self {
        Self {
            storage,
            events,
            tool_runner,
            agents,
            providers,
            config,
            pool,
            parent_session_id,
            parent_branch_id,
            parent_depth_id,
        }
    }

    async fn run_once(&self, agent_name: &str, prompt: &str) -> Result<String, String> {
        let parent_session = self
            .storage
            .get_session(self.parent_session_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "parent session not found".to_string())?;

        let child_session = Session::new_subagent(&parent_session);
        self.storage
            .create_session(child_session.clone())
            .await
            .map_err(|e| e.to_string())?;

        let child_branch = Branch::new(child_session.id);
        self.storage
            .create_branch(child_branch.clone())
            .await
            .map_err(|e| e.to_string())?;

        let agent = self
            .agents
            .get(agent_name)
            .cloned()
            .ok_or_else(|| format!("unknown agent definition: {agent_name}"))?;

        let tool_ctx = Arc::new(ToolContext::new(std::path::PathBuf::from(&parent_session.cwd)));

        let actor = Arc::new(AgentActor::new(
            child_session,
            child_branch,
            self.storage.clone(),
            self.events.clone(),
            self.tool_runner.clone(),
            tool_ctx,
            self.agents.clone(),
            self.providers.clone(),
            self.config.clone(),
            agent_name.to_string(),
        ));

        actor.run_turn(prompt.to_string()).await.map_err(|e| e.format_error())?;

        let messages = self
            .storage
            .list_messages(actor.branch_id().await)
            .await
            .map_err(|e| e.to_string())?;

        Ok(extract_last_assistant_text(&messages))
    }
}

#[async_trait::async_trait]
impl SubAgentSpawner for SubagentRunner {
    async fn spawn(&self, request: SubAgentRequest) -> Result<SubAgentResult, String> {
        let start = std::time::Instant::now();
        let timeout = request.timeout.unwrap_or(self.config.subagent.timeout);

        let handle = self
            .pool
            .spawn(request.prompt.as_str(), self.parent_depth_id.clone())
            .await
            .map_err(|e| e.to_string())?;
        handle.mark_running().await;

        self.events.publish(
            self.parent_session_id,
            Some(self.parent_branch_id),
            AgentEvent::SubagentSpawned {
                agent: request.agent.clone(),
                prompt: request.prompt.clone(),
            },
        );

        let cancel_token = self.pool.cancellation_token();
        let mut attempt = 0u32;
        let outcome = loop {
            attempt = attempt.saturating_add(1);
            let attempt_result = tokio::select! {
                biased;
                () = cancel_token.cancelled() => Err("cancelled".to_string()),
                result = tokio::time::timeout(timeout, self.run_once(&request.agent, &request.prompt)) => {
                    match result {
                        Ok(inner) => inner,
                        Err(_elapsed) => Err(format!("subagent timed out after {}s", timeout.as_secs())),
                    }
                }
            };
            match attempt_result {
                Ok(transcript) => break Ok(transcript),
                Err(err) if attempt < self.config.subagent.max_attempts => {
                    warn!(attempt, error = %err, "subagent attempt failed, retrying");
                    continue;
                }
                Err(err) => break Err(err),
            }
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(transcript) => {
                handle.complete(transcript.clone()).await;
                self.events.publish(
                    self.parent_session_id,
                    Some(self.parent_branch_id),
                    AgentEvent::SubagentCompleted {
                        result: SubagentOutcome::Success {
                            transcript: transcript.clone(),
                        },
                    },
                );
                SubAgentResult {
                    success: true,
                    output: transcript,
                    duration_ms,
                    tool_calls: 0,
                    error: None,
                }
            }
            Err(error) => {
                handle.fail(error.clone()).await;
                self.events.publish(
                    self.parent_session_id,
                    Some(self.parent_branch_id),
                    AgentEvent::SubagentCompleted {
                        result: SubagentOutcome::Error { error: error.clone() },
                    },
                );
                SubAgentResult {
                    success: false,
                    output: String::new(),
                    duration_ms,
                    tool_calls: 0,
                    error: Some(error),
                }
            }
        };

        self.pool.release(&handle.id).await;
        Ok(result)
    }
}

fn extract_last_assistant_text(messages: &[conductor_storage::types::Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == conductor_core::Role::Assistant)
        .map(|m| {
            m.parts
                .iter()
                .filter_map(|part| match part {
                    conductor_storage::types::MessagePart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "(subagent produced no text output)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_storage::types::MessagePart;

    fn message(role: conductor_core::Role, text: &str) -> conductor_storage::types::Message {
        conductor_storage::types::Message::new(
            SessionId::new(),
            BranchId::new(),
            role,
            vec![MessagePart::Text { text: text.to_string() }],
        )
    }

    #[test]
    fn extracts_last_assistant_text() {
        let messages = vec![
            message(conductor_core::Role::User, "hi"),
            message(conductor_core::Role::Assistant, "first"),
            message(conductor_core::Role::User, "more"),
            message(conductor_core::Role::Assistant, "final"),
        ];
        assert_eq!(extract_last_assistant_text(&messages), "final");
    }

    #[test]
    fn no_assistant_message_falls_back() {
        let messages = vec![message(conductor_core::Role::User, "hi")];
        assert_eq!(
            extract_last_assistant_text(&messages),
            "(subagent produced no text output)"
        );
    }
}
