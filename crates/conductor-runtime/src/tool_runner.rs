//! `ToolRunner` (spec §4.C): resolves a tool call against the registry,
//! gates it through `Permission`, dispatches respecting the tool's declared
//! concurrency class, and renders the result as a `ToolOutput`.
//!
//! Emits `ToolCallStarted`/`ToolCallCompleted` directly — both are pure
//! function-of-call-and-result events with no suspend/resume semantics of
//! their own, so there's no reason to push them back up to the caller the
//! way `PermissionRequested` is.

use std::sync::Arc;
use std::time::Duration;

use conductor_core::{SessionId, ToolCallId};
use conductor_events::EventStore;
use conductor_events::event::AgentEvent;
use conductor_permission::{PendingPermissions, PermissionDecision, PermissionHandler, PermissionVerdict};
use conductor_storage::types::{Session, ToolOutput};
use conductor_tools::{Concurrency, ToolContext, ToolRegistry};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::agent_def::AgentDefinition;

/// A single tool call awaiting dispatch.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Correlates the eventual `ToolCallCompleted` with this call.
    pub tool_call_id: ToolCallId,
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Validated tool input.
    pub input: Value,
}

/// Dispatches tool calls for a turn: registry lookup, permission gating,
/// concurrency-class scheduling, and result rendering.
pub struct ToolRunner {
    tools: Arc<ToolRegistry>,
    permissions: Arc<dyn PermissionHandler>,
    pending: Arc<PendingPermissions>,
    events: Arc<EventStore>,
    serial_locks: DashMap<SessionId, Arc<AsyncMutex<()>>>,
    ask_timeout: Duration,
}

impl ToolRunner {
    /// Construct a `ToolRunner` over a shared tool registry, permission
    /// handler, and event store.
    #[must_use]
    pub fn new(
        tools: Arc<ToolRegistry>,
        permissions: Arc<dyn PermissionHandler>,
        pending: Arc<PendingPermissions>,
        events: Arc<EventStore>,
        ask_timeout: Duration,
    ) -> Self {
        Self {
            tools,
            permissions,
            pending,
            events,
            serial_locks: DashMap::new(),
            ask_timeout,
        }
    }

    /// Tool definitions visible to `agent`, for inclusion in a provider
    /// request's tool schema list.
    #[must_use]
    pub fn tool_definitions(&self, agent: &AgentDefinition) -> Vec<conductor_llm::LlmToolDefinition> {
        self.tools
            .all_definitions()
            .into_iter()
            .filter(|def| agent.allows_tool(&def.name))
            .collect()
    }

    fn serial_lock_for(&self, session_id: SessionId) -> Arc<AsyncMutex<()>> {
        self.serial_locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Run one tool call to completion, publishing `ToolCallStarted` and
    /// `ToolCallCompleted` on the session's event stream.
    ///
    /// `bypass` (the session's `Session.bypass` flag) skips the permission
    /// check entirely — the caller has already opted the session out of
    /// prompting.
    pub async fn run(
        &self,
        session: &Session,
        branch_id: conductor_core::BranchId,
        agent: &AgentDefinition,
        ctx: &ToolContext,
        invocation: ToolInvocation,
    ) -> ToolOutput {
        self.events.publish(
            session.id,
            Some(branch_id),
            AgentEvent::ToolCallStarted {
                tool_call_id: invocation.tool_call_id,
                tool_name: invocation.tool_name.clone(),
                input: invocation.input.clone(),
            },
        );

        let output = self.dispatch(session, agent, ctx, &invocation).await;

        self.events.publish(
            session.id,
            Some(branch_id),
            AgentEvent::ToolCallCompleted {
                tool_call_id: invocation.tool_call_id,
                summary: None,
                output: output_value(&output),
                is_error: output.is_error(),
            },
        );

        output
    }

    async fn dispatch(
        &self,
        session: &Session,
        agent: &AgentDefinition,
        ctx: &ToolContext,
        invocation: &ToolInvocation,
    ) -> ToolOutput {
        if !agent.allows_tool(&invocation.tool_name) {
            return ToolOutput::error(format!(
                "tool '{}' is not available to agent '{}'",
                invocation.tool_name, agent.name
            ));
        }

        let Some(tool) = self.tools.get(&invocation.tool_name) else {
            return ToolOutput::error(format!("unknown tool: {}", invocation.tool_name));
        };

        if !session.bypass {
            match self.permissions.check(&invocation.tool_name, &invocation.input).await {
                PermissionDecision::Deny { reason } => return ToolOutput::error(reason),
                PermissionDecision::Ask => {
                    if let Some(output) = self.ask(session, &invocation.tool_name, &invocation.input).await {
                        return output;
                    }
                }
                PermissionDecision::Allow => {}
            }
        }

        match tool.concurrency() {
            Concurrency::Serial => {
                let lock = self.serial_lock_for(session.id);
                let _guard = lock.lock().await;
                self.invoke(tool, invocation.input.clone(), ctx).await
            }
            Concurrency::Parallel => self.invoke(tool, invocation.input.clone(), ctx).await,
        }
    }

    /// Register and await a suspended `ask` decision. Returns `Some(output)`
    /// if the call should stop here (denied or timed out), or `None` if it
    /// was approved and dispatch should proceed.
    async fn ask(&self, session: &Session, tool_name: &str, input: &Value) -> Option<ToolOutput> {
        let request_id = conductor_core::RequestId::new();
        let receiver = self.pending.register(request_id);

        self.events.publish(
            session.id,
            None,
            AgentEvent::PermissionRequested {
                request_id,
                tool: tool_name.to_string(),
                input: input.clone(),
            },
        );

        match self.pending.wait(request_id, receiver, self.ask_timeout).await {
            Ok(PermissionVerdict::Allow) => None,
            Ok(PermissionVerdict::Deny { reason }) => {
                Some(ToolOutput::error(reason.unwrap_or_else(|| "denied by user".to_string())))
            }
            Err(_) => Some(ToolOutput::error("permission request timed out")),
        }
    }

    async fn invoke(&self, tool: &dyn conductor_tools::BuiltinTool, input: Value, ctx: &ToolContext) -> ToolOutput {
        match tool.execute(input, ctx).await {
            Ok(text) => ToolOutput::Json {
                value: Value::String(conductor_tools::truncate_output(text)),
            },
            Err(err) => ToolOutput::error(err.to_string()),
        }
    }
}

fn output_value(output: &ToolOutput) -> Value {
    match output {
        ToolOutput::Json { value } | ToolOutput::ErrorJson { value } => value.clone(),
    }
}
