//! `AgentActor` — the per-`(session, branch)` turn loop (spec §4.D).
//!
//! One actor owns exactly one branch: it is the branch's single writer
//! (spec §5), serializing the stream/tool-dispatch/persistence sequence of
//! a turn onto one task. `AgentLoop` (the next layer up) owns the
//! `(session, branch) -> actor` map and routes `run`/`steer`/`respond*` RPCs
//! to the right instance; this module only has to get one turn right.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use conductor_core::{BranchId, RequestId, Role, SessionId, ToolCallId};
use conductor_core::retry::{RetryOutcome, retry};
use conductor_events::{AgentEvent, EventStore};
use conductor_llm::{
    ContentPart, LlmError, LlmProvider, LlmToolDefinition, Message as LlmMessage, MessageContent,
    MessageRole, StreamEvent, ToolCall, ToolCallResult,
};
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Message, MessageKind, MessagePart, Session, ToolOutput};
use conductor_tools::ToolContext;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::agent_def::{AgentDefinition, AgentKind, AgentRegistry};
use crate::compaction;
use crate::config::RuntimeConfig;
use crate::deferred::DeferredSlots;
use crate::error::{RuntimeError, RuntimeResult};
use crate::tool_runner::{ToolInvocation, ToolRunner};

/// Resolves a model identifier (branch override, agent default, or a
/// `SwitchModel` steer) to a concrete provider. `conductor-llm` deliberately
/// stops at "one provider instance per model"; multi-model resolution is an
/// embedding-application concern, so the seam lives here rather than being
/// retrofitted into that crate.
pub trait ProviderFactory: Send + Sync {
    /// Look up the provider backing `model`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownAgent`]-adjacent errors via
    /// [`RuntimeError::Provider`] wrapping [`LlmError::ModelNotSupported`]
    /// when `model` isn't registered.
    fn provider_for(&self, model: &str) -> RuntimeResult<Arc<dyn LlmProvider>>;
}

/// How a newly submitted message should be applied to an actor (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Enqueue behind the currently running turn; the queued message starts
    /// a fresh turn once the current one completes. The default.
    Queue,
    /// Inject into the currently running turn, visible to the agent at its
    /// next step, without waiting for the turn to end.
    Interject,
}

/// A message submitted to an actor via `run` (spec §6 `sendMessage`).
#[derive(Debug, Clone)]
pub struct RunMessage {
    /// The message text.
    pub content: String,
    /// Queue vs. interject.
    pub mode: SubmitMode,
    /// Per-message model override, if the caller is switching models inline.
    pub model: Option<String>,
}

/// A steering command addressed to one running (or idle) actor (spec §4.E).
#[derive(Debug, Clone)]
pub enum SteerCommand {
    /// Stop at the next safe point; emits `StreamEnded { interrupted: true }`.
    Cancel,
    /// Like `Cancel`, but also clears any queued/interjected messages.
    Interrupt,
    /// Inject a message into the current turn.
    Interject {
        /// The message text.
        message: String,
    },
    /// Switch the active agent definition for the next turn.
    SwitchAgent {
        /// Name of the agent definition to switch to.
        agent: String,
    },
    /// Switch the branch's model preference.
    SwitchModel {
        /// New model identifier.
        model: String,
    },
    /// Enter or leave plan mode.
    SwitchMode {
        /// Target mode.
        mode: AgentKind,
    },
}

/// A client's answer to a suspended `PlanPresented` prompt.
#[derive(Debug, Clone)]
pub enum PlanDecision {
    /// The plan was approved; the actor resumes normal tool dispatch.
    Confirm,
    /// The plan was rejected; the turn ends without further tool calls.
    Reject {
        /// Optional human-readable reason.
        reason: Option<String>,
    },
}

struct PendingToolCall {
    provider_id: String,
    our_id: ToolCallId,
    name: String,
    args_buf: String,
}

/// The per-`(session, branch)` turn loop.
pub struct AgentActor {
    session: RwLock<Session>,
    branch: RwLock<Branch>,
    storage: Arc<dyn Storage>,
    events: Arc<EventStore>,
    tool_runner: Arc<ToolRunner>,
    tool_ctx: Arc<ToolContext>,
    agents: Arc<AgentRegistry>,
    providers: Arc<dyn ProviderFactory>,
    config: RuntimeConfig,
    current_agent: RwLock<String>,
    plan_mode: AtomicBool,
    cancel: Mutex<CancellationToken>,
    interjections: Mutex<Vec<String>>,
    questions: DeferredSlots<Vec<Vec<String>>>,
    plans: DeferredSlots<PlanDecision>,
    /// Held for the duration of `run_turn`/`compact_now`, so a `Queue`d
    /// submit arriving while a turn is already running waits for it to
    /// finish instead of racing it onto the same branch (spec §4.E, §5).
    turn_lock: Mutex<()>,
}

impl AgentActor {
    /// Construct an actor bound to one session's branch, starting with
    /// `initial_agent` as the active agent definition.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Session,
        branch: Branch,
        storage: Arc<dyn Storage>,
        events: Arc<EventStore>,
        tool_runner: Arc<ToolRunner>,
        tool_ctx: Arc<ToolContext>,
        agents: Arc<AgentRegistry>,
        providers: Arc<dyn ProviderFactory>,
        config: RuntimeConfig,
        initial_agent: impl Into<String>,
    ) -> Self {
        Self {
            session: RwLock::new(session),
            branch: RwLock::new(branch),
            storage,
            events,
            tool_runner,
            tool_ctx,
            agents,
            providers,
            config,
            current_agent: RwLock::new(initial_agent.into()),
            plan_mode: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            interjections: Mutex::new(Vec::new()),
            questions: DeferredSlots::new(),
            plans: DeferredSlots::new(),
            turn_lock: Mutex::new(()),
        }
    }

    /// The session id this actor is bound to.
    pub async fn session_id(&self) -> SessionId {
        self.session.read().await.id
    }

    /// The branch id this actor is bound to.
    pub async fn branch_id(&self) -> BranchId {
        self.branch.read().await.id
    }

    /// The currently active agent definition's name (spec §6
    /// `getSessionState`).
    pub async fn current_agent(&self) -> String {
        self.current_agent.read().await.clone()
    }

    /// Suspended-question slots, for `respondQuestions` routing.
    #[must_use]
    pub fn questions(&self) -> &DeferredSlots<Vec<Vec<String>>> {
        &self.questions
    }

    /// Suspended-plan slots, for `respondPlan` routing.
    #[must_use]
    pub fn plans(&self) -> &DeferredSlots<PlanDecision> {
        &self.plans
    }

    /// Stop the current turn at its next safe point. Idempotent: a no-op if
    /// no turn is running or it has already ended.
    pub async fn cancel(&self) {
        self.cancel.lock().await.cancel();
    }

    /// Like [`Self::cancel`], but also drops any queued interjections so
    /// they don't leak into a future turn.
    pub async fn interrupt(&self) {
        self.cancel().await;
        self.interjections.lock().await.clear();
    }

    /// Queue `text` to be injected as a user message before the current
    /// turn's next provider round-trip.
    pub async fn interject(&self, text: String) {
        self.interjections.lock().await.push(text);
    }

    /// Switch the active agent definition, effective for the next turn.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownAgent`] if `name` isn't registered.
    pub async fn switch_agent(&self, name: String) -> RuntimeResult<()> {
        if self.agents.get(&name).is_none() {
            return Err(RuntimeError::UnknownAgent(name));
        }
        let session_id = self.session_id().await;
        let branch_id = self.branch_id().await;
        let from_agent = {
            let mut current = self.current_agent.write().await;
            std::mem::replace(&mut *current, name.clone())
        };
        self.events.publish(
            session_id,
            Some(branch_id),
            AgentEvent::AgentSwitched { from_agent, to_agent: name },
        );
        Ok(())
    }

    /// Switch the branch's model preference, persisting it immediately
    /// (the branch has exactly one writer: this actor).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`RuntimeError::Storage`] error if persisting
    /// fails.
    pub async fn switch_model(&self, model: String) -> RuntimeResult<()> {
        let mut branch = self.branch.write().await;
        branch.model = Some(model);
        self.storage.update_branch(branch.clone()).await?;
        Ok(())
    }

    /// Enter or leave plan mode.
    pub async fn switch_mode(&self, mode: AgentKind) -> RuntimeResult<()> {
        let session_id = self.session_id().await;
        let branch_id = self.branch_id().await;
        let entering_plan = matches!(mode, AgentKind::Plan);
        self.plan_mode.store(entering_plan, Ordering::SeqCst);
        self.events.publish(
            session_id,
            Some(branch_id),
            if entering_plan {
                AgentEvent::PlanModeEntered
            } else {
                AgentEvent::PlanModeExited
            },
        );
        Ok(())
    }

    /// Force an immediate compaction of this branch's stored history into a
    /// single summary message, persisted on `Branch.summary` (spec §6
    /// `compactBranch`). Unlike the per-turn compaction in [`Self::run_turn`],
    /// this runs outside of any turn and its result is durable.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Provider`] if summarization fails, or a
    /// storage error if persisting the summary fails.
    pub async fn compact_now(&self) -> RuntimeResult<()> {
        let _turn_guard = self.turn_lock.lock().await;

        let session = self.session.read().await.clone();
        let mut branch = self.branch.write().await;

        let agent_name = self.current_agent.read().await.clone();
        let agent = self
            .agents
            .get(&agent_name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownAgent(agent_name))?;
        let model = branch.model.clone().unwrap_or_else(|| agent.default_model.clone());
        let provider = self.providers.provider_for(&model)?;

        let stored = self.storage.list_messages(branch.id).await?;
        let mut llm_messages = to_llm_messages(&stored);
        compaction::summarize_prefix(provider.as_ref(), &mut llm_messages, 0)
            .await
            .map_err(|source| RuntimeError::Provider { model, source })?;

        let summary = llm_messages
            .first()
            .and_then(|m| match &m.content {
                conductor_llm::MessageContent::Text(text) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default();

        branch.summary = Some(summary.clone());
        self.storage.update_branch(branch.clone()).await?;
        self.events
            .publish(session.id, Some(branch.id), AgentEvent::BranchCompacted { summary });
        Ok(())
    }

    fn tool_definitions(&self, agent: &AgentDefinition) -> Vec<LlmToolDefinition> {
        let mut defs = self.tool_runner.tool_definitions(agent);
        defs.push(
            LlmToolDefinition::new("ask_questions")
                .with_description("Ask the user one or more clarifying questions and await answers before continuing.")
                .with_schema(serde_json::json!({
                    "type": "object",
                    "properties": {"questions": {"type": "array", "items": {"type": "string"}}},
                    "required": ["questions"],
                })),
        );
        if matches!(agent.kind, AgentKind::Plan) || self.plan_mode.load(Ordering::Relaxed) {
            defs.push(
                LlmToolDefinition::new("present_plan")
                    .with_description("Present a plan for user approval before taking any further action.")
                    .with_schema(serde_json::json!({
                        "type": "object",
                        "properties": {"plan": {"type": "string"}},
                        "required": ["plan"],
                    })),
            );
        }
        defs
    }

    /// Run one turn to completion: persist the incoming message, loop over
    /// provider round-trips and tool dispatch, and return once the agent
    /// stops calling tools, is cancelled, or the iteration cap is hit.
    ///
    /// Serialized by `turn_lock`: a call arriving while another is already
    /// running (two `Queue`d submits, or a queue behind an in-flight turn)
    /// waits for it to return before starting, rather than racing it onto
    /// the same branch.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] on unrecoverable storage, event, or
    /// (after retry exhaustion) provider failures. Tool failures never
    /// surface here: they're rendered as `ToolOutput::ErrorJson` and the
    /// turn continues.
    pub async fn run_turn(&self, content: String) -> RuntimeResult<()> {
        let _turn_guard = self.turn_lock.lock().await;

        let token = CancellationToken::new();
        *self.cancel.lock().await = token.clone();

        let session = self.session.read().await.clone();
        let branch = self.branch.read().await.clone();

        let user_message = Message::new(session.id, branch.id, Role::User, vec![MessagePart::Text { text: content }]);
        self.storage.create_message(user_message).await?;
        self.events
            .publish(session.id, Some(branch.id), AgentEvent::MessageReceived { role: Role::User });

        let agent_name = self.current_agent.read().await.clone();
        let agent = self
            .agents
            .get(&agent_name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownAgent(agent_name))?;

        let model = branch.model.clone().unwrap_or_else(|| agent.default_model.clone());
        let provider = self.providers.provider_for(&model)?;

        let mut iteration = 0u32;
        loop {
            if token.is_cancelled() {
                self.events.publish(
                    session.id,
                    Some(branch.id),
                    AgentEvent::StreamEnded { usage: None, interrupted: true },
                );
                return Ok(());
            }

            iteration += 1;
            if iteration > self.config.max_turn_iterations {
                let marker = Message::new(
                    session.id,
                    branch.id,
                    Role::Assistant,
                    vec![MessagePart::Text {
                        text: "(turn ended: reached the maximum number of tool round-trips)".to_string(),
                    }],
                );
                self.storage.create_message(marker).await?;
                self.events.publish(
                    session.id,
                    Some(branch.id),
                    AgentEvent::StreamEnded { usage: None, interrupted: false },
                );
                return Ok(());
            }

            for text in std::mem::take(&mut *self.interjections.lock().await) {
                let mut message = Message::new(session.id, branch.id, Role::User, vec![MessagePart::Text { text }]);
                message.kind = MessageKind::Interjection;
                self.storage.create_message(message).await?;
            }

            let stored = self.storage.list_messages(branch.id).await?;
            let mut llm_messages = to_llm_messages(&stored);
            if compaction::estimate_message_tokens(&llm_messages) > self.config.compaction.budget_tokens {
                compaction::prune_tool_outputs(&mut llm_messages, self.config.compaction.prune_protect_tokens);
            }
            if compaction::estimate_message_tokens(&llm_messages) > self.config.compaction.budget_tokens {
                let keep_recent = llm_messages.len() / 2;
                let _ = compaction::summarize_prefix(provider.as_ref(), &mut llm_messages, keep_recent).await;
            }

            let tool_defs = self.tool_definitions(&agent);

            let stream_outcome = retry(
                self.config.retry,
                |_attempt| provider.stream(&llm_messages, &tool_defs, &agent.system_prompt),
                LlmError::is_retryable,
            )
            .await;

            let mut stream = match stream_outcome {
                RetryOutcome::Success(stream) => stream,
                RetryOutcome::Exhausted(err) => {
                    self.events
                        .publish(session.id, Some(branch.id), AgentEvent::ErrorOccurred { error: err.to_string() });
                    self.events.publish(
                        session.id,
                        Some(branch.id),
                        AgentEvent::StreamEnded { usage: None, interrupted: false },
                    );
                    return Err(RuntimeError::Provider { model, source: err });
                }
            };

            self.events.publish(session.id, Some(branch.id), AgentEvent::StreamStarted);

            let mut text_buf = String::new();
            let mut usage = None;
            let mut interrupted = false;
            let mut calls: Vec<PendingToolCall> = Vec::new();
            let mut stream_error: Option<String> = None;

            let deadline = tokio::time::sleep(self.config.stream_timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    () = &mut deadline => {
                        stream_error = Some(format!(
                            "stream timed out after {}s with no terminal event",
                            self.config.stream_timeout.as_secs(),
                        ));
                        break;
                    }
                    next = stream.next() => {
                        let Some(event) = next else { break };
                        match event {
                            Ok(StreamEvent::TextDelta(chunk)) => {
                                text_buf.push_str(&chunk);
                                self.events.publish(session.id, Some(branch.id), AgentEvent::StreamChunk { chunk });
                            }
                            Ok(StreamEvent::ReasoningDelta(_)) => {}
                            Ok(StreamEvent::ToolCallStart { id, name }) => {
                                if !calls.iter().any(|c| c.provider_id == id) {
                                    calls.push(PendingToolCall {
                                        provider_id: id,
                                        our_id: ToolCallId::new(),
                                        name,
                                        args_buf: String::new(),
                                    });
                                }
                            }
                            Ok(StreamEvent::ToolCallDelta { id, args_delta }) => {
                                if let Some(call) = calls.iter_mut().find(|c| c.provider_id == id) {
                                    call.args_buf.push_str(&args_delta);
                                }
                            }
                            Ok(StreamEvent::ToolCallEnd { .. }) => {}
                            Ok(StreamEvent::Finish { usage: u, .. }) => {
                                usage = u;
                                break;
                            }
                            Ok(StreamEvent::Error(message)) => {
                                stream_error = Some(message);
                                break;
                            }
                            Err(err) => {
                                stream_error = Some(err.to_string());
                                break;
                            }
                        }
                    }
                }
            }

            if let Some(message) = stream_error {
                self.events
                    .publish(session.id, Some(branch.id), AgentEvent::ErrorOccurred { error: message.clone() });
                self.events.publish(
                    session.id,
                    Some(branch.id),
                    AgentEvent::StreamEnded { usage: None, interrupted: false },
                );
                return Err(RuntimeError::Provider { model, source: LlmError::StreamingError(message) });
            }

            let finalized: Vec<(ToolCallId, String, Value)> = calls
                .into_iter()
                .map(|call| {
                    let input = serde_json::from_str(&call.args_buf).unwrap_or_else(|_| serde_json::json!({}));
                    (call.our_id, call.name, input)
                })
                .collect();

            if interrupted && !text_buf.is_empty() {
                text_buf.push_str(" (interrupted)");
            }

            let mut assistant_parts = Vec::new();
            if !text_buf.is_empty() {
                assistant_parts.push(MessagePart::Text { text: text_buf });
            }
            for (tool_call_id, tool_name, input) in &finalized {
                assistant_parts.push(MessagePart::ToolCall {
                    tool_call_id: *tool_call_id,
                    tool_name: tool_name.clone(),
                    input: input.clone(),
                });
            }
            if !assistant_parts.is_empty() {
                let assistant_message = Message::new(session.id, branch.id, Role::Assistant, assistant_parts);
                self.storage.create_message(assistant_message).await?;
            }

            self.events.publish(
                session.id,
                Some(branch.id),
                AgentEvent::StreamEnded { usage: usage.map(to_core_usage), interrupted },
            );

            if interrupted {
                return Ok(());
            }
            if finalized.is_empty() {
                return Ok(());
            }

            let (turn_ends, asked_answers) = self.dispatch_tool_calls(&session, &branch, &agent, finalized).await?;
            if let Some(answers) = asked_answers {
                let mut answer_message = Message::new(
                    session.id,
                    branch.id,
                    Role::User,
                    vec![MessagePart::Text {
                        text: serde_json::to_string(&answers).unwrap_or_default(),
                    }],
                );
                answer_message.kind = MessageKind::Interjection;
                self.storage.create_message(answer_message).await?;
            }
            if turn_ends {
                return Ok(());
            }
        }
    }

    /// Dispatch one round's tool calls, handling the `ask_questions` and
    /// `present_plan` control-flow tools inline and everything else via the
    /// `ToolRunner`. Returns whether the turn should end (a plan was
    /// rejected) and any question answers obtained this round.
    async fn dispatch_tool_calls(
        &self,
        session: &Session,
        branch: &Branch,
        agent: &AgentDefinition,
        calls: Vec<(ToolCallId, String, Value)>,
    ) -> RuntimeResult<(bool, Option<Vec<Vec<String>>>)> {
        let mut tool_result_parts = Vec::new();
        let mut asked_answers = None;
        let mut turn_ends = false;

        for (tool_call_id, tool_name, input) in calls {
            if turn_ends {
                break;
            }
            match tool_name.as_str() {
                "ask_questions" => {
                    let questions: Vec<String> = input
                        .get("questions")
                        .and_then(Value::as_array)
                        .map(|items| items.iter().filter_map(|q| q.as_str().map(str::to_string)).collect())
                        .unwrap_or_default();
                    let request_id = RequestId::new();
                    let receiver = self.questions.register(request_id);
                    self.events.publish(
                        session.id,
                        Some(branch.id),
                        AgentEvent::QuestionsAsked { request_id, questions },
                    );
                    let output = match self.questions.wait(request_id, receiver, self.config.prompt_timeout).await {
                        Ok(answers) => {
                            let value = serde_json::json!({ "answers": answers });
                            asked_answers = Some(answers);
                            ToolOutput::Json { value }
                        }
                        Err(_) => ToolOutput::error("no answer received before timeout"),
                    };
                    tool_result_parts.push(MessagePart::ToolResult { tool_call_id, tool_name, output });
                }
                "present_plan" => {
                    let plan = input.get("plan").and_then(Value::as_str).unwrap_or_default().to_string();
                    let request_id = RequestId::new();
                    let receiver = self.plans.register(request_id);
                    self.events
                        .publish(session.id, Some(branch.id), AgentEvent::PlanPresented { request_id, plan });
                    let output = match self.plans.wait(request_id, receiver, self.config.prompt_timeout).await {
                        Ok(PlanDecision::Confirm) => {
                            self.plan_mode.store(false, Ordering::SeqCst);
                            self.events.publish(session.id, Some(branch.id), AgentEvent::PlanModeExited);
                            ToolOutput::Json { value: serde_json::json!({"decision": "confirm"}) }
                        }
                        Ok(PlanDecision::Reject { reason }) => {
                            turn_ends = true;
                            ToolOutput::Json { value: serde_json::json!({"decision": "reject", "reason": reason}) }
                        }
                        Err(_) => ToolOutput::error("no plan decision received before timeout"),
                    };
                    tool_result_parts.push(MessagePart::ToolResult { tool_call_id, tool_name, output });
                }
                _ => {
                    let invocation = ToolInvocation { tool_call_id, tool_name: tool_name.clone(), input };
                    let output = self
                        .tool_runner
                        .run(session, branch.id, agent, &self.tool_ctx, invocation)
                        .await;
                    tool_result_parts.push(MessagePart::ToolResult { tool_call_id, tool_name, output });
                }
            }
        }

        if !tool_result_parts.is_empty() {
            let tool_message = Message::new(session.id, branch.id, Role::Tool, tool_result_parts);
            self.storage.create_message(tool_message).await?;
        }

        Ok((turn_ends, asked_answers))
    }
}

/// Convert a branch's stored history into the flat message list a provider
/// expects. Storage messages can bundle text and tool calls in one record;
/// `conductor_llm::Message` can't, so a single stored message may expand
/// into more than one provider message, in order.
fn to_llm_messages(messages: &[Message]) -> Vec<LlmMessage> {
    let mut out = Vec::new();

    for message in messages {
        match message.role {
            Role::User | Role::Assistant => {
                let mut text = String::new();
                let mut images = Vec::new();
                let mut tool_calls = Vec::new();

                for part in &message.parts {
                    match part {
                        MessagePart::Text { text: t } => text.push_str(t),
                        MessagePart::Image { mime_type, data } => {
                            images.push(ContentPart::Image { data: data.clone(), media_type: mime_type.clone() });
                        }
                        MessagePart::ToolCall { tool_call_id, tool_name, input } => {
                            tool_calls.push(ToolCall::new(tool_call_id.to_string(), tool_name.clone()).with_arguments(input.clone()));
                        }
                        MessagePart::ToolResult { .. } => {}
                    }
                }

                if !tool_calls.is_empty() {
                    out.push(LlmMessage::assistant_with_tools(tool_calls));
                }

                let role = if matches!(message.role, Role::User) { MessageRole::User } else { MessageRole::Assistant };
                if !images.is_empty() {
                    let mut parts = Vec::new();
                    if !text.is_empty() {
                        parts.push(ContentPart::Text { text });
                    }
                    parts.extend(images);
                    out.push(LlmMessage { role, content: MessageContent::MultiPart(parts) });
                } else if !text.is_empty() {
                    out.push(LlmMessage { role, content: MessageContent::Text(text) });
                }
            }
            Role::Tool => {
                for part in &message.parts {
                    if let MessagePart::ToolResult { tool_call_id, output, .. } = part {
                        let (content, is_error) = match output {
                            ToolOutput::Json { value } => (value_to_text(value), false),
                            ToolOutput::ErrorJson { value } => (value_to_text(value), true),
                        };
                        out.push(LlmMessage::tool_result(ToolCallResult {
                            call_id: tool_call_id.to_string(),
                            content,
                            is_error,
                        }));
                    }
                }
            }
            Role::System => {}
        }
    }

    out
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_core_usage(usage: conductor_llm::Usage) -> conductor_core::Usage {
    conductor_core::Usage {
        input_tokens: u64::try_from(usage.input_tokens).unwrap_or(u64::MAX),
        output_tokens: u64::try_from(usage.output_tokens).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_events::EventStore;
    use conductor_permission::{AllowAll, PendingPermissions};
    use conductor_tools::ToolRegistry;
    use std::path::PathBuf;
    use std::time::Duration;

    struct StubProvider {
        model: String,
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            &self.model
        }

        async fn stream(
            &self,
            _messages: &[LlmMessage],
            _tools: &[LlmToolDefinition],
            _system: &str,
        ) -> conductor_llm::LlmResult<conductor_llm::StreamBox> {
            let events = vec![
                Ok(StreamEvent::TextDelta("hi there".to_string())),
                Ok(StreamEvent::Finish {
                    reason: conductor_llm::StopReason::EndTurn,
                    usage: Some(conductor_llm::Usage { input_tokens: 1, output_tokens: 1 }),
                }),
            ];
            Ok(Box::pin(futures::stream::iter(events)))
        }

        async fn complete(
            &self,
            _messages: &[LlmMessage],
            _tools: &[LlmToolDefinition],
            _system: &str,
        ) -> conductor_llm::LlmResult<conductor_llm::LlmResponse> {
            unimplemented!("not exercised by these tests")
        }

        fn count_tokens(&self, text: &str) -> usize {
            text.len()
        }

        fn max_context_length(&self) -> usize {
            100_000
        }
    }

    struct StubFactory;

    impl ProviderFactory for StubFactory {
        fn provider_for(&self, model: &str) -> RuntimeResult<Arc<dyn LlmProvider>> {
            Ok(Arc::new(StubProvider { model: model.to_string() }))
        }
    }

    fn actor() -> AgentActor {
        let session = Session::new("/workspace");
        let branch = Branch::new(session.id);
        let storage: Arc<dyn Storage> = Arc::new(conductor_storage::MemoryStorage::new());
        let events = Arc::new(EventStore::new());
        let tool_runner = Arc::new(ToolRunner::new(
            Arc::new(ToolRegistry::with_defaults()),
            Arc::new(AllowAll),
            Arc::new(PendingPermissions::new()),
            events.clone(),
            Duration::from_millis(200),
        ));
        let tool_ctx = Arc::new(ToolContext::new(PathBuf::from("/tmp")));
        let agents = Arc::new(AgentRegistry::with_default_agent("stub-model"));

        AgentActor::new(
            session,
            branch,
            storage,
            events,
            tool_runner,
            tool_ctx,
            agents,
            Arc::new(StubFactory),
            RuntimeConfig::default(),
            "default",
        )
    }

    #[tokio::test]
    async fn turn_with_no_tool_calls_ends_after_one_round_trip() {
        let actor = actor();
        actor.run_turn("hello".to_string()).await.unwrap();

        let branch_id = actor.branch_id().await;
        let messages = actor.storage.list_messages(branch_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].role, Role::User));
        assert!(matches!(messages[1].role, Role::Assistant));
    }

    #[tokio::test]
    async fn switch_agent_rejects_unknown_name() {
        let actor = actor();
        let err = actor.switch_agent("nonexistent".to_string()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownAgent(_)));
    }

    #[tokio::test]
    async fn switch_model_persists_on_branch() {
        let actor = actor();
        actor.switch_model("gpt-5".to_string()).await.unwrap();
        let branch_id = actor.branch_id().await;
        let branch = actor.storage.get_branch(branch_id).await.unwrap().unwrap();
        assert_eq!(branch.model.as_deref(), Some("gpt-5"));
    }

    #[tokio::test]
    async fn cancel_before_run_turn_ends_turn_as_interrupted() {
        let actor = actor();
        actor.cancel().await;
        actor.run_turn("hello".to_string()).await.unwrap();
        let branch_id = actor.branch_id().await;
        let messages = actor.storage.list_messages(branch_id).await.unwrap();
        // Only the user message was persisted; the cancelled turn never
        // reached the assistant round-trip.
        assert_eq!(messages.len(), 1);
    }
}
