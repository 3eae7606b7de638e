//! `AgentLoop` (spec §4.E): the process-wide registry mapping
//! `(sessionId, branchId)` to a live `AgentActor`, and the entry point for
//! `run`/`steer`/`respondQuestions`/`respondPermission`/`respondPlan`.
//!
//! Each actor owns its own cancellation token and deferred-prompt slots;
//! `steer` and the `respond*` calls only ever reach the one actor they're
//! addressed to. Subagent admission is deliberately NOT part of this map —
//! it's delegated to the process-wide `SubagentRunner`/`SubAgentPool`, per
//! the spec's requirement that subagent concurrency is bounded globally,
//! not per session.

use std::sync::Arc;

use conductor_core::{BranchId, RequestId, SessionId};
use conductor_events::EventStore;
use conductor_permission::{PendingPermissions, PermissionVerdict};
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Session};
use dashmap::DashMap;
use tracing::warn;

use crate::actor::{AgentActor, PlanDecision, ProviderFactory, RunMessage, SteerCommand, SubmitMode};
use crate::agent_def::AgentRegistry;
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::tool_runner::ToolRunner;

type ActorKey = (SessionId, BranchId);

/// Registry of live actors, keyed by the session/branch they own.
pub struct AgentLoop {
    storage: Arc<dyn Storage>,
    events: Arc<EventStore>,
    tool_runner: Arc<ToolRunner>,
    tool_ctx: Arc<conductor_tools::ToolContext>,
    agents: Arc<AgentRegistry>,
    providers: Arc<dyn ProviderFactory>,
    permissions: Arc<PendingPermissions>,
    config: RuntimeConfig,
    actors: DashMap<ActorKey, Arc<AgentActor>>,
    request_owners: Arc<DashMap<RequestId, ActorKey>>,
}

impl AgentLoop {
    /// Construct an empty registry over the shared collaborators every
    /// actor it spawns will be built from.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        events: Arc<EventStore>,
        tool_runner: Arc<ToolRunner>,
        tool_ctx: Arc<conductor_tools::ToolContext>,
        agents: Arc<AgentRegistry>,
        providers: Arc<dyn ProviderFactory>,
        permissions: Arc<PendingPermissions>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            storage,
            events,
            tool_runner,
            tool_ctx,
            agents,
            providers,
            permissions,
            config,
            actors: DashMap::new(),
            request_owners: Arc::new(DashMap::new()),
        }
    }

    /// Fetch (or lazily create) the actor owning `(session_id, branch_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the session or branch doesn't
    /// exist, and [`RuntimeError::UnknownAgent`] if `default_agent` isn't
    /// registered.
    pub async fn actor_for(
        &self,
        session_id: SessionId,
        branch_id: BranchId,
        default_agent: &str,
    ) -> RuntimeResult<Arc<AgentActor>> {
        let key = (session_id, branch_id);
        if let Some(actor) = self.actors.get(&key) {
            return Ok(actor.clone());
        }

        let session = self
            .storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| RuntimeError::Storage(conductor_storage::StorageError::NotFound(session_id.to_string())))?;
        let branch = self
            .storage
            .get_branch(branch_id)
            .await?
            .ok_or_else(|| RuntimeError::Storage(conductor_storage::StorageError::NotFound(branch_id.to_string())))?;

        self.spawn_actor(session, branch, default_agent)
    }

    fn spawn_actor(&self, session: Session, branch: Branch, default_agent: &str) -> RuntimeResult<Arc<AgentActor>> {
        let key = (session.id, branch.id);
        if self.agents.get(default_agent).is_none() {
            return Err(RuntimeError::UnknownAgent(default_agent.to_string()));
        }
        let actor = Arc::new(AgentActor::new(
            session,
            branch,
            self.storage.clone(),
            self.events.clone(),
            self.tool_runner.clone(),
            self.tool_ctx.clone(),
            self.agents.clone(),
            self.providers.clone(),
            self.config.clone(),
            default_agent.to_string(),
        ));
        self.actors.insert(key, actor.clone());
        self.spawn_request_tracker(key);
        Ok(actor)
    }

    /// Subscribe to the actor's own event stream for the rest of the
    /// process's lifetime, recording which actor owns each newly suspended
    /// `QuestionsAsked`/`PlanPresented` request id — the link a bare
    /// `requestId` in a later `respond*` call needs to find its way back.
    fn spawn_request_tracker(&self, key: ActorKey) {
        let (session_id, branch_id) = key;
        let mut subscription = self.events.subscribe(session_id, Some(branch_id), None);
        let request_owners = self.request_owners.clone();
        tokio::spawn(async move {
            while let Some(envelope) = subscription.recv().await {
                let request_id = match envelope.event {
                    conductor_events::AgentEvent::QuestionsAsked { request_id, .. }
                    | conductor_events::AgentEvent::PlanPresented { request_id, .. } => request_id,
                    _ => continue,
                };
                request_owners.insert(request_id, key);
            }
        });
    }

    /// Drop the in-memory actor for `(session_id, branch_id)`, e.g. once a
    /// session is archived or deleted. Does not cancel any in-flight turn —
    /// callers should `steer(Cancel)` first if one may be running.
    pub fn evict(&self, session_id: SessionId, branch_id: BranchId) {
        self.actors.remove(&(session_id, branch_id));
    }

    /// Submit a user message to the named branch (spec §4.E `run`).
    ///
    /// `Queue` spawns a background turn once any turn already in flight on
    /// this actor completes (the actor itself serializes — a second queued
    /// turn simply `run_turn`s again after the first returns). `Interject`
    /// pushes straight into the currently running turn's next loop step.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from [`Self::actor_for`].
    pub async fn run(
        &self,
        session_id: SessionId,
        branch_id: BranchId,
        default_agent: &str,
        message: RunMessage,
    ) -> RuntimeResult<()> {
        let actor = self.actor_for(session_id, branch_id, default_agent).await?;

        if let Some(model) = message.model {
            actor.switch_model(model).await?;
        }

        match message.mode {
            SubmitMode::Interject => {
                actor.interject(message.content).await;
                Ok(())
            }
            SubmitMode::Queue => {
                let actor = actor.clone();
                tokio::spawn(async move {
                    if let Err(err) = actor.run_turn(message.content).await {
                        warn!(error = %err.format_error(), "queued turn ended in error");
                    }
                });
                Ok(())
            }
        }
    }

    /// Force an immediate compaction of a branch's stored history (spec §6
    /// `compactBranch`). Lazily creates the actor if none is registered yet.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from [`Self::actor_for`] and summarization
    /// failures from [`AgentActor::compact_now`].
    pub async fn compact(&self, session_id: SessionId, branch_id: BranchId, default_agent: &str) -> RuntimeResult<()> {
        let actor = self.actor_for(session_id, branch_id, default_agent).await?;
        actor.compact_now().await
    }

    /// Steer the actor owning `(session_id, branch_id)` (spec §4.E `steer`).
    /// Affects only the named actor.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorNotFound`] if no actor is currently
    /// registered for that session/branch.
    pub async fn steer(&self, session_id: SessionId, branch_id: BranchId, command: SteerCommand) -> RuntimeResult<()> {
        let actor = self.actors.get(&(session_id, branch_id)).map(|entry| entry.clone()).ok_or_else(|| {
            RuntimeError::ActorNotFound {
                session_id: session_id.to_string(),
                branch_id: branch_id.to_string(),
            }
        })?;

        match command {
            SteerCommand::Cancel => {
                actor.cancel().await;
                Ok(())
            }
            SteerCommand::Interrupt => {
                actor.interrupt().await;
                Ok(())
            }
            SteerCommand::Interject { message } => {
                actor.interject(message).await;
                Ok(())
            }
            SteerCommand::SwitchAgent { agent } => actor.switch_agent(agent).await,
            SteerCommand::SwitchModel { model } => actor.switch_model(model).await,
            SteerCommand::SwitchMode { mode } => actor.switch_mode(mode).await,
        }
    }

    fn owner_of(&self, request_id: RequestId) -> RuntimeResult<ActorKey> {
        self.request_owners
            .get(&request_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| RuntimeError::UnknownRequest(request_id.to_string()))
    }

    /// Answer a suspended `QuestionsAsked` prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownRequest`] if `request_id` doesn't
    /// correspond to a tracked suspend, or isn't currently awaited.
    pub fn respond_questions(&self, request_id: RequestId, answers: Vec<Vec<String>>) -> RuntimeResult<()> {
        let (session_id, branch_id) = self.owner_of(request_id)?;
        let actor = self.actors.get(&(session_id, branch_id)).ok_or_else(|| RuntimeError::ActorNotFound {
            session_id: session_id.to_string(),
            branch_id: branch_id.to_string(),
        })?;
        actor.questions().resolve(request_id, answers)?;
        self.request_owners.remove(&request_id);
        Ok(())
    }

    /// Answer a suspended `PlanPresented` prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownRequest`] under the same conditions as
    /// [`Self::respond_questions`].
    pub fn respond_plan(&self, request_id: RequestId, decision: PlanDecision) -> RuntimeResult<()> {
        let (session_id, branch_id) = self.owner_of(request_id)?;
        let actor = self.actors.get(&(session_id, branch_id)).ok_or_else(|| RuntimeError::ActorNotFound {
            session_id: session_id.to_string(),
            branch_id: branch_id.to_string(),
        })?;
        actor.plans().resolve(request_id, decision)?;
        self.request_owners.remove(&request_id);
        Ok(())
    }

    /// Answer a suspended `PermissionRequested` prompt.
    ///
    /// Routed through the shared `PendingPermissions` registry directly —
    /// permission suspends live in `ToolRunner`, not on `AgentActor`, so no
    /// actor lookup is needed once the request id is known.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Permission`] if `request_id` isn't currently
    /// awaited.
    pub fn respond_permission(&self, request_id: RequestId, verdict: PermissionVerdict) -> RuntimeResult<()> {
        self.permissions.resolve(request_id, verdict)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_llm::{LlmError, LlmProvider, LlmResult, Message, StreamBox, StreamEvent, Usage};
    use conductor_permission::AllowAll;
    use conductor_storage::MemoryStorage;
    use conductor_tools::ToolRegistry;
    use futures::stream;
    use std::path::PathBuf;
    use std::time::Duration;

    struct StubProvider;

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn stream(
            &self,
            _messages: &[Message],
            _tools: &[conductor_llm::LlmToolDefinition],
            _system: &str,
        ) -> LlmResult<StreamBox> {
            let events = vec![
                Ok(StreamEvent::TextDelta("hi there".into())),
                Ok(StreamEvent::Finish {
                    reason: conductor_llm::StopReason::EndTurn,
                    usage: Some(Usage {
                        input_tokens: 1,
                        output_tokens: 1,
                    }),
                }),
            ];
            Ok(Box::pin(stream::iter(events)))
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[conductor_llm::LlmToolDefinition],
            _system: &str,
        ) -> LlmResult<conductor_llm::LlmResponse> {
            Err(LlmError::StreamingError("not implemented".into()))
        }

        fn max_context_length(&self) -> usize {
            100_000
        }
    }

    struct StubFactory;

    impl ProviderFactory for StubFactory {
        fn provider_for(&self, _model: &str) -> RuntimeResult<Arc<dyn LlmProvider>> {
            Ok(Arc::new(StubProvider))
        }
    }

    fn agent_loop() -> (AgentLoop, Session, Branch) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let events = Arc::new(EventStore::new());
        let tool_runner = Arc::new(ToolRunner::new(
            Arc::new(ToolRegistry::with_defaults()),
            Arc::new(AllowAll),
            Arc::new(PendingPermissions::new()),
            events.clone(),
            Duration::from_millis(200),
        ));
        let tool_ctx = Arc::new(conductor_tools::ToolContext::new(PathBuf::from("/tmp")));
        let agents = Arc::new(AgentRegistry::with_default_agent("stub-model"));
        let providers: Arc<dyn ProviderFactory> = Arc::new(StubFactory);
        let permissions = Arc::new(PendingPermissions::new());

        let agent_loop = AgentLoop::new(
            storage.clone(),
            events,
            tool_runner,
            tool_ctx,
            agents,
            providers,
            permissions,
            RuntimeConfig::default(),
        );

        (agent_loop, Session::new("/workspace"), Branch::new(SessionId::new()))
    }

    #[tokio::test]
    async fn actor_for_errors_on_missing_session() {
        let (agent_loop, _session, _branch) = agent_loop();
        let err = agent_loop.actor_for(SessionId::new(), BranchId::new(), "default").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn actor_for_errors_on_unknown_default_agent() {
        let (agent_loop, session, mut branch) = agent_loop();
        branch.session_id = session.id;
        agent_loop.storage.create_session(session.clone()).await.unwrap();
        agent_loop.storage.create_branch(branch.clone()).await.unwrap();

        let err = agent_loop.actor_for(session.id, branch.id, "nonexistent").await;
        assert!(matches!(err, Err(RuntimeError::UnknownAgent(_))));
    }

    #[tokio::test]
    async fn steer_on_unregistered_actor_is_actor_not_found() {
        let (agent_loop, _session, _branch) = agent_loop();
        let err = agent_loop
            .steer(SessionId::new(), BranchId::new(), SteerCommand::Cancel)
            .await;
        assert!(matches!(err, Err(RuntimeError::ActorNotFound { .. })));
    }

    #[tokio::test]
    async fn run_queue_spawns_a_turn_that_completes() {
        let (agent_loop, session, mut branch) = agent_loop();
        branch.session_id = session.id;
        agent_loop.storage.create_session(session.clone()).await.unwrap();
        agent_loop.storage.create_branch(branch.clone()).await.unwrap();

        agent_loop
            .run(
                session.id,
                branch.id,
                "default",
                RunMessage {
                    content: "hello".into(),
                    mode: SubmitMode::Queue,
                    model: None,
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let messages = agent_loop.storage.list_messages(branch.id).await.unwrap();
        assert!(messages.len() >= 2);
    }

    #[tokio::test]
    async fn respond_questions_errors_on_untracked_request() {
        let (agent_loop, _session, _branch) = agent_loop();
        let err = agent_loop.respond_questions(RequestId::new(), vec![]);
        assert!(matches!(err, Err(RuntimeError::UnknownRequest(_))));
    }
}
