//! Session/branch/message CRUD and lifecycle RPC method implementations.

use conductor_core::{BadArgument, BranchId, MessageId, SessionId};
use conductor_events::AgentEvent;
use conductor_runtime::{RunMessage, SubmitMode};
use conductor_storage::types::{Branch, BranchTreeNode as StoredBranchTreeNode, Message, Session};
use conductor_telemetry::{RequestContext, RequestGuard};

use super::KernelState;
use crate::error::{KernelError, KernelResult};
use crate::rpc::{
    BranchIdResult, BranchInfo, BranchTreeNode, CreateBranchParams, CreateSessionParams, CreateSessionResult,
    ForkBranchParams, MessageInfo, SendMessageParams, SessionBranchParams, SessionInfo, SessionStateSnapshot,
    SubmitModeWire, SwitchBranchParams, UpdateSessionBypassParams, UpdateSessionBypassResult,
};

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            name: session.name,
            cwd: session.cwd,
            bypass: session.bypass,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

impl From<Branch> for BranchInfo {
    fn from(branch: Branch) -> Self {
        Self {
            branch_id: branch.id,
            session_id: branch.session_id,
            parent_branch_id: branch.parent_branch_id,
            parent_message_id: branch.parent_message_id,
            name: branch.name,
            model: branch.model,
            summary: branch.summary,
        }
    }
}

impl From<StoredBranchTreeNode> for BranchTreeNode {
    fn from(node: StoredBranchTreeNode) -> Self {
        Self {
            branch: node.branch.into(),
            message_count: node.message_count,
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<SubmitModeWire> for SubmitMode {
    fn from(mode: SubmitModeWire) -> Self {
        match mode {
            SubmitModeWire::Queue => Self::Queue,
            SubmitModeWire::Interject => Self::Interject,
        }
    }
}

impl KernelState {
    pub(super) async fn create_session_impl(&self, params: CreateSessionParams) -> KernelResult<CreateSessionResult> {
        let cwd = params.cwd.unwrap_or_else(|| ".".to_string());
        let mut session = Session::new(cwd);
        session.bypass = params.bypass.unwrap_or(false);
        self.storage.create_session(session.clone()).await?;

        let branch = Branch::new(session.id);
        self.storage.create_branch(branch.clone()).await?;

        if let Some(first_message) = params.first_message {
            self.agent_loop
                .run(
                    session.id,
                    branch.id,
                    &self.default_agent,
                    RunMessage {
                        content: first_message,
                        mode: SubmitMode::Queue,
                        model: None,
                    },
                )
                .await?;
        }

        Ok(CreateSessionResult {
            session_id: session.id,
            branch_id: branch.id,
            name: session.name,
            bypass: session.bypass,
        })
    }

    pub(super) async fn send_message_impl(&self, params: SendMessageParams) -> KernelResult<()> {
        let _guard = RequestGuard::new(
            RequestContext::new("kernel")
                .with_session_id(params.session_id)
                .with_branch_id(params.branch_id)
                .with_operation("sendMessage"),
        );
        self.agent_loop
            .run(
                params.session_id,
                params.branch_id,
                &self.default_agent,
                RunMessage {
                    content: params.content,
                    mode: params.mode.into(),
                    model: params.model,
                },
            )
            .await?;
        Ok(())
    }

    pub(super) async fn list_messages_impl(&self, branch_id: BranchId) -> KernelResult<Vec<MessageInfo>> {
        let messages = self.storage.list_messages(branch_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    pub(super) async fn list_sessions_impl(&self) -> KernelResult<Vec<SessionInfo>> {
        let sessions = self.storage.list_sessions().await?;
        Ok(sessions.into_iter().map(Into::into).collect())
    }

    pub(super) async fn list_branches_impl(&self, session_id: SessionId) -> KernelResult<Vec<BranchInfo>> {
        let branches = self.storage.list_branches(session_id).await?;
        Ok(branches.into_iter().map(Into::into).collect())
    }

    pub(super) async fn get_branch_tree_impl(&self, session_id: SessionId) -> KernelResult<Vec<BranchTreeNode>> {
        let tree = self.storage.get_branch_tree(session_id).await?;
        Ok(tree.into_iter().map(Into::into).collect())
    }

    pub(super) async fn create_branch_impl(&self, params: CreateBranchParams) -> KernelResult<BranchIdResult> {
        let mut branch = Branch::new(params.session_id);
        branch.name = params.name;
        self.storage.create_branch(branch.clone()).await?;
        Ok(BranchIdResult { branch_id: branch.id })
    }

    pub(super) async fn switch_branch_impl(&self, params: SwitchBranchParams) -> KernelResult<()> {
        if params.summarize {
            self.agent_loop
                .compact(params.session_id, params.from_branch_id, &self.default_agent)
                .await?;
        }
        self.events.publish(
            params.session_id,
            Some(params.to_branch_id),
            AgentEvent::BranchSwitched { to_branch_id: params.to_branch_id },
        );
        Ok(())
    }

    pub(super) async fn fork_branch_impl(&self, params: ForkBranchParams) -> KernelResult<BranchIdResult> {
        let from_branch = self
            .storage
            .get_branch(params.from_branch_id)
            .await?
            .ok_or_else(|| conductor_storage::StorageError::NotFound(params.from_branch_id.to_string()))?;

        let new_branch = Branch::forked_from(&from_branch, params.at_message_id, params.name);
        self.storage.create_branch(new_branch.clone()).await?;

        let source_messages = self.storage.list_messages(params.from_branch_id).await?;
        let cutoff = source_messages
            .iter()
            .position(|message| message.id == params.at_message_id)
            .ok_or_else(|| {
                KernelError::from(
                    BadArgument::new("kernel", "forkBranch")
                        .with_description("atMessageId not found in fromBranchId"),
                )
            })?;

        for message in &source_messages[..=cutoff] {
            let copy = Message {
                id: MessageId::new(),
                session_id: message.session_id,
                branch_id: new_branch.id,
                role: message.role,
                parts: message.parts.clone(),
                created_at: message.created_at,
                turn_duration_ms: message.turn_duration_ms,
                kind: message.kind,
            };
            self.storage.create_message(copy).await?;
        }

        Ok(BranchIdResult { branch_id: new_branch.id })
    }

    pub(super) async fn get_session_state_impl(
        &self,
        params: SessionBranchParams,
    ) -> KernelResult<SessionStateSnapshot> {
        let session = self
            .storage
            .get_session(params.session_id)
            .await?
            .ok_or_else(|| conductor_storage::StorageError::NotFound(params.session_id.to_string()))?;
        let branch = self
            .storage
            .get_branch(params.branch_id)
            .await?
            .ok_or_else(|| conductor_storage::StorageError::NotFound(params.branch_id.to_string()))?;
        let message_count = self.storage.list_messages(params.branch_id).await?.len();

        let actor = self
            .agent_loop
            .actor_for(params.session_id, params.branch_id, &self.default_agent)
            .await?;
        let active_agent = actor.current_agent().await;
        let model = branch.model.clone().unwrap_or_else(|| {
            self.agents
                .get(&active_agent)
                .map_or_else(|| self.default_agent.clone(), |def| def.default_model.clone())
        });

        Ok(SessionStateSnapshot {
            session_id: session.id,
            branch_id: branch.id,
            active_agent,
            model,
            message_count,
            bypass: session.bypass,
            summary: branch.summary,
        })
    }

    pub(super) async fn update_session_bypass_impl(
        &self,
        params: UpdateSessionBypassParams,
    ) -> KernelResult<UpdateSessionBypassResult> {
        let mut session = self
            .storage
            .get_session(params.session_id)
            .await?
            .ok_or_else(|| conductor_storage::StorageError::NotFound(params.session_id.to_string()))?;
        session.bypass = params.bypass;
        session.updated_at = chrono::Utc::now();
        self.storage.update_session(session.clone()).await?;
        Ok(UpdateSessionBypassResult { bypass: session.bypass })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_state;
    use super::*;
    use conductor_llm::types::Usage;

    #[tokio::test]
    async fn create_session_without_first_message_persists_empty_branch() {
        let (state, _harness) = test_state().await;
        let result = state
            .create_session_impl(CreateSessionParams { first_message: None, cwd: Some("/tmp".into()), bypass: Some(true) })
            .await
            .unwrap();
        assert!(result.bypass);

        let messages = state.list_messages_impl(result.branch_id).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn send_message_runs_a_turn_and_persists_both_sides() {
        let (state, harness) = test_state().await;
        harness.provider.with_text_reply("hello there", Usage { input_tokens: 3, output_tokens: 2 });
        let (session_id, branch_id) = harness.ids();

        state
            .send_message_impl(SendMessageParams {
                session_id,
                branch_id,
                content: "hi".into(),
                mode: SubmitModeWire::Queue,
                model: None,
            })
            .await
            .unwrap();

        let messages = state.list_messages_impl(branch_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, conductor_core::Role::User);
        assert_eq!(messages[1].role, conductor_core::Role::Assistant);
    }

    #[tokio::test]
    async fn fork_branch_copies_history_up_to_the_cutoff() {
        let (state, harness) = test_state().await;
        harness.provider.with_text_reply("first reply", Usage::default());
        let (session_id, branch_id) = harness.ids();

        state
            .send_message_impl(SendMessageParams {
                session_id,
                branch_id,
                content: "hi".into(),
                mode: SubmitModeWire::Queue,
                model: None,
            })
            .await
            .unwrap();
        let original = state.list_messages_impl(branch_id).await.unwrap();
        assert_eq!(original.len(), 2);
        let cutoff = original[0].message_id;

        let forked = state
            .fork_branch_impl(ForkBranchParams { session_id, from_branch_id: branch_id, at_message_id: cutoff, name: None })
            .await
            .unwrap();

        let copied = state.list_messages_impl(forked.branch_id).await.unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].created_at, original[0].created_at);
        assert_ne!(copied[0].message_id, original[0].message_id);
    }

    #[tokio::test]
    async fn get_session_state_reports_active_agent_and_model() {
        let (state, harness) = test_state().await;
        let (session_id, branch_id) = harness.ids();

        let snapshot = state.get_session_state_impl(SessionBranchParams { session_id, branch_id }).await.unwrap();
        assert_eq!(snapshot.active_agent, "default");
        assert_eq!(snapshot.model, "stub-model");
        assert_eq!(snapshot.message_count, 0);
    }
}
