//! `KernelState`: the shared daemon state backing every RPC method, and the
//! thin `ConductorRpcServer` impl that delegates each call to a focused
//! `*_impl` method in a sibling submodule.

mod events;
mod models;
mod session;
mod steer;

use std::sync::Arc;

use async_trait::async_trait;
use conductor_core::{BranchId, SessionId};
use conductor_events::EventStore;
use conductor_runtime::{AgentLoop, AgentRegistry};
use conductor_storage::traits::Storage;
use jsonrpsee::PendingSubscriptionSink;
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::types::ErrorObjectOwned;

use crate::auth::AuthStore;
use crate::rpc::{
    BranchIdResult, BranchInfo, BranchTreeNode, ConductorRpcServer, CreateBranchParams, CreateSessionParams,
    CreateSessionResult, ForkBranchParams, MessageInfo, ModelInfo, RespondPermissionParams, RespondPlanParams,
    RespondQuestionsParams, SendMessageParams, SessionBranchParams, SessionInfo, SessionStateSnapshot, SteerParams,
    SubscribeEventsParams, SwitchBranchParams, UpdateSessionBypassParams, UpdateSessionBypassResult,
};

/// Everything an RPC call needs: the storage/event-store collaborators, the
/// actor registry, and the static bits (default agent, model catalog,
/// credential store) the kernel itself owns rather than the runtime.
pub struct KernelState {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) events: Arc<EventStore>,
    pub(crate) agent_loop: Arc<AgentLoop>,
    pub(crate) agents: Arc<AgentRegistry>,
    pub(crate) default_agent: String,
    pub(crate) models: Vec<ModelInfo>,
    /// Credential store for provider auth. Not reached by any RPC method
    /// directly; the embedding application wires it into its
    /// `ProviderFactory` before constructing `AgentLoop`.
    pub auth: Arc<AuthStore>,
}

impl KernelState {
    /// Construct the shared daemon state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn Storage>,
        events: Arc<EventStore>,
        agent_loop: Arc<AgentLoop>,
        agents: Arc<AgentRegistry>,
        default_agent: impl Into<String>,
        models: Vec<ModelInfo>,
        auth: Arc<AuthStore>,
    ) -> Self {
        Self {
            storage,
            events,
            agent_loop,
            agents,
            default_agent: default_agent.into(),
            models,
            auth,
        }
    }
}

#[async_trait]
impl ConductorRpcServer for KernelState {
    async fn create_session(&self, params: CreateSessionParams) -> Result<CreateSessionResult, ErrorObjectOwned> {
        self.create_session_impl(params).await.map_err(Into::into)
    }

    async fn send_message(&self, params: SendMessageParams) -> Result<(), ErrorObjectOwned> {
        self.send_message_impl(params).await.map_err(Into::into)
    }

    async fn list_messages(&self, branch_id: BranchId) -> Result<Vec<MessageInfo>, ErrorObjectOwned> {
        self.list_messages_impl(branch_id).await.map_err(Into::into)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ErrorObjectOwned> {
        self.list_sessions_impl().await.map_err(Into::into)
    }

    async fn list_branches(&self, session_id: SessionId) -> Result<Vec<BranchInfo>, ErrorObjectOwned> {
        self.list_branches_impl(session_id).await.map_err(Into::into)
    }

    async fn get_branch_tree(&self, session_id: SessionId) -> Result<Vec<BranchTreeNode>, ErrorObjectOwned> {
        self.get_branch_tree_impl(session_id).await.map_err(Into::into)
    }

    async fn create_branch(&self, params: CreateBranchParams) -> Result<BranchIdResult, ErrorObjectOwned> {
        self.create_branch_impl(params).await.map_err(Into::into)
    }

    async fn switch_branch(&self, params: SwitchBranchParams) -> Result<(), ErrorObjectOwned> {
        self.switch_branch_impl(params).await.map_err(Into::into)
    }

    async fn fork_branch(&self, params: ForkBranchParams) -> Result<BranchIdResult, ErrorObjectOwned> {
        self.fork_branch_impl(params).await.map_err(Into::into)
    }

    async fn compact_branch(&self, params: SessionBranchParams) -> Result<(), ErrorObjectOwned> {
        self.compact_branch_impl(params).await.map_err(Into::into)
    }

    async fn get_session_state(&self, params: SessionBranchParams) -> Result<SessionStateSnapshot, ErrorObjectOwned> {
        self.get_session_state_impl(params).await.map_err(Into::into)
    }

    async fn steer(&self, params: SteerParams) -> Result<(), ErrorObjectOwned> {
        self.steer_impl(params).await.map_err(Into::into)
    }

    async fn respond_questions(&self, params: RespondQuestionsParams) -> Result<(), ErrorObjectOwned> {
        self.respond_questions_impl(params).map_err(Into::into)
    }

    async fn respond_permission(&self, params: RespondPermissionParams) -> Result<(), ErrorObjectOwned> {
        self.respond_permission_impl(params).map_err(Into::into)
    }

    async fn respond_plan(&self, params: RespondPlanParams) -> Result<(), ErrorObjectOwned> {
        self.respond_plan_impl(params).map_err(Into::into)
    }

    async fn update_session_bypass(
        &self,
        params: UpdateSessionBypassParams,
    ) -> Result<UpdateSessionBypassResult, ErrorObjectOwned> {
        self.update_session_bypass_impl(params).await.map_err(Into::into)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ErrorObjectOwned> {
        Ok(self.list_models_impl())
    }

    async fn subscribe_events(
        &self,
        pending: PendingSubscriptionSink,
        params: SubscribeEventsParams,
    ) -> SubscriptionResult {
        self.subscribe_events_impl(pending, params).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::AuthStore;
    use crate::rpc::ModelInfo;
    use conductor_test::RuntimeHarness;

    /// A `KernelState` wired over a fresh in-memory `RuntimeHarness`, with
    /// the harness's provider/storage/events kept alongside so tests can
    /// script replies and inspect persisted state directly.
    pub(crate) async fn test_state() -> (KernelState, RuntimeHarness) {
        let harness = RuntimeHarness::new("default", "stub-model").await;
        let models = vec![ModelInfo {
            id: "stub-model".to_string(),
            provider: "stub".to_string(),
            display_name: "Stub Model".to_string(),
            max_context_tokens: 200_000,
            supports_tools: true,
        }];
        let state = KernelState::new(
            harness.storage.clone(),
            harness.events.clone(),
            harness.agent_loop.clone(),
            harness.agents.clone(),
            harness.default_agent.clone(),
            models,
            Arc::new(AuthStore::new()),
        );
        (state, harness)
    }

    #[tokio::test]
    async fn list_models_returns_configured_catalog() {
        let (state, _harness) = test_state().await;
        let models = state.list_models_impl();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "stub-model");
    }
}
