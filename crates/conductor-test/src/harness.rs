//! A fully wired, in-memory [`AgentLoop`] for integration-style tests:
//! `MemoryStorage` + a fresh `EventStore` + the default builtin tools under
//! `AllowAll` permissions + a single scriptable [`MockLlmProvider`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use conductor_core::SessionId;
use conductor_events::EventStore;
use conductor_permission::{AllowAll, PendingPermissions};
use conductor_runtime::{AgentDefinition, AgentLoop, AgentRegistry, ProviderFactory, RuntimeConfig, RuntimeResult, ToolRunner};
use conductor_storage::memory::MemoryStorage;
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Session};
use conductor_tools::{ToolContext, ToolRegistry};

use crate::mock_llm::MockLlmProvider;

/// Hands back the one provider every `model()` lookup resolves to,
/// regardless of which model name the actor asks for.
struct SingleProviderFactory(Arc<MockLlmProvider>);

impl ProviderFactory for SingleProviderFactory {
    fn provider_for(&self, _model: &str) -> RuntimeResult<Arc<dyn conductor_llm::LlmProvider>> {
        Ok(self.0.clone())
    }
}

/// An in-memory runtime stack plus a freshly created session/branch pair,
/// ready for `agent_loop.run(...)`.
pub struct RuntimeHarness {
    /// The wired actor registry under test.
    pub agent_loop: Arc<AgentLoop>,
    /// Shared storage backing the harness.
    pub storage: Arc<dyn Storage>,
    /// Shared event store backing the harness.
    pub events: Arc<EventStore>,
    /// The single provider every model resolves to; queue scripts on it
    /// before calling `agent_loop.run(...)`.
    pub provider: Arc<MockLlmProvider>,
    /// A freshly persisted session.
    pub session: Session,
    /// The session's root branch.
    pub branch: Branch,
    /// Name of the default agent registered with `agents`.
    pub default_agent: String,
    /// The agent registry backing `agent_loop`, shared so callers building
    /// a `KernelState` on top of this harness don't need a second one.
    pub agents: Arc<AgentRegistry>,
}

impl RuntimeHarness {
    /// Build a harness whose agent registry has a single default agent named
    /// `default_agent`, backed by `model`.
    pub async fn new(default_agent: impl Into<String>, model: impl Into<String>) -> Self {
        let default_agent = default_agent.into();
        let model = model.into();

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let events = Arc::new(EventStore::new());
        let pending_permissions = Arc::new(PendingPermissions::new());
        let tool_runner = Arc::new(ToolRunner::new(
            Arc::new(ToolRegistry::with_defaults()),
            Arc::new(AllowAll),
            pending_permissions.clone(),
            events.clone(),
            Duration::from_millis(200),
        ));
        let tool_ctx = Arc::new(ToolContext::new(PathBuf::from("/workspace")));
        let mut registry = AgentRegistry::new();
        registry.register(AgentDefinition::new(default_agent.clone(), "You are a helpful coding assistant.", model.clone()));
        let agents = Arc::new(registry);
        let provider = Arc::new(MockLlmProvider::new(model));
        let providers: Arc<dyn ProviderFactory> = Arc::new(SingleProviderFactory(provider.clone()));

        let agent_loop = Arc::new(AgentLoop::new(
            storage.clone(),
            events.clone(),
            tool_runner,
            tool_ctx,
            agents.clone(),
            providers,
            pending_permissions,
            RuntimeConfig::default(),
        ));

        let session = Session::new("/workspace");
        storage.create_session(session.clone()).await.expect("fixture session should persist");
        let branch = Branch::new(session.id);
        storage.create_branch(branch.clone()).await.expect("fixture branch should persist");

        Self { agent_loop, storage, events, provider, session, branch, default_agent, agents }
    }

    /// Convenience: the `(sessionId, branchId)` pair most calls take.
    #[must_use]
    pub fn ids(&self) -> (SessionId, conductor_core::BranchId) {
        (self.session.id, self.branch.id)
    }
}
