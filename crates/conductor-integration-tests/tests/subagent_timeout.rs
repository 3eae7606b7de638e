//! Scenario 6: a subagent whose provider call outlives its timeout is
//! reported as a failed `SubAgentResult` without a panic, and the parent
//! session is still usable afterward.

mod common;

use std::sync::Arc;
use std::time::Duration;

use conductor_events::EventStore;
use conductor_llm::types::Usage;
use conductor_permission::{AllowAll, PendingPermissions};
use conductor_runtime::{
    AgentDefinition, AgentRegistry, ProviderFactory, RuntimeConfig, RuntimeResult, SubAgentPool, SubagentConfig,
    SubagentRunner, ToolRunner,
};
use conductor_storage::memory::MemoryStorage;
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Session};
use conductor_test::MockLlmProvider;
use conductor_tools::{SubAgentRequest, SubAgentSpawner, ToolRegistry};

struct SingleProviderFactory(Arc<MockLlmProvider>);

impl ProviderFactory for SingleProviderFactory {
    fn provider_for(&self, _model: &str) -> RuntimeResult<Arc<dyn conductor_llm::LlmProvider>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn timed_out_subagent_fails_cleanly_and_parent_stays_usable() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let events = Arc::new(EventStore::new());
    let pending_permissions = Arc::new(PendingPermissions::new());
    let tool_runner = Arc::new(ToolRunner::new(
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AllowAll),
        pending_permissions,
        events.clone(),
        Duration::from_millis(200),
    ));

    let mut registry = AgentRegistry::new();
    registry.register(AgentDefinition::new("subagent", "you are a sub-assistant", "stub-model"));
    let agents = Arc::new(registry);

    let provider = Arc::new(MockLlmProvider::new("stub-model"));
    provider.with_slow_text_reply(Duration::from_millis(50), "too slow", Usage::default());
    let providers: Arc<dyn ProviderFactory> = Arc::new(SingleProviderFactory(provider));

    let mut config = RuntimeConfig::default();
    config.subagent = SubagentConfig { timeout: Duration::from_millis(5), max_attempts: 1, ..config.subagent };

    let pool = Arc::new(SubAgentPool::new(4, 3));

    let parent_session = Session::new("/workspace");
    storage.create_session(parent_session.clone()).await.unwrap();
    let parent_branch = Branch::new(parent_session.id);
    storage.create_branch(parent_branch.clone()).await.unwrap();

    let runner = SubagentRunner::new(
        storage.clone(),
        events.clone(),
        tool_runner,
        agents,
        providers,
        config,
        pool,
        parent_session.id,
        parent_branch.id,
        None,
    );

    let result = runner
        .spawn(SubAgentRequest { agent: "subagent".to_string(), prompt: "do something slow".to_string(), timeout: None })
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("timed out"));

    // The parent session's own storage is untouched and still readable.
    let parent_messages = storage.list_messages(parent_branch.id).await.unwrap();
    assert!(parent_messages.is_empty());

    let events_seen = common::collect_events(&events, parent_session.id, parent_branch.id).await;
    let types = common::event_types(&events_seen);
    assert!(types.contains(&"subagent_spawned"));
    assert!(types.contains(&"subagent_completed"));
}
