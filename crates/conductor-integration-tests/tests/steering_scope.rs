//! Scenario 2: steering is scoped to the actor it addresses — cancelling one
//! session/branch's in-flight turn leaves an unrelated session's turn to
//! finish normally.

mod common;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use conductor_events::EventStore;
use conductor_llm::LlmProvider;
use conductor_permission::{AllowAll, PendingPermissions};
use conductor_runtime::{
    AgentDefinition, AgentLoop, AgentRegistry, ProviderFactory, RunMessage, RuntimeConfig, RuntimeResult, SteerCommand,
    SubmitMode, ToolRunner,
};
use conductor_storage::memory::MemoryStorage;
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Session};
use conductor_test::MockLlmProvider;
use conductor_tools::{ToolContext, ToolRegistry};

struct ModelRoutedFactory(HashMap<String, Arc<MockLlmProvider>>);

impl ProviderFactory for ModelRoutedFactory {
    fn provider_for(&self, model: &str) -> RuntimeResult<Arc<dyn LlmProvider>> {
        self.0
            .get(model)
            .cloned()
            .map(|provider| provider as Arc<dyn LlmProvider>)
            .ok_or_else(|| conductor_runtime::RuntimeError::UnknownAgent(model.to_string()))
    }
}

#[tokio::test]
async fn cancel_is_scoped_to_the_addressed_session() {
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
    registry.register(AgentDefinition::new("agent-a", "assistant a", "model-a"));
    registry.register(AgentDefinition::new("agent-b", "assistant b", "model-b"));
    let agents = Arc::new(registry);

    let provider_a = Arc::new(MockLlmProvider::new("model-a"));
    let provider_b = Arc::new(MockLlmProvider::new("model-b"));
    provider_a.with_slow_text_reply(Duration::from_millis(300), "a's reply", Default::default());
    provider_b.with_text_reply("b's reply", Default::default());

    let mut providers_by_model: HashMap<String, Arc<MockLlmProvider>> = HashMap::new();
    providers_by_model.insert("model-a".to_string(), provider_a.clone());
    providers_by_model.insert("model-b".to_string(), provider_b.clone());
    let providers: Arc<dyn ProviderFactory> = Arc::new(ModelRoutedFactory(providers_by_model));

    let agent_loop = Arc::new(AgentLoop::new(
        storage.clone(),
        events.clone(),
        tool_runner,
        tool_ctx,
        agents,
        providers,
        pending_permissions,
        RuntimeConfig::default(),
    ));

    let session_a = Session::new("/workspace");
    storage.create_session(session_a.clone()).await.unwrap();
    let branch_a = Branch::new(session_a.id);
    storage.create_branch(branch_a.clone()).await.unwrap();

    let session_b = Session::new("/workspace");
    storage.create_session(session_b.clone()).await.unwrap();
    let branch_b = Branch::new(session_b.id);
    storage.create_branch(branch_b.clone()).await.unwrap();

    agent_loop
        .run(session_a.id, branch_a.id, "agent-a", RunMessage { content: "hi a".into(), mode: SubmitMode::Queue, model: None })
        .await
        .unwrap();
    // Give actor A's turn a moment to open its (slow) stream before B starts,
    // so the two calls land on their intended provider deterministically.
    tokio::time::sleep(Duration::from_millis(20)).await;

    agent_loop
        .run(session_b.id, branch_b.id, "agent-b", RunMessage { content: "hi b".into(), mode: SubmitMode::Queue, model: None })
        .await
        .unwrap();

    // Let B's turn run to completion while A is still streaming.
    tokio::time::sleep(Duration::from_millis(50)).await;
    agent_loop.steer(session_a.id, branch_a.id, SteerCommand::Cancel).await.unwrap();

    // Give both turns time to settle: A observes the cancellation at its
    // next yield point, B has already finished.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events_a = common::collect_events(&events, session_a.id, branch_a.id).await;
    let types_a = common::event_types(&events_a);
    assert!(types_a.contains(&"stream_started"));
    assert!(types_a.contains(&"stream_ended"));

    let events_b = common::collect_events(&events, session_b.id, branch_b.id).await;
    let types_b = common::event_types(&events_b);
    assert_eq!(types_b.iter().filter(|t| **t == "stream_started").count(), 1);
    assert_eq!(types_b.iter().filter(|t| **t == "stream_ended").count(), 1);

    let messages_b = storage.list_messages(branch_b.id).await.unwrap();
    assert!(messages_b.iter().any(|m| m.role == conductor_core::Role::Assistant));
}
