//! Scenario 1: a rate-limited provider call recovers on retry, and only the
//! successful attempt's output is ever persisted or published.

mod common;

use conductor_core::Role;
use conductor_llm::types::Usage;
use conductor_test::RuntimeHarness;

#[tokio::test]
async fn rate_limit_then_success_persists_exactly_one_assistant_message() {
    let harness = RuntimeHarness::new("default", "stub-model").await;
    harness.provider.with_rate_limit(1);
    harness.provider.with_text_reply("ok", Usage { input_tokens: 1, output_tokens: 1 });

    let (session_id, branch_id) = harness.ids();
    let actor = harness.agent_loop.actor_for(session_id, branch_id, &harness.default_agent).await.unwrap();
    actor.run_turn("hi".to_string()).await.unwrap();

    assert_eq!(harness.provider.stream_call_count(), 2);

    let messages = harness.storage.list_messages(branch_id).await.unwrap();
    let assistant_messages: Vec<_> = messages.iter().filter(|m| m.role == Role::Assistant).collect();
    assert_eq!(assistant_messages.len(), 1);

    let events = common::collect_events(&harness.events, session_id, branch_id).await;
    let types = common::event_types(&events);
    assert_eq!(types.iter().filter(|t| **t == "stream_started").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "stream_ended").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "message_received").count(), 1);
}
