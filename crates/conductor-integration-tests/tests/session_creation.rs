//! Scenario 3: creating a session and sending its first message persists
//! exactly one user message, and a fresh subscription with no cursor replays
//! it from the start.

mod common;

use conductor_core::Role;
use conductor_llm::types::Usage;
use conductor_test::RuntimeHarness;

#[tokio::test]
async fn first_message_is_persisted_and_replayable_from_scratch() {
    let harness = RuntimeHarness::new("default", "stub-model").await;
    harness.provider.with_text_reply("hello, how can I help?", Usage { input_tokens: 2, output_tokens: 4 });

    let (session_id, branch_id) = harness.ids();
    let actor = harness.agent_loop.actor_for(session_id, branch_id, &harness.default_agent).await.unwrap();
    actor.run_turn("hi".to_string()).await.unwrap();

    let messages = harness.storage.list_messages(branch_id).await.unwrap();
    let user_messages: Vec<_> = messages.iter().filter(|m| m.role == Role::User).collect();
    assert_eq!(user_messages.len(), 1);
    assert!(matches!(
        &user_messages[0].parts[..],
        [conductor_storage::types::MessagePart::Text { text }] if text == "hi"
    ));

    let events = common::collect_events(&harness.events, session_id, branch_id).await;
    let types = common::event_types(&events);
    assert_eq!(types.first(), Some(&"message_received"));
}
