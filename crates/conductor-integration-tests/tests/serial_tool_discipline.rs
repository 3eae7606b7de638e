//! Scenario 4: two tool calls requested in the same provider turn are
//! dispatched one at a time — the first call's `ToolCallCompleted` always
//! precedes the second call's `ToolCallStarted`, never interleaved.

mod common;

use conductor_llm::types::{StopReason, StreamEvent, Usage};
use conductor_test::RuntimeHarness;

#[tokio::test]
async fn two_tool_calls_in_one_turn_never_interleave() {
    let harness = RuntimeHarness::new("default", "stub-model").await;

    harness.provider.with_stream(Ok(vec![
        StreamEvent::ToolCallStart { id: "call-1".into(), name: "read_file".into() },
        StreamEvent::ToolCallDelta { id: "call-1".into(), args_delta: r#"{"file_path":"/workspace/a.txt"}"#.into() },
        StreamEvent::ToolCallEnd { id: "call-1".into() },
        StreamEvent::ToolCallStart { id: "call-2".into(), name: "write_file".into() },
        StreamEvent::ToolCallDelta {
            id: "call-2".into(),
            args_delta: r#"{"file_path":"/workspace/b.txt","content":"hi"}"#.into(),
        },
        StreamEvent::ToolCallEnd { id: "call-2".into() },
        StreamEvent::Finish { reason: StopReason::ToolUse, usage: None },
    ]));
    harness.provider.with_text_reply("done", Usage { input_tokens: 1, output_tokens: 1 });

    let (session_id, branch_id) = harness.ids();
    let actor = harness.agent_loop.actor_for(session_id, branch_id, &harness.default_agent).await.unwrap();
    actor.run_turn("read a.txt then write b.txt".to_string()).await.unwrap();

    let events = common::collect_events(&harness.events, session_id, branch_id).await;
    let types = common::event_types(&events);

    let starts: Vec<usize> = types.iter().enumerate().filter(|(_, t)| **t == "tool_call_started").map(|(i, _)| i).collect();
    let ends: Vec<usize> = types.iter().enumerate().filter(|(_, t)| **t == "tool_call_completed").map(|(i, _)| i).collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(ends.len(), 2);
    // first call's completion strictly precedes the second call's start
    assert!(ends[0] < starts[1], "tool calls interleaved: {types:?}");
    assert!(starts[0] < ends[0]);
    assert!(starts[1] < ends[1]);
}
