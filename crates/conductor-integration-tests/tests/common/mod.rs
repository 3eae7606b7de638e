//! Shared helpers for scenario tests.

use std::time::Duration;

use conductor_core::{BranchId, SessionId};
use conductor_events::{AgentEvent, EventStore};

/// Drain every envelope currently retained for `(session_id, branch_id)`,
/// then keep waiting briefly for any still in flight.
///
/// Scenario tests run their turn to completion before calling this, so a
/// short quiet period is enough to know nothing more is coming — there's no
/// "turn finished" event of its own to wait on.
pub async fn collect_events(store: &EventStore, session_id: SessionId, branch_id: BranchId) -> Vec<AgentEvent> {
    let mut subscription = store.subscribe(session_id, Some(branch_id), None);
    let mut events = Vec::new();
    while let Ok(Some(envelope)) = tokio::time::timeout(Duration::from_millis(100), subscription.recv()).await {
        events.push(envelope.event);
    }
    events
}

/// Short labels for `AgentEvent::event_type()`, for asserting on event
/// ordering without matching full payloads.
pub fn event_types(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(AgentEvent::event_type).collect()
}
