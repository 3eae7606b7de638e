//! `EventStore` — append-only per-session event log with replayable fan-out.
//!
//! Each session gets its own monotone id counter, a bounded retained ring
//! (the "current turn" retention floor) and a `tokio::sync::broadcast`
//! channel for live fan-out. `publish` and `subscribe` both take the same
//! per-session lock around id assignment / receiver creation so a subscriber
//! established before a `publish` call is guaranteed to observe it, either
//! through the replayed backlog or the live channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use conductor_core::{BranchId, SessionId};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::event::{AgentEvent, EventEnvelope, SeqId};

/// Default bound on the per-session retained ring and per-subscriber
/// broadcast channel (spec §4.B design guideline).
pub const DEFAULT_RING_CAPACITY: usize = 1000;

struct SessionLog {
    next_id: SeqId,
    retained: VecDeque<Arc<EventEnvelope>>,
    sender: broadcast::Sender<Arc<EventEnvelope>>,
}

impl SessionLog {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            next_id: 1,
            retained: VecDeque::with_capacity(capacity.min(64)),
            sender,
        }
    }
}

/// Append-only, per-session ordered event log with streaming fan-out.
pub struct EventStore {
    sessions: DashMap<SessionId, Arc<Mutex<SessionLog>>>,
    ring_capacity: usize,
}

impl EventStore {
    /// Create a store with the default ring/channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    /// Create a store with a custom per-session retention/channel capacity.
    #[must_use]
    pub fn with_capacity(ring_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ring_capacity,
        }
    }

    fn log_for(&self, session_id: SessionId) -> Arc<Mutex<SessionLog>> {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionLog::new(self.ring_capacity))))
            .clone()
    }

    /// Publish an event, synchronously assigning the next monotone id within
    /// `session_id` and broadcasting to all current matching subscribers.
    pub fn publish(
        &self,
        session_id: SessionId,
        branch_id: Option<BranchId>,
        event: AgentEvent,
    ) -> EventEnvelope {
        let log = self.log_for(session_id);
        let mut log = log.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let id = log.next_id;
        log.next_id += 1;

        let envelope = Arc::new(EventEnvelope {
            id,
            session_id,
            branch_id,
            event,
            published_at: chrono::Utc::now(),
        });

        log.retained.push_back(envelope.clone());
        if log.retained.len() > self.ring_capacity {
            log.retained.pop_front();
        }

        trace!(session = %session_id, id, event_type = envelope.event.event_type(), "publishing event");
        let _ = log.sender.send(envelope.clone());

        (*envelope).clone()
    }

    /// Subscribe to a session's event stream, optionally scoped to a branch
    /// and optionally resuming after a previously observed id.
    #[must_use]
    pub fn subscribe(
        &self,
        session_id: SessionId,
        branch_id: Option<BranchId>,
        after: Option<SeqId>,
    ) -> EventSubscription {
        let log = self.log_for(session_id);
        let guard = log.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let receiver = guard.sender.subscribe();
        let backlog: VecDeque<Arc<EventEnvelope>> = match after {
            Some(after) => guard
                .retained
                .iter()
                .filter(|e| e.id > after && branch_matches(e, branch_id))
                .cloned()
                .collect(),
            None => VecDeque::new(),
        };
        let last_seen = backlog.back().map(|e| e.id).or(after);
        drop(guard);

        EventSubscription {
            backlog,
            receiver,
            branch_filter: branch_id,
            last_seen,
        }
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

fn branch_matches(envelope: &EventEnvelope, filter: Option<BranchId>) -> bool {
    match (filter, envelope.branch_id) {
        (None, _) => true,
        (Some(want), Some(have)) => want == have,
        (Some(_), None) => false,
    }
}

/// A live, resumable subscription to one session's event stream.
///
/// Dropping this releases the underlying broadcast receiver and any
/// buffered backlog, satisfying the "cancellation releases per-subscriber
/// resources" requirement.
pub struct EventSubscription {
    backlog: VecDeque<Arc<EventEnvelope>>,
    receiver: broadcast::Receiver<Arc<EventEnvelope>>,
    branch_filter: Option<BranchId>,
    last_seen: Option<SeqId>,
}

impl EventSubscription {
    /// Receive the next envelope: first the replayed backlog (oldest first),
    /// then live events matching this subscription's branch filter.
    ///
    /// Returns `None` only when the store itself has been dropped.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            if let Some(envelope) = self.backlog.pop_front() {
                self.last_seen = Some(envelope.id);
                return Some((*envelope).clone());
            }

            match self.receiver.recv().await {
                Ok(envelope) => {
                    if !branch_matches(&envelope, self.branch_filter) {
                        continue;
                    }
                    if let Some(last) = self.last_seen {
                        if envelope.id <= last {
                            continue;
                        }
                    }
                    self.last_seen = Some(envelope.id);
                    return Some((*envelope).clone());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged, oldest envelopes dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The last envelope id this subscription has yielded, usable as a
    /// resume cursor for a subsequent `subscribe` call.
    #[must_use]
    pub fn last_seen(&self) -> Option<SeqId> {
        self.last_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AgentEvent;

    #[tokio::test]
    async fn publish_assigns_strictly_increasing_ids_per_session() {
        let store = EventStore::new();
        let session = SessionId::new();
        let e1 = store.publish(session, None, AgentEvent::StreamStarted);
        let e2 = store.publish(session, None, AgentEvent::PlanModeEntered);
        assert_eq!(e1.id, 1);
        assert_eq!(e2.id, 2);
    }

    #[tokio::test]
    async fn subscriber_established_before_publish_observes_it() {
        let store = EventStore::new();
        let session = SessionId::new();
        let mut sub = store.subscribe(session, None, None);
        store.publish(session, None, AgentEvent::StreamStarted);
        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.id, 1);
    }

    #[tokio::test]
    async fn resume_cursor_replays_only_newer_envelopes() {
        let store = EventStore::new();
        let session = SessionId::new();
        store.publish(session, None, AgentEvent::StreamStarted);
        store.publish(session, None, AgentEvent::StreamChunk { chunk: "a".into() });
        let e3 = store.publish(session, None, AgentEvent::PlanModeEntered);

        let mut sub = store.subscribe(session, None, Some(1));
        let first = sub.recv().await.unwrap();
        assert_eq!(first.id, 2);
        let second = sub.recv().await.unwrap();
        assert_eq!(second.id, e3.id);
    }

    #[tokio::test]
    async fn branch_filter_excludes_other_branches() {
        let store = EventStore::new();
        let session = SessionId::new();
        let b1 = BranchId::new();
        let b2 = BranchId::new();
        let mut sub = store.subscribe(session, Some(b1), None);

        store.publish(session, Some(b2), AgentEvent::StreamStarted);
        store.publish(session, Some(b1), AgentEvent::PlanModeEntered);

        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.branch_id, Some(b1));
    }

    #[tokio::test]
    async fn no_cursor_means_live_only_no_backlog() {
        let store = EventStore::new();
        let session = SessionId::new();
        store.publish(session, None, AgentEvent::StreamStarted);

        let mut sub = store.subscribe(session, None, None);
        store.publish(session, None, AgentEvent::PlanModeEntered);
        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.id, 2);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_without_error() {
        let store = EventStore::with_capacity(2);
        let session = SessionId::new();
        store.publish(session, None, AgentEvent::StreamStarted);
        store.publish(session, None, AgentEvent::StreamChunk { chunk: "a".into() });
        store.publish(session, None, AgentEvent::PlanModeEntered);

        // Ring capacity is 2: the id=1 envelope should have been evicted.
        let mut sub = store.subscribe(session, None, Some(0));
        let first = sub.recv().await.unwrap();
        assert_eq!(first.id, 2);
    }
}
