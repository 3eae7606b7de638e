//! Generic deferred-resolution slots, the same shape as
//! `conductor_permission::PendingPermissions` but reusable for any suspended
//! prompt an `AgentActor` can raise: `QuestionsAsked` and `PlanPresented`
//! (spec §4.D) both suspend on a `RequestId` until a client call resolves it.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

use conductor_core::RequestId;

use crate::error::{RuntimeError, RuntimeResult};

/// Registry of in-flight suspended prompts of a single kind, keyed by the
/// request id handed to the client in the originating event.
#[derive(Debug)]
pub struct DeferredSlots<T> {
    slots: DashMap<RequestId, oneshot::Sender<T>>,
}

impl<T> Default for DeferredSlots<T> {
    fn default() -> Self {
        Self { slots: DashMap::new() }
    }
}

impl<T> DeferredSlots<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new suspended request, returning the receiver the caller
    /// should await (see [`Self::wait`]).
    pub fn register(&self, request_id: RequestId) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(request_id, tx);
        rx
    }

    /// Deliver a client answer for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownRequest`] if no call is currently
    /// suspended on that id.
    pub fn resolve(&self, request_id: RequestId, value: T) -> RuntimeResult<()> {
        let Some((_, sender)) = self.slots.remove(&request_id) else {
            return Err(RuntimeError::UnknownRequest(request_id.to_string()));
        };
        let _ = sender.send(value);
        Ok(())
    }

    /// Number of requests currently awaiting a client answer.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }

    /// Await an answer for a registered request, removing the slot either
    /// way. Times out per spec §5's suspended-prompt deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::System`] if `timeout` elapses or the sender
    /// half was dropped without sending.
    pub async fn wait(&self, request_id: RequestId, receiver: oneshot::Receiver<T>, timeout: Duration) -> RuntimeResult<T> {
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => {
                self.slots.remove(&request_id);
                Err(RuntimeError::System(conductor_core::SystemError::new(
                    "deferred",
                    "wait",
                    "sender dropped without answering",
                )))
            }
            Err(_) => {
                self.slots.remove(&request_id);
                Err(RuntimeError::System(conductor_core::SystemError::new(
                    "deferred",
                    "wait",
                    format!("timed out after {}ms", timeout.as_millis()),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_value_to_waiter() {
        let slots: DeferredSlots<u32> = DeferredSlots::new();
        let request_id = RequestId::new();
        let rx = slots.register(request_id);
        slots.resolve(request_id, 42).unwrap();
        let value = slots.wait(request_id, rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn resolve_unknown_request_errors() {
        let slots: DeferredSlots<u32> = DeferredSlots::new();
        let err = slots.resolve(RequestId::new(), 1);
        assert!(matches!(err, Err(RuntimeError::UnknownRequest(_))));
    }

    #[tokio::test]
    async fn wait_times_out_when_nobody_resolves() {
        let slots: DeferredSlots<u32> = DeferredSlots::new();
        let request_id = RequestId::new();
        let rx = slots.register(request_id);
        let err = slots.wait(request_id, rx, Duration::from_millis(10)).await;
        assert!(err.is_err());
        assert_eq!(slots.pending_count(), 0);
    }
}
