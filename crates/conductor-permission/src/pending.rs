//! Deferred resolution for suspended `ask` decisions.
//!
//! When [`crate::PermissionHandler::check`] returns `Ask`, the caller (the
//! `ToolRunner`) registers the request here, publishes `PermissionRequested`,
//! and awaits the returned receiver. Some other task — the `AgentLoop`
//! handling a `respondPermission` request from a client — resolves it by
//! `request_id`. A verdict that never arrives times out, per spec §5's local
//! recovery rule: "permission `ask` timeout -> surface as `error-json` tool
//! result, turn continues".

use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;

use conductor_core::RequestId;

use crate::decision::PermissionVerdict;
use crate::error::{PermissionError, PermissionResult};

/// Registry of in-flight `ask` decisions, keyed by the request id handed to
/// the client in `PermissionRequested`.
#[derive(Debug, Default)]
pub struct PendingPermissions {
    slots: DashMap<RequestId, oneshot::Sender<PermissionVerdict>>,
}

impl PendingPermissions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new suspended request, returning the receiver the caller
    /// should await (optionally under a timeout, see [`Self::wait`]).
    pub fn register(&self, request_id: RequestId) -> oneshot::Receiver<PermissionVerdict> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(request_id, tx);
        rx
    }

    /// Deliver a client decision for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownRequest`] if no call is currently
    /// suspended on that id (already resolved, timed out, or never
    /// registered).
    pub fn resolve(&self, request_id: RequestId, verdict: PermissionVerdict) -> PermissionResult<()> {
        let Some((_, sender)) = self.slots.remove(&request_id) else {
            return Err(PermissionError::UnknownRequest {
                request_id: request_id.to_string(),
            });
        };
        // The receiver may have been dropped if the waiter already timed out;
        // that's not an error worth propagating to the resolver.
        let _ = sender.send(verdict);
        Ok(())
    }

    /// Number of requests currently awaiting a client decision.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }

    /// Await a verdict for a registered request, denying on timeout and
    /// removing the slot either way.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Timeout`] if `timeout` elapses first, or
    /// [`PermissionError::Internal`] if the sender half was dropped without
    /// sending (the registry was torn down mid-request).
    pub async fn wait(
        &self,
        request_id: RequestId,
        receiver: oneshot::Receiver<PermissionVerdict>,
        timeout: Duration,
    ) -> PermissionResult<PermissionVerdict> {
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(_)) => Err(PermissionError::Internal(
                "permission request sender dropped".to_string(),
            )),
            Err(_) => {
                self.slots.remove(&request_id);
                Err(PermissionError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_verdict_to_waiter() {
        let pending = PendingPermissions::new();
        let request_id = RequestId::new();
        let rx = pending.register(request_id);

        pending.resolve(request_id, PermissionVerdict::Allow).unwrap();

        let verdict = pending
            .wait(request_id, rx, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(verdict, PermissionVerdict::Allow);
    }

    #[tokio::test]
    async fn resolve_unknown_request_errors() {
        let pending = PendingPermissions::new();
        let err = pending.resolve(RequestId::new(), PermissionVerdict::Allow);
        assert!(matches!(err, Err(PermissionError::UnknownRequest { .. })));
    }

    #[tokio::test]
    async fn wait_times_out_when_nobody_resolves() {
        let pending = PendingPermissions::new();
        let request_id = RequestId::new();
        let rx = pending.register(request_id);

        let err = pending
            .wait(request_id, rx, Duration::from_millis(10))
            .await;
        assert!(matches!(err, Err(PermissionError::Timeout { .. })));
        assert_eq!(pending.pending_count(), 0);
    }

    #[tokio::test]
    async fn pending_count_tracks_registrations() {
        let pending = PendingPermissions::new();
        let request_id = RequestId::new();
        let _rx = pending.register(request_id);
        assert_eq!(pending.pending_count(), 1);
        pending.resolve(request_id, PermissionVerdict::Allow).unwrap();
        assert_eq!(pending.pending_count(), 0);
    }
}
