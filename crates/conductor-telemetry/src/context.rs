//! Request context for correlation and tracing across a turn.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use conductor_core::{BranchId, SessionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request context for correlation across operations.
///
/// Carries the identifiers a single call into the runtime should tag onto
/// its tracing span: a fresh per-call `request_id`, a `correlation_id` that
/// a chain of child contexts shares, and the session/branch the call
/// belongs to, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique identifier for this particular call.
    pub request_id: Uuid,
    /// Correlation ID shared by this context and all contexts derived from it.
    pub correlation_id: Uuid,
    /// Parent request ID, if this is a child context.
    pub parent_id: Option<Uuid>,
    /// Session the call is operating on, if any.
    pub session_id: Option<SessionId>,
    /// Branch the call is operating on, if any.
    pub branch_id: Option<BranchId>,
    /// When the call started.
    pub started_at: DateTime<Utc>,
    /// Source component that created this context (e.g. `"kernel"`, `"agent_loop"`).
    pub source: String,
    /// Operation being performed (e.g. `"sendMessage"`, `"compactBranch"`).
    pub operation: Option<String>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new root request context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            session_id: None,
            branch_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a child context that inherits correlation info.
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            session_id: self.session_id,
            branch_id: self.branch_id,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Set the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Tag the session this call belongs to.
    #[must_use]
    pub fn with_session_id(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Tag the branch this call belongs to.
    #[must_use]
    pub fn with_branch_id(mut self, id: BranchId) -> Self {
        self.branch_id = Some(id);
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Elapsed time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        // Utc::now() >= self.started_at by construction.
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed
    }

    /// Elapsed time since the call started, in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Create a tracing span tagged with this context's identifiers.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            session_id = self.session_id.map(|id| id.to_string()),
            branch_id = self.branch_id.map(|id| id.to_string()),
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }

    /// Whether this context was derived from a parent.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// A short identifier suitable for compact log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.to_string()[..8].to_string()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Guard that logs when a call completes, keeping its span entered for the
/// guard's lifetime.
pub struct RequestGuard {
    context: RequestContext,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter `context`'s span and hold it until the guard is dropped.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self { context, span }
    }

    /// The context this guard is holding open.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_context_creation() {
        let ctx = RequestContext::new("test");
        assert_eq!(ctx.source, "test");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.parent_id.is_none());
        assert!(ctx.session_id.is_none());
        assert!(ctx.branch_id.is_none());
    }

    #[test]
    fn request_context_builder() {
        let session = SessionId::new();
        let branch = BranchId::new();
        let correlation = Uuid::new_v4();

        let ctx = RequestContext::new("test")
            .with_correlation_id(correlation)
            .with_session_id(session)
            .with_branch_id(branch)
            .with_operation("sendMessage")
            .with_metadata("key", "value");

        assert_eq!(ctx.correlation_id, correlation);
        assert_eq!(ctx.session_id, Some(session));
        assert_eq!(ctx.branch_id, Some(branch));
        assert_eq!(ctx.operation, Some("sendMessage".to_string()));
        assert_eq!(ctx.metadata.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn child_context_inherits_correlation_and_session() {
        let session = SessionId::new();
        let parent = RequestContext::new("parent").with_session_id(session).with_metadata("inherited", "yes");

        let child = parent.child("child");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.parent_id, Some(parent.request_id));
        assert_eq!(child.session_id, Some(session));
        assert_eq!(child.metadata.get("inherited"), Some(&"yes".to_string()));
    }

    #[test]
    fn elapsed_tracks_wall_clock() {
        let ctx = RequestContext::new("test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn short_id_is_eight_chars() {
        let ctx = RequestContext::new("test");
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn serialization_round_trips() {
        let ctx = RequestContext::new("test").with_operation("sendMessage").with_metadata("key", "value");

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"source\":\"test\""));
        assert!(json.contains("\"operation\":\"sendMessage\""));

        let parsed: RequestContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source, "test");
        assert_eq!(parsed.operation, Some("sendMessage".to_string()));
    }
}
