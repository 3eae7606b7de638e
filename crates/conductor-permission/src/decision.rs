//! The verdicts a [`crate::PermissionHandler`] can hand back for a tool call.

use std::fmt;

/// What `check(tool, input)` decides for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Proceed without asking the client.
    Allow,
    /// Refuse outright; the tool never runs.
    Deny {
        /// Human-readable reason surfaced in the `error-json` tool result.
        reason: String,
    },
    /// Neither settled: emit `PermissionRequested` and suspend for a client
    /// decision.
    Ask,
}

impl PermissionDecision {
    /// Deny with a given reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// Whether the tool call may proceed without asking anyone.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Whether this decision refuses the call outright.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Whether this decision requires a client round-trip.
    #[must_use]
    pub fn is_ask(&self) -> bool {
        matches!(self, Self::Ask)
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny { reason } => write!(f, "deny: {reason}"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// The client's answer to a suspended `ask` decision (spec §4.E
/// `respondPermission(requestId, decision)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionVerdict {
    /// The client approved the call.
    Allow,
    /// The client refused the call.
    Deny {
        /// Reason the client gave, if any.
        reason: Option<String>,
    },
}

impl PermissionVerdict {
    /// Whether the client approved the call.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for PermissionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny { reason: Some(r) } => write!(f, "deny: {r}"),
            Self::Deny { reason: None } => write!(f, "deny"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_predicates() {
        assert!(PermissionDecision::Allow.is_allow());
        assert!(PermissionDecision::deny("no").is_deny());
        assert!(PermissionDecision::Ask.is_ask());
    }

    #[test]
    fn verdict_display() {
        assert_eq!(PermissionVerdict::Allow.to_string(), "allow");
        assert_eq!(
            PermissionVerdict::Deny {
                reason: Some("risky".into())
            }
            .to_string(),
            "deny: risky"
        );
    }
}
