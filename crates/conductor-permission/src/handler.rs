//! The `Permission` collaborator: `check(tool, input) -> allow | deny | ask`.

use async_trait::async_trait;
use globset::Glob;
use serde_json::Value;
use std::collections::HashSet;

use crate::decision::PermissionDecision;

/// Decides whether a single tool call may proceed.
///
/// Implementations present the client's policy: an interactive frontend asks
/// the user, a CI harness might always deny, tests script fixed verdicts.
/// `check` must not block on anything other than its own policy lookup — the
/// `ask` path suspends the caller, it never blocks inside `check` itself.
#[async_trait]
pub trait PermissionHandler: Send + Sync {
    /// Decide whether `tool` may run with `input`.
    async fn check(&self, tool: &str, input: &Value) -> PermissionDecision;
}

/// Allows every tool call. Useful for tests and for trusted/bypass sessions
/// (spec's `Session.bypass` flag).
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionHandler for AllowAll {
    async fn check(&self, _tool: &str, _input: &Value) -> PermissionDecision {
        PermissionDecision::Allow
    }
}

/// Denies every tool call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl PermissionHandler for DenyAll {
    async fn check(&self, tool: &str, _input: &Value) -> PermissionDecision {
        PermissionDecision::deny(format!("tool '{tool}' is denied by policy"))
    }
}

/// Configured hard boundaries, evaluated before any client round-trip.
///
/// # Check order
///
/// 1. Is the tool in `blocked_tools`? -> deny
/// 2. Does an input path (read from `path` or `file_path`) match `denied_paths`? -> deny
/// 3. Is `allowed_paths` non-empty and the path doesn't match any entry? -> deny
/// 4. Is the tool in `ask_tools`? -> ask
/// 5. Otherwise -> allow
#[derive(Debug, Clone)]
pub struct PolicyHandler {
    /// Tools that never run, regardless of input.
    pub blocked_tools: HashSet<String>,
    /// Tools that always suspend for a client decision.
    pub ask_tools: HashSet<String>,
    /// Glob patterns a `path`/`file_path` input field must not match.
    pub denied_paths: Vec<String>,
    /// Glob patterns a `path`/`file_path` input field must match, if non-empty.
    pub allowed_paths: Vec<String>,
}

impl PolicyHandler {
    /// A policy with nothing configured — equivalent to [`AllowAll`] until
    /// tools are added to one of the sets.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            blocked_tools: HashSet::new(),
            ask_tools: HashSet::new(),
            denied_paths: Vec::new(),
            allowed_paths: Vec::new(),
        }
    }

    fn input_path(input: &Value) -> Option<&str> {
        input
            .get("path")
            .or_else(|| input.get("file_path"))
            .and_then(Value::as_str)
    }

    fn path_matches(patterns: &[String], path: &str) -> bool {
        patterns.iter().any(|pattern| {
            Glob::new(pattern)
                .ok()
                .is_some_and(|g| g.compile_matcher().is_match(path))
        })
    }
}

impl Default for PolicyHandler {
    /// Blocks nothing but asks before `bash` and `edit`/`write`-shaped tools,
    /// matching the conservative default a fresh installation should ship
    /// with until the operator configures something looser or tighter.
    fn default() -> Self {
        Self {
            blocked_tools: HashSet::new(),
            ask_tools: ["bash", "edit_file", "write_file"]
                .into_iter()
                .map(String::from)
                .collect(),
            denied_paths: vec![
                "/etc/**".to_string(),
                "/boot/**".to_string(),
                "/sys/**".to_string(),
                "/proc/**".to_string(),
            ],
            allowed_paths: Vec::new(),
        }
    }
}

#[async_trait]
impl PermissionHandler for PolicyHandler {
    async fn check(&self, tool: &str, input: &Value) -> PermissionDecision {
        if self.blocked_tools.contains(tool) {
            return PermissionDecision::deny(format!("tool '{tool}' is blocked by policy"));
        }

        if let Some(path) = Self::input_path(input) {
            if Self::path_matches(&self.denied_paths, path) {
                return PermissionDecision::deny(format!("path '{path}' is denied by policy"));
            }
            if !self.allowed_paths.is_empty() && !Self::path_matches(&self.allowed_paths, path) {
                return PermissionDecision::deny(format!("path '{path}' is not in allowed paths"));
            }
        }

        if self.ask_tools.contains(tool) {
            return PermissionDecision::Ask;
        }

        PermissionDecision::Allow
    }
}
