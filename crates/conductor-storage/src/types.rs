//! The Session/Branch/Message/Todo data model (spec §3).

use chrono::{DateTime, Utc};
use conductor_core::{BranchId, MessageId, Role, SessionId, ToolCallId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level conversation. Exactly one branch is active at any time; that
/// selection is tracked by the caller (typically the AgentLoop registry),
/// not stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique id.
    pub id: SessionId,
    /// User-assigned or auto-generated display name.
    pub name: Option<String>,
    /// Parent session id, set when this session is a subagent's session.
    pub parent_session_id: Option<SessionId>,
    /// Working directory new turns in this session operate from.
    pub cwd: String,
    /// Whether permission prompts are bypassed for this session.
    pub bypass: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time (rename, bypass toggle, subagent spawn).
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Construct a new root session rooted at `cwd`.
    #[must_use]
    pub fn new(cwd: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            name: None,
            parent_session_id: None,
            cwd: cwd.into(),
            bypass: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Construct a subagent session inheriting `cwd`/`bypass` from its parent.
    #[must_use]
    pub fn new_subagent(parent: &Session) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            name: None,
            parent_session_id: Some(parent.id),
            cwd: parent.cwd.clone(),
            bypass: parent.bypass,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A linear ordered sequence of messages rooted at a session. Branches form
/// a forest per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Unique id.
    pub id: BranchId,
    /// Owning session.
    pub session_id: SessionId,
    /// Parent branch, if this branch was forked from another.
    pub parent_branch_id: Option<BranchId>,
    /// Message in the parent branch this branch was forked at.
    pub parent_message_id: Option<MessageId>,
    /// Display name.
    pub name: Option<String>,
    /// Model preference for this branch, if overridden from the session default.
    pub model: Option<String>,
    /// Compaction summary, set once `compactBranch` has run.
    pub summary: Option<String>,
}

impl Branch {
    /// Construct a new root branch for `session_id`.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            id: BranchId::new(),
            session_id,
            parent_branch_id: None,
            parent_message_id: None,
            name: None,
            model: None,
            summary: None,
        }
    }

    /// Construct a forked branch. Inherits the parent's `model`, per the
    /// resolved open question in `DESIGN.md`.
    #[must_use]
    pub fn forked_from(parent: &Branch, at_message_id: MessageId, name: Option<String>) -> Self {
        Self {
            id: BranchId::new(),
            session_id: parent.session_id,
            parent_branch_id: Some(parent.id),
            parent_message_id: Some(at_message_id),
            name,
            model: parent.model.clone(),
            summary: None,
        }
    }
}

/// Whether a message is a normal turn boundary or an injected interjection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A regular message in the turn sequence.
    Regular,
    /// A message injected into an in-flight turn via `Interject`.
    Interjection,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Regular
    }
}

/// Structured content of a tool's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolOutput {
    /// Successful tool output.
    Json {
        /// The output value.
        value: Value,
    },
    /// Failed tool output (unknown tool, denied permission, execution failure).
    ErrorJson {
        /// The error value, conventionally `{"error": "..."}`.
        value: Value,
    },
}

impl ToolOutput {
    /// Build an error output wrapping a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorJson {
            value: serde_json::json!({ "error": message.into() }),
        }
    }

    /// Whether this output represents an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ErrorJson { .. })
    }
}

/// One element of a message's ordered content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum MessagePart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A tool invocation requested by the assistant.
    ToolCall {
        /// Correlates with the eventual `ToolResult`.
        tool_call_id: ToolCallId,
        /// Name of the tool invoked.
        tool_name: String,
        /// Validated tool input.
        input: Value,
    },
    /// The result of a previously requested tool call.
    ToolResult {
        /// Correlates with the originating `ToolCall`.
        tool_call_id: ToolCallId,
        /// Name of the tool invoked.
        tool_name: String,
        /// The tool's structured output.
        output: ToolOutput,
    },
    /// An inline image attachment.
    Image {
        /// MIME type of the image data.
        mime_type: String,
        /// Base64-encoded image bytes.
        data: String,
    },
}

/// An immutable, append-only record in a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Owning session (denormalized from branch for query convenience).
    pub session_id: SessionId,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Author role.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<MessagePart>,
    /// Creation time; messages are listed in this order, stable by id on ties.
    pub created_at: DateTime<Utc>,
    /// Wall-clock duration of the turn that produced this message, if known.
    pub turn_duration_ms: Option<u64>,
    /// Regular turn message vs. an injected interjection.
    pub kind: MessageKind,
}

impl Message {
    /// Construct a new message with the current time and `Regular` kind.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        branch_id: BranchId,
        role: Role,
        parts: Vec<MessagePart>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            branch_id,
            role,
            parts,
            created_at: Utc::now(),
            turn_duration_ms: None,
            kind: MessageKind::Regular,
        }
    }
}

/// Status of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not yet started.
    Pending,
    /// Currently being worked on.
    InProgress,
    /// Finished.
    Completed,
}

/// A single checklist item, scoped to a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    /// Unique id, caller-assigned (todos are replaced wholesale, not CRUD'd).
    pub id: String,
    /// Item text.
    pub content: String,
    /// Current status.
    pub status: TodoStatus,
    /// Optional priority label.
    pub priority: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// One node of the per-session branch forest, as returned by `getBranchTree`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchTreeNode {
    /// The branch at this node.
    pub branch: Branch,
    /// Number of messages stored on this branch.
    pub message_count: usize,
    /// Branches forked from this one.
    pub children: Vec<BranchTreeNode>,
}
