//! Wire types and the JSON-RPC trait for the external interface (spec §6).
//!
//! Every method here mirrors one spec §6 operation. Domain types
//! (`conductor_storage::types::{Session,Branch,Message}`,
//! `conductor_runtime::{SteerCommand,PlanDecision,SubmitMode}`) are not used
//! directly on the wire — these wire types are the stable boundary, and the
//! `server` module converts between the two.

use chrono::{DateTime, Utc};
use conductor_core::{BranchId, MessageId, RequestId, SessionId};
use conductor_events::EventEnvelope;
use conductor_storage::types::{Message, MessageKind};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

/// A session as reported by `listSessions`/`createSession`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id.
    pub session_id: SessionId,
    /// Display name, if set.
    pub name: Option<String>,
    /// Working directory new turns operate from.
    pub cwd: String,
    /// Whether permission prompts are bypassed.
    pub bypass: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A branch as reported by `listBranches`/`createBranch`/`forkBranch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch id.
    pub branch_id: BranchId,
    /// Owning session.
    pub session_id: SessionId,
    /// Parent branch, if forked.
    pub parent_branch_id: Option<BranchId>,
    /// Message in the parent branch this branch was forked at.
    pub parent_message_id: Option<MessageId>,
    /// Display name.
    pub name: Option<String>,
    /// Model override, if any.
    pub model: Option<String>,
    /// Compaction summary, if `compactBranch` has run.
    pub summary: Option<String>,
}

/// One node of the branch forest returned by `getBranchTree`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchTreeNode {
    /// The branch at this node.
    pub branch: BranchInfo,
    /// Number of messages stored on this branch.
    pub message_count: usize,
    /// Branches forked from this one.
    pub children: Vec<BranchTreeNode>,
}

/// A point-in-time snapshot of an actor's session state (`getSessionState`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateSnapshot {
    /// Session id.
    pub session_id: SessionId,
    /// Branch id.
    pub branch_id: BranchId,
    /// Currently active agent definition name.
    pub active_agent: String,
    /// Model currently in effect for this branch.
    pub model: String,
    /// Number of messages stored on the branch.
    pub message_count: usize,
    /// Whether bypass is enabled for the owning session.
    pub bypass: bool,
    /// Compaction summary, if one has been produced.
    pub summary: Option<String>,
}

/// Provider/pricing/generation metadata for one selectable model
/// (`listModels`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, as passed to `sendMessage`/`switchModel`.
    pub id: String,
    /// The provider that serves this model.
    pub provider: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Maximum context length, in tokens.
    pub max_context_tokens: usize,
    /// Whether this model supports tool calling.
    pub supports_tools: bool,
}

/// Parameters for `createSession`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionParams {
    /// Optional first user message to run as soon as the session is created.
    pub first_message: Option<String>,
    /// Working directory; defaults to the kernel's own cwd if omitted.
    pub cwd: Option<String>,
    /// Whether to start the session with permission prompts bypassed.
    pub bypass: Option<bool>,
}

/// Result of `createSession`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResult {
    /// The new session's id.
    pub session_id: SessionId,
    /// The new session's root branch id.
    pub branch_id: BranchId,
    /// The session's display name, if any.
    pub name: Option<String>,
    /// Whether the session was created with bypass enabled.
    pub bypass: bool,
}

/// Submission mode for `sendMessage`, mirroring
/// `conductor_runtime::SubmitMode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitModeWire {
    /// Enqueue behind the currently running turn.
    #[default]
    Queue,
    /// Inject into the currently running turn.
    Interject,
}

/// Parameters for `sendMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageParams {
    /// Target session.
    pub session_id: SessionId,
    /// Target branch.
    pub branch_id: BranchId,
    /// Message text.
    pub content: String,
    /// Queue vs. interject; defaults to `Queue`.
    #[serde(default)]
    pub mode: SubmitModeWire,
    /// Per-message model override.
    pub model: Option<String>,
}

/// Parameters for `createBranch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranchParams {
    /// Owning session.
    pub session_id: SessionId,
    /// Display name for the new branch.
    pub name: Option<String>,
}

/// Parameters for `switchBranch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchBranchParams {
    /// Owning session.
    pub session_id: SessionId,
    /// Branch currently active.
    pub from_branch_id: BranchId,
    /// Branch to switch to.
    pub to_branch_id: BranchId,
    /// Whether to compact `from_branch_id` before switching away from it.
    #[serde(default)]
    pub summarize: bool,
}

/// Parameters for `forkBranch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkBranchParams {
    /// Owning session.
    pub session_id: SessionId,
    /// Branch to fork from.
    pub from_branch_id: BranchId,
    /// Message in `from_branch_id` to fork at; the new branch's history
    /// includes this message and everything before it.
    pub at_message_id: MessageId,
    /// Display name for the new branch.
    pub name: Option<String>,
}

/// Result of `forkBranch`/`createBranch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchIdResult {
    /// The new branch's id.
    pub branch_id: BranchId,
}

/// Parameters for `compactBranch`/`getSessionState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBranchParams {
    /// Target session.
    pub session_id: SessionId,
    /// Target branch.
    pub branch_id: BranchId,
}

/// Parameters for `subscribeEvents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeEventsParams {
    /// Session to subscribe to.
    pub session_id: SessionId,
    /// Branch to scope the subscription to; `None` subscribes to the whole
    /// session.
    pub branch_id: Option<BranchId>,
    /// Resume cursor: only events after this id are delivered.
    pub after: Option<u64>,
}

/// A steering command, mirroring `conductor_runtime::SteerCommand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum SteerCommandWire {
    /// Stop at the next safe point.
    Cancel,
    /// Stop and clear any queued/interjected messages.
    Interrupt,
    /// Inject a message into the current turn.
    Interject {
        /// The message text.
        message: String,
    },
    /// Switch the active agent definition.
    SwitchAgent {
        /// Name of the agent definition to switch to.
        agent: String,
    },
    /// Switch the branch's model preference.
    SwitchModel {
        /// Model identifier to switch to.
        model: String,
    },
    /// Switch between build and plan mode.
    SwitchMode {
        /// `"build"` or `"plan"`.
        mode: String,
    },
}

/// Parameters for `steer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteerParams {
    /// Target session.
    pub session_id: SessionId,
    /// Target branch.
    pub branch_id: BranchId,
    /// The command to apply.
    pub command: SteerCommandWire,
}

/// Parameters for `respondQuestions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondQuestionsParams {
    /// Id of the suspended `QuestionsAsked` prompt.
    pub request_id: RequestId,
    /// One answer list per question asked.
    pub answers: Vec<Vec<String>>,
}

/// A permission decision, mirroring `conductor_permission::PermissionVerdict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecisionWire {
    /// Approve the call.
    Allow,
    /// Refuse the call.
    Deny {
        /// Reason given for the refusal, if any.
        reason: Option<String>,
    },
}

/// Parameters for `respondPermission`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondPermissionParams {
    /// Id of the suspended `PermissionRequested` prompt.
    pub request_id: RequestId,
    /// The client's decision.
    pub decision: PermissionDecisionWire,
    /// Whether to remember this decision for future calls to the same tool
    /// in this session (handled by the embedding application's permission
    /// policy, not the kernel itself).
    #[serde(default)]
    pub persist: bool,
}

/// Parameters for `respondPlan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondPlanParams {
    /// Id of the suspended `PlanPresented` prompt.
    pub request_id: RequestId,
    /// `"confirm"` or `"reject"`.
    pub decision: String,
    /// Reason given on rejection, if any.
    pub reason: Option<String>,
}

/// Parameters for `updateSessionBypass`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSessionBypassParams {
    /// Target session.
    pub session_id: SessionId,
    /// New bypass value.
    pub bypass: bool,
}

/// Result of `updateSessionBypass`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSessionBypassResult {
    /// The value now in effect.
    pub bypass: bool,
}

/// Every message a stored `Message` renders to on the wire: flattened parts
/// plus the metadata `listMessages` callers need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message id.
    pub message_id: MessageId,
    /// Owning session.
    pub session_id: SessionId,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Author role.
    pub role: conductor_core::Role,
    /// Ordered content parts, as stored.
    pub parts: Vec<conductor_storage::types::MessagePart>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Wall-clock duration of the turn that produced this message, if known.
    pub turn_duration_ms: Option<u64>,
    /// Regular turn message vs. an injected interjection.
    pub kind: MessageKind,
}

impl From<Message> for MessageInfo {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            session_id: message.session_id,
            branch_id: message.branch_id,
            role: message.role,
            parts: message.parts,
            created_at: message.created_at,
            turn_duration_ms: message.turn_duration_ms,
            kind: message.kind,
        }
    }
}

/// The external JSON-RPC surface (spec §6).
#[rpc(server, client, namespace = "conductor")]
pub trait ConductorRpc {
    /// Create a new session (and its root branch), optionally running a
    /// first message immediately.
    #[method(name = "createSession")]
    async fn create_session(&self, params: CreateSessionParams) -> Result<CreateSessionResult, ErrorObjectOwned>;

    /// Submit a message to a branch.
    #[method(name = "sendMessage")]
    async fn send_message(&self, params: SendMessageParams) -> Result<(), ErrorObjectOwned>;

    /// List all messages stored on a branch.
    #[method(name = "listMessages")]
    async fn list_messages(&self, branch_id: BranchId) -> Result<Vec<MessageInfo>, ErrorObjectOwned>;

    /// List every known session.
    #[method(name = "listSessions")]
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ErrorObjectOwned>;

    /// List the branches belonging to a session.
    #[method(name = "listBranches")]
    async fn list_branches(&self, session_id: SessionId) -> Result<Vec<BranchInfo>, ErrorObjectOwned>;

    /// Build the branch forest for a session, with per-node message counts.
    #[method(name = "getBranchTree")]
    async fn get_branch_tree(&self, session_id: SessionId) -> Result<Vec<BranchTreeNode>, ErrorObjectOwned>;

    /// Create a new empty root branch on a session.
    #[method(name = "createBranch")]
    async fn create_branch(&self, params: CreateBranchParams) -> Result<BranchIdResult, ErrorObjectOwned>;

    /// Switch which branch of a session is considered active, optionally
    /// compacting the branch being switched away from first.
    #[method(name = "switchBranch")]
    async fn switch_branch(&self, params: SwitchBranchParams) -> Result<(), ErrorObjectOwned>;

    /// Fork a new branch from a point in an existing branch's history.
    #[method(name = "forkBranch")]
    async fn fork_branch(&self, params: ForkBranchParams) -> Result<BranchIdResult, ErrorObjectOwned>;

    /// Force an immediate, durable compaction of a branch's stored history.
    #[method(name = "compactBranch")]
    async fn compact_branch(&self, params: SessionBranchParams) -> Result<(), ErrorObjectOwned>;

    /// Fetch a point-in-time snapshot of an actor's session state.
    #[method(name = "getSessionState")]
    async fn get_session_state(&self, params: SessionBranchParams) -> Result<SessionStateSnapshot, ErrorObjectOwned>;

    /// Steer a running (or idle) actor: cancel, interrupt, interject, or
    /// switch agent/model/mode.
    #[method(name = "steer")]
    async fn steer(&self, params: SteerParams) -> Result<(), ErrorObjectOwned>;

    /// Answer a suspended `QuestionsAsked` prompt.
    #[method(name = "respondQuestions")]
    async fn respond_questions(&self, params: RespondQuestionsParams) -> Result<(), ErrorObjectOwned>;

    /// Answer a suspended `PermissionRequested` prompt.
    #[method(name = "respondPermission")]
    async fn respond_permission(&self, params: RespondPermissionParams) -> Result<(), ErrorObjectOwned>;

    /// Answer a suspended `PlanPresented` prompt.
    #[method(name = "respondPlan")]
    async fn respond_plan(&self, params: RespondPlanParams) -> Result<(), ErrorObjectOwned>;

    /// Toggle whether permission prompts are bypassed for a session.
    #[method(name = "updateSessionBypass")]
    async fn update_session_bypass(
        &self,
        params: UpdateSessionBypassParams,
    ) -> Result<UpdateSessionBypassResult, ErrorObjectOwned>;

    /// List the models available to select via `sendMessage`/`steer`.
    #[method(name = "listModels")]
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ErrorObjectOwned>;

    /// Subscribe to a session's (optionally branch-scoped) event stream,
    /// optionally resuming after a previously observed event id.
    #[subscription(name = "subscribeEvents" => "event", unsubscribe = "unsubscribeEvents", item = EventEnvelope)]
    async fn subscribe_events(&self, params: SubscribeEventsParams) -> SubscriptionResult;
}
