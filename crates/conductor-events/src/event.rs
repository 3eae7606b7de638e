//! Event taxonomy and envelopes (spec §3).

use chrono::{DateTime, Utc};
use conductor_core::{BranchId, RequestId, Role, SessionId, ToolCallId, Usage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monotone per-session event id. Strictly increasing within a session;
/// ordering across sessions is unspecified.
pub type SeqId = u64;

/// A published fact about a session, discriminated by `_tag` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum AgentEvent {
    /// A message was appended to the branch.
    MessageReceived {
        /// Role of the appended message.
        role: Role,
    },
    /// A provider stream was opened for this turn.
    StreamStarted,
    /// A text delta arrived from the provider.
    StreamChunk {
        /// The delta text.
        chunk: String,
    },
    /// The provider stream for this turn finished.
    StreamEnded {
        /// Token usage, if the provider reported one.
        usage: Option<Usage>,
        /// Whether the turn was cut short by cancellation.
        #[serde(default)]
        interrupted: bool,
    },
    /// A turn-scoped failure occurred.
    ErrorOccurred {
        /// Human-readable error message.
        error: String,
    },
    /// A tool call dispatch began.
    ToolCallStarted {
        /// Id correlating this with its `ToolCallCompleted`.
        tool_call_id: ToolCallId,
        /// Name of the tool invoked.
        tool_name: String,
        /// Validated tool input.
        input: Value,
    },
    /// A tool call dispatch finished.
    ToolCallCompleted {
        /// Id correlating this with its `ToolCallStarted`.
        tool_call_id: ToolCallId,
        /// Short human-readable summary of the result.
        summary: Option<String>,
        /// The tool's output value.
        output: Value,
        /// Whether the output represents an error.
        is_error: bool,
    },
    /// The active agent definition for the branch changed.
    AgentSwitched {
        /// Previous agent name.
        from_agent: String,
        /// New agent name.
        to_agent: String,
    },
    /// The session's active branch changed.
    BranchSwitched {
        /// Branch now active.
        to_branch_id: BranchId,
    },
    /// The session was renamed.
    SessionNameUpdated {
        /// New session name.
        name: String,
    },
    /// `compactBranch` ran and replaced the branch's stored summary.
    BranchCompacted {
        /// The new compaction summary.
        summary: String,
    },
    /// The branch entered plan mode.
    PlanModeEntered,
    /// The branch left plan mode.
    PlanModeExited,
    /// The agent asked clarifying questions and suspended.
    QuestionsAsked {
        /// Id used to correlate the eventual `respondQuestions` call.
        request_id: RequestId,
        /// The questions asked.
        questions: Vec<String>,
    },
    /// The agent requested permission to run a tool and suspended.
    PermissionRequested {
        /// Id used to correlate the eventual `respondPermission` call.
        request_id: RequestId,
        /// Tool the permission request is for.
        tool: String,
        /// Tool input under consideration.
        input: Value,
    },
    /// The agent presented a plan and suspended.
    PlanPresented {
        /// Id used to correlate the eventual `respondPlan` call.
        request_id: RequestId,
        /// The plan text.
        plan: String,
    },
    /// A subagent was spawned from this session.
    SubagentSpawned {
        /// Name of the agent definition used for the subagent.
        agent: String,
        /// Prompt given to the subagent.
        prompt: String,
    },
    /// A previously spawned subagent finished.
    SubagentCompleted {
        /// Outcome of the subagent run.
        result: SubagentOutcome,
    },
    /// Testing hook: a snapshot of actor machine state.
    MachineInspected {
        /// Free-form state snapshot.
        state: Value,
    },
    /// Testing hook: an internal machine task completed successfully.
    MachineTaskSucceeded {
        /// Name of the task.
        task: String,
    },
}

impl AgentEvent {
    /// Short machine-readable event type, used in logs and diagnostics.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "message_received",
            Self::StreamStarted => "stream_started",
            Self::StreamChunk { .. } => "stream_chunk",
            Self::StreamEnded { .. } => "stream_ended",
            Self::ErrorOccurred { .. } => "error_occurred",
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallCompleted { .. } => "tool_call_completed",
            Self::AgentSwitched { .. } => "agent_switched",
            Self::BranchSwitched { .. } => "branch_switched",
            Self::SessionNameUpdated { .. } => "session_name_updated",
            Self::BranchCompacted { .. } => "branch_compacted",
            Self::PlanModeEntered => "plan_mode_entered",
            Self::PlanModeExited => "plan_mode_exited",
            Self::QuestionsAsked { .. } => "questions_asked",
            Self::PermissionRequested { .. } => "permission_requested",
            Self::PlanPresented { .. } => "plan_presented",
            Self::SubagentSpawned { .. } => "subagent_spawned",
            Self::SubagentCompleted { .. } => "subagent_completed",
            Self::MachineInspected { .. } => "machine_inspected",
            Self::MachineTaskSucceeded { .. } => "machine_task_succeeded",
        }
    }
}

/// Outcome of a subagent run, as reported in `SubagentCompleted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_tag", rename_all = "snake_case")]
pub enum SubagentOutcome {
    /// The subagent finished normally.
    Success {
        /// Final transcript text returned to the calling tool.
        transcript: String,
    },
    /// The subagent failed (including timeout).
    Error {
        /// Human-readable failure reason.
        error: String,
    },
}

/// An event wrapped with its monotone id and publication metadata, as seen
/// by subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Strictly increasing id within `session_id`.
    pub id: SeqId,
    /// Session this event belongs to.
    pub session_id: SessionId,
    /// Branch this event belongs to, if scoped to one.
    pub branch_id: Option<BranchId>,
    /// The event itself.
    pub event: AgentEvent,
    /// When the envelope was published.
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_is_stable_for_wire_consumers() {
        let event = AgentEvent::StreamEnded {
            usage: Some(Usage {
                input_tokens: 1,
                output_tokens: 2,
            }),
            interrupted: false,
        };
        assert_eq!(event.event_type(), "stream_ended");
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = EventEnvelope {
            id: 1,
            session_id: SessionId::new(),
            branch_id: Some(BranchId::new()),
            event: AgentEvent::PlanModeEntered,
            published_at: Utc::now(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, envelope.id);
        assert_eq!(back.session_id, envelope.session_id);
    }

    #[test]
    fn tagged_union_uses_tag_field() {
        let event = AgentEvent::PlanModeEntered;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["_tag"], "PlanModeEntered");
    }
}
