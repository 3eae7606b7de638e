//! `compactBranch`, `steer`, and `respond*` RPC method implementations.

use conductor_core::BadArgument;
use conductor_permission::PermissionVerdict;
use conductor_runtime::{AgentKind, PlanDecision, SteerCommand};
use conductor_telemetry::{RequestContext, RequestGuard};

use super::KernelState;
use crate::error::{KernelError, KernelResult};
use crate::rpc::{
    PermissionDecisionWire, RespondPermissionParams, RespondPlanParams, RespondQuestionsParams, SessionBranchParams,
    SteerCommandWire, SteerParams,
};

fn parse_mode(mode: &str) -> KernelResult<AgentKind> {
    match mode {
        "build" => Ok(AgentKind::Build),
        "plan" => Ok(AgentKind::Plan),
        other => Err(KernelError::from(
            BadArgument::new("kernel", "steer").with_description(format!("unknown mode: {other}")),
        )),
    }
}

impl TryFrom<SteerCommandWire> for SteerCommand {
    type Error = KernelError;

    fn try_from(command: SteerCommandWire) -> Result<Self, Self::Error> {
        Ok(match command {
            SteerCommandWire::Cancel => Self::Cancel,
            SteerCommandWire::Interrupt => Self::Interrupt,
            SteerCommandWire::Interject { message } => Self::Interject { message },
            SteerCommandWire::SwitchAgent { agent } => Self::SwitchAgent { agent },
            SteerCommandWire::SwitchModel { model } => Self::SwitchModel { model },
            SteerCommandWire::SwitchMode { mode } => Self::SwitchMode { mode: parse_mode(&mode)? },
        })
    }
}

impl From<PermissionDecisionWire> for PermissionVerdict {
    fn from(decision: PermissionDecisionWire) -> Self {
        match decision {
            PermissionDecisionWire::Allow => Self::Allow,
            PermissionDecisionWire::Deny { reason } => Self::Deny { reason },
        }
    }
}

impl KernelState {
    pub(super) async fn compact_branch_impl(&self, params: SessionBranchParams) -> KernelResult<()> {
        let _guard = RequestGuard::new(
            RequestContext::new("kernel")
                .with_session_id(params.session_id)
                .with_branch_id(params.branch_id)
                .with_operation("compactBranch"),
        );
        self.agent_loop
            .compact(params.session_id, params.branch_id, &self.default_agent)
            .await?;
        Ok(())
    }

    pub(super) async fn steer_impl(&self, params: SteerParams) -> KernelResult<()> {
        let command = SteerCommand::try_from(params.command)?;
        self.agent_loop.steer(params.session_id, params.branch_id, command).await?;
        Ok(())
    }

    pub(super) fn respond_questions_impl(&self, params: RespondQuestionsParams) -> KernelResult<()> {
        self.agent_loop.respond_questions(params.request_id, params.answers)?;
        Ok(())
    }

    pub(super) fn respond_permission_impl(&self, params: RespondPermissionParams) -> KernelResult<()> {
        self.agent_loop
            .respond_permission(params.request_id, params.decision.into())?;
        Ok(())
    }

    pub(super) fn respond_plan_impl(&self, params: RespondPlanParams) -> KernelResult<()> {
        let decision = match params.decision.as_str() {
            "confirm" => PlanDecision::Confirm,
            "reject" => PlanDecision::Reject { reason: params.reason },
            other => {
                return Err(KernelError::from(
                    BadArgument::new("kernel", "respondPlan").with_description(format!("unknown decision: {other}")),
                ));
            }
        };
        self.agent_loop.respond_plan(params.request_id, decision)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_state;
    use super::*;
    use conductor_core::RequestId;

    #[test]
    fn unknown_mode_is_a_bad_argument() {
        let err = parse_mode("turbo").unwrap_err();
        assert_eq!(err.error_code(), crate::error::error_codes::BAD_ARGUMENT);
    }

    #[tokio::test]
    async fn respond_questions_on_untracked_request_id_errors() {
        let (state, _harness) = test_state().await;
        let err = state
            .respond_questions_impl(RespondQuestionsParams { request_id: RequestId::new(), answers: vec![] })
            .unwrap_err();
        assert_eq!(err.error_code(), crate::error::error_codes::UNKNOWN_REQUEST);
    }

    #[tokio::test]
    async fn respond_plan_rejects_unknown_decision_string() {
        let (state, _harness) = test_state().await;
        let err = state
            .respond_plan_impl(RespondPlanParams { request_id: RequestId::new(), decision: "maybe".into(), reason: None })
            .unwrap_err();
        assert_eq!(err.error_code(), crate::error::error_codes::BAD_ARGUMENT);
    }

    #[tokio::test]
    async fn compact_branch_on_a_session_with_no_turns_succeeds() {
        let (state, harness) = test_state().await;
        let (session_id, branch_id) = harness.ids();
        state.compact_branch_impl(SessionBranchParams { session_id, branch_id }).await.unwrap();
    }
}
