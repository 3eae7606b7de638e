//! Task tool — delegates a bounded piece of work to a subagent.

use crate::{BuiltinTool, Concurrency, SubAgentRequest, ToolContext, ToolError, ToolResult};
use serde_json::Value;
use std::time::Duration;

/// Built-in tool for spawning a subagent to perform a delegated task.
pub struct TaskTool;

#[async_trait::async_trait]
impl BuiltinTool for TaskTool {
    fn name(&self) -> &'static str {
        "task"
    }

    fn description(&self) -> &'static str {
        "Delegates a bounded task to a subagent and waits for its result. Use for work that \
         benefits from a fresh context window — a focused investigation or a self-contained \
         change — rather than interleaving it with the current conversation."
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Parallel
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "description": "Agent definition the subagent should run as"
                },
                "prompt": {
                    "type": "string",
                    "description": "Detailed instructions for the subagent"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Optional timeout in milliseconds (falls back to runtime default)"
                }
            },
            "required": ["agent", "prompt"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let agent = args
            .get("agent")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("agent is required".into()))?
            .to_string();

        let prompt = args
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("prompt is required".into()))?
            .to_string();

        let timeout = args
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis);

        let spawner = ctx
            .subagent_spawner()
            .await
            .ok_or_else(|| ToolError::ExecutionFailed("no subagent spawner configured".into()))?;

        let result = spawner
            .spawn(SubAgentRequest {
                agent,
                prompt,
                timeout,
            })
            .await
            .map_err(ToolError::ExecutionFailed)?;

        if result.success {
            Ok(result.output)
        } else {
            Err(ToolError::ExecutionFailed(
                result.error.unwrap_or_else(|| "subagent failed".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SubAgentResult, SubAgentSpawner};
    use std::sync::Arc;

    struct StubSpawner {
        result: SubAgentResult,
    }

    #[async_trait::async_trait]
    impl SubAgentSpawner for StubSpawner {
        async fn spawn(&self, _request: SubAgentRequest) -> Result<SubAgentResult, String> {
            Ok(self.result.clone())
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_task_success() {
        let ctx = ctx();
        ctx.set_subagent_spawner(Some(Arc::new(StubSpawner {
            result: SubAgentResult {
                success: true,
                output: "done".to_string(),
                duration_ms: 10,
                tool_calls: 1,
                error: None,
            },
        })))
        .await;

        let result = TaskTool
            .execute(
                serde_json::json!({"agent": "explorer", "prompt": "look around"}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result, "done");
    }

    #[tokio::test]
    async fn test_task_failure() {
        let ctx = ctx();
        ctx.set_subagent_spawner(Some(Arc::new(StubSpawner {
            result: SubAgentResult {
                success: false,
                output: String::new(),
                duration_ms: 10,
                tool_calls: 0,
                error: Some("timed out".to_string()),
            },
        })))
        .await;

        let result = TaskTool
            .execute(
                serde_json::json!({"agent": "explorer", "prompt": "look around"}),
                &ctx,
            )
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_task_no_spawner_configured() {
        let result = TaskTool
            .execute(
                serde_json::json!({"agent": "explorer", "prompt": "look around"}),
                &ctx(),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_task_missing_args() {
        let result = TaskTool.execute(serde_json::json!({}), &ctx()).await;
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ToolError::InvalidArguments(_)
        ));
    }
}
