//! List directory tool — lists immediate directory entries.

use std::fmt::Write;

use crate::{BuiltinTool, ToolContext, ToolError, ToolResult};
use serde_json::Value;
use std::path::PathBuf;

/// Built-in tool for listing a directory's immediate entries.
pub struct ListDirectoryTool;

#[async_trait::async_trait]
impl BuiltinTool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "Lists the immediate entries of a directory (non-recursive). \
         Directories are suffixed with \"/\"."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (defaults to workspace root)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let dir = args
            .get("path")
            .and_then(Value::as_str)
            .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

        if !dir.exists() {
            return Err(ToolError::PathNotFound(dir.display().to_string()));
        }

        if !dir.is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        let mut entries: Vec<(String, bool)> = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            entries.push((name, is_dir));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if entries.is_empty() {
            return Ok("(empty directory)".to_string());
        }

        let mut output = String::new();
        for (name, is_dir) in &entries {
            if *is_dir {
                let _ = writeln!(output, "{name}/");
            } else {
                let _ = writeln!(output, "{name}");
            }
        }

        Ok(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_with_root(root: &std::path::Path) -> ToolContext {
        ToolContext::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn test_list_directory_basic() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = ListDirectoryTool
            .execute(serde_json::json!({}), &ctx)
            .await
            .unwrap();

        assert!(result.contains("a.rs"));
        assert!(result.contains("sub/"));
    }

    #[tokio::test]
    async fn test_list_directory_not_found() {
        let ctx = ctx_with_root(&std::env::temp_dir());
        let result = ListDirectoryTool
            .execute(
                serde_json::json!({"path": "/tmp/conductor_nonexistent_dir_12345"}),
                &ctx,
            )
            .await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ToolError::PathNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_directory_empty() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with_root(dir.path());
        let result = ListDirectoryTool
            .execute(serde_json::json!({}), &ctx)
            .await
            .unwrap();

        assert_eq!(result, "(empty directory)");
    }

    #[tokio::test]
    async fn test_list_directory_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, "hi").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = ListDirectoryTool
            .execute(
                serde_json::json!({"path": file_path.to_str().unwrap()}),
                &ctx,
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_directory_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("z.rs"), "").unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = ListDirectoryTool
            .execute(serde_json::json!({}), &ctx)
            .await
            .unwrap();

        let a_pos = result.find("a.rs").unwrap();
        let z_pos = result.find("z.rs").unwrap();
        assert!(a_pos < z_pos);
    }
}
