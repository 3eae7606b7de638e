//! Grep tool — searches file contents for a regex pattern.

use std::fmt::Write;

use crate::{truncate_at_char_boundary, BuiltinTool, ToolContext, ToolError, ToolResult};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Maximum length of a single reported line before truncation.
const MAX_LINE_LENGTH: usize = 500;
/// Maximum number of matching lines returned.
const MAX_MATCHES: usize = 200;

/// Built-in tool for searching file contents by regex.
pub struct GrepTool;

#[async_trait::async_trait]
impl BuiltinTool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Searches file contents for a regex pattern. Returns matching lines prefixed with \
         \"file:line:\". Optionally restrict the search to files matching a glob."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regex pattern to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in (defaults to workspace root)"
                },
                "glob": {
                    "type": "string",
                    "description": "Restrict search to files matching this glob (e.g. \"*.rs\")"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let pattern = args
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("pattern is required".into()))?;

        let search_dir = args
            .get("path")
            .and_then(Value::as_str)
            .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

        if !search_dir.exists() {
            return Err(ToolError::PathNotFound(search_dir.display().to_string()));
        }

        let glob_filter = args
            .get("glob")
            .and_then(Value::as_str)
            .map(|g| {
                globset::GlobBuilder::new(g)
                    .literal_separator(false)
                    .build()
                    .map(|g| g.compile_matcher())
                    .map_err(|e| ToolError::InvalidArguments(format!("Invalid glob pattern: {e}")))
            })
            .transpose()?;

        let re = Regex::new(pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid regex pattern: {e}")))?;

        let search_dir = search_dir.canonicalize()?;

        let mut matches = Vec::new();
        let mut truncated = false;

        'walk: for entry in WalkDir::new(&search_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
            })
        {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_dir() {
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&search_dir)
                .unwrap_or(entry.path());

            if let Some(glob) = &glob_filter {
                if !glob.is_match(rel_path) {
                    continue;
                }
            }

            let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                continue;
            };

            for (idx, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    if matches.len() >= MAX_MATCHES {
                        truncated = true;
                        break 'walk;
                    }
                    let line_num = idx.saturating_add(1);
                    let display_line = truncate_at_char_boundary(line, MAX_LINE_LENGTH);
                    matches.push(format!(
                        "{}:{line_num}:{display_line}",
                        entry.path().display()
                    ));
                }
            }
        }

        if matches.is_empty() {
            return Ok(format!("No matches for \"{pattern}\""));
        }

        let mut output = matches.join("\n");
        let _ = write!(output, "\n\n({} matches", matches.len());
        if truncated {
            let _ = write!(output, ", truncated at {MAX_MATCHES}");
        }
        output.push(')');

        Ok(output)
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
    async fn test_grep_basic() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nfn helper() {}").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "fn \\w+"}), &ctx)
            .await
            .unwrap();

        assert!(result.contains("a.rs:1:"));
        assert!(result.contains("a.rs:2:"));
        assert!(result.contains("2 matches"));
    }

    #[tokio::test]
    async fn test_grep_no_matches() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "hello world").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "nonexistent"}), &ctx)
            .await
            .unwrap();

        assert!(result.contains("No matches"));
    }

    #[tokio::test]
    async fn test_grep_glob_filter() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "needle").unwrap();
        std::fs::write(dir.path().join("b.txt"), "needle").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool
            .execute(
                serde_json::json!({"pattern": "needle", "glob": "*.rs"}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(result.contains("a.rs"));
        assert!(!result.contains("b.txt"));
    }

    #[tokio::test]
    async fn test_grep_invalid_regex() {
        let ctx = ctx_with_root(&std::env::temp_dir());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "[invalid"}), &ctx)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_grep_truncates_long_line() {
        let dir = TempDir::new().unwrap();
        let long_line = "x".repeat(1000) + "needle";
        std::fs::write(dir.path().join("a.txt"), &long_line).unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "needle"}), &ctx)
            .await
            .unwrap();

        // Match line is truncated, so the literal "needle" suffix is cut off.
        assert!(!result.contains("needle"));
        assert!(result.contains("1 matches"));
    }
}
