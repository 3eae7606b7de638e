//! Compaction (spec §4.D "Compaction"): keeps the per-turn prompt within a
//! token budget without touching the stored message history, unless the
//! caller explicitly ran `compactBranch`.
//!
//! Two escalating strategies, applied only to the working copy of messages
//! handed to the provider for this turn:
//!
//! 1. **Tool-output pruning** — replace `ToolResult` content older than the
//!    `prunProtect` window with a `{_pruned: true, summary}` marker,
//!    preserving the `ToolCall`/`ToolResult` id pairing.
//! 2. **Prefix summarization** — ask the provider (via `complete_simple`,
//!    not `stream`) to summarize the oldest untouched prefix into one
//!    synthetic assistant message.

use conductor_llm::{LlmProvider, LlmResult, Message, MessageContent};

use crate::config::estimate_tokens;

/// Estimate the token cost of a full provider-facing message list.
#[must_use]
pub fn estimate_message_tokens(messages: &[Message]) -> usize {
    messages.iter().map(message_tokens).sum()
}

fn message_tokens(message: &Message) -> usize {
    match &message.content {
        MessageContent::Text(text) => estimate_tokens(text),
        MessageContent::ToolCalls(calls) => calls
            .iter()
            .map(|c| estimate_tokens(&c.name) + estimate_tokens(&c.arguments.to_string()))
            .sum(),
        MessageContent::ToolResult(result) => estimate_tokens(&result.content),
        MessageContent::MultiPart(parts) => parts
            .iter()
            .map(|p| match p {
                conductor_llm::ContentPart::Text { text } => estimate_tokens(text),
                conductor_llm::ContentPart::Image { .. } => 0,
            })
            .sum(),
    }
}

/// Replace `ToolResult` content in messages outside the trailing
/// `prune_protect_tokens` window with a pruned marker. Walks from the end
/// backward so the most recent tool results are always protected.
///
/// Returns the number of estimated tokens freed.
pub fn prune_tool_outputs(messages: &mut [Message], prune_protect_tokens: usize) -> usize {
    let mut protected_so_far = 0usize;
    let mut freed = 0usize;

    for message in messages.iter_mut().rev() {
        let tokens = message_tokens(message);
        if protected_so_far < prune_protect_tokens {
            protected_so_far = protected_so_far.saturating_add(tokens);
            continue;
        }
        if let MessageContent::ToolResult(result) = &mut message.content {
            if is_pruned(&result.content) {
                continue;
            }
            let original_len = result.content.len();
            let marker = serde_json::json!({
                "_pruned": true,
                "summary": format!("{original_len} chars elided"),
            })
            .to_string();
            freed = freed.saturating_add(tokens.saturating_sub(estimate_tokens(&marker)));
            result.content = marker;
        }
    }

    freed
}

fn is_pruned(content: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| v.get("_pruned").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

/// Summarize the oldest `messages.len() - keep_recent` messages into one
/// synthetic assistant message, using a non-streaming `generate` call.
///
/// # Errors
///
/// Returns the provider error if summarization fails; the caller should
/// proceed with the unsummarized (but pruned) history rather than fail the
/// turn outright.
pub async fn summarize_prefix(
    provider: &dyn LlmProvider,
    messages: &mut Vec<Message>,
    keep_recent: usize,
) -> LlmResult<()> {
    if messages.len() <= keep_recent {
        return Ok(());
    }

    let split_at = messages.len() - keep_recent;
    let prefix = &messages[..split_at];
    let transcript: String = prefix
        .iter()
        .filter_map(|m| match &m.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::ToolResult(result) => Some(result.content.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Summarize the following conversation prefix concisely, preserving any \
         decisions, file paths, and open questions a continuation would need:\n\n{transcript}"
    );
    let summary = provider.complete_simple(&prompt).await?;

    let mut rest = messages.split_off(split_at);
    messages.clear();
    messages.push(Message::assistant(summary));
    messages.append(&mut rest);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_llm::{Message, ToolCallResult};

    #[test]
    fn pruning_protects_recent_window_leaves_old_ones_alone() {
        let long_output = "x".repeat(4000);
        let mut messages = vec![
            Message::tool_result(ToolCallResult::success("1", long_output.clone())),
            Message::tool_result(ToolCallResult::success("2", long_output.clone())),
        ];

        // Protect window of 0 tokens: everything outside the last message is prunable.
        prune_tool_outputs(&mut messages, 0);

        let MessageContent::ToolResult(first) = &messages[0].content else {
            panic!()
        };
        assert!(is_pruned(&first.content));
    }

    #[test]
    fn pruning_is_idempotent() {
        let mut messages = vec![Message::tool_result(ToolCallResult::success(
            "1",
            "x".repeat(1000),
        ))];
        prune_tool_outputs(&mut messages, 0);
        let freed_twice = prune_tool_outputs(&mut messages, 0);
        assert_eq!(freed_twice, 0);
    }

    #[test]
    fn estimator_sums_across_messages() {
        let messages = vec![Message::user("hello"), Message::assistant("world")];
        assert!(estimate_message_tokens(&messages) > 0);
    }
}
