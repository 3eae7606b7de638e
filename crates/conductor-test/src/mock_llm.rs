//! A scriptable [`LlmProvider`] for exercising the turn loop, retry policy,
//! and compaction summarizer without a real vendor backend.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use conductor_llm::error::{LlmError, LlmResult};
use conductor_llm::provider::{LlmProvider, StreamBox};
use conductor_llm::types::{LlmResponse, LlmToolDefinition, Message, StopReason, StreamEvent, Usage};
use futures::stream;

/// One scripted outcome for a single `stream()` call: either a provider-level
/// failure (exercising the retry policy) or a sequence of events to replay.
pub type StreamScript = LlmResult<Vec<StreamEvent>>;

/// A provider whose `stream`/`complete` calls are driven entirely by queued
/// scripts, popped in order as the caller invokes them. Each queue is
/// independent since the turn loop only ever calls `stream`, while
/// compaction's summarizer only ever calls `complete`/`complete_simple`.
pub struct MockLlmProvider {
    name: String,
    model: String,
    max_context_tokens: usize,
    stream_scripts: Mutex<VecDeque<StreamScript>>,
    stream_delays: Mutex<VecDeque<Duration>>,
    complete_scripts: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    stream_calls: AtomicUsize,
    complete_calls: AtomicUsize,
}

impl MockLlmProvider {
    /// A provider named `model` with no scripted calls queued yet.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            model: model.into(),
            max_context_tokens: 200_000,
            stream_scripts: Mutex::new(VecDeque::new()),
            stream_delays: Mutex::new(VecDeque::new()),
            complete_scripts: Mutex::new(VecDeque::new()),
            stream_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a `stream()` outcome.
    ///
    /// Takes `&self` rather than consuming builder-style, so callers can
    /// script a provider that's already shared behind an `Arc` (as
    /// `RuntimeHarness` hands it out) without needing sole ownership.
    pub fn with_stream(&self, script: StreamScript) {
        self.stream_scripts.lock().unwrap().push_back(script);
        self.stream_delays.lock().unwrap().push_back(Duration::ZERO);
    }

    /// Queue a successful `stream()` outcome that doesn't resolve until
    /// `delay` has elapsed, for exercising timeout/cancellation paths.
    pub fn with_slow_text_reply(&self, delay: Duration, text: impl Into<String>, usage: Usage) {
        self.with_text_reply(text, usage);
        if let Some(last) = self.stream_delays.lock().unwrap().back_mut() {
            *last = delay;
        }
    }

    /// Queue a successful `stream()` outcome producing `text` followed by a
    /// natural end-of-turn with the given usage.
    pub fn with_text_reply(&self, text: impl Into<String>, usage: Usage) {
        self.with_stream(Ok(vec![
            StreamEvent::TextDelta(text.into()),
            StreamEvent::Finish {
                reason: StopReason::EndTurn,
                usage: Some(usage),
            },
        ]));
    }

    /// Queue a `RateLimitExceeded` failure, as the retry policy would see on
    /// a throttled attempt.
    pub fn with_rate_limit(&self, retry_after_secs: u64) {
        self.with_stream(Err(LlmError::RateLimitExceeded { retry_after_secs }));
    }

    /// Queue a tool-call turn: the model requests `tool_name` with `arguments`
    /// and stops with `ToolUse`.
    pub fn with_tool_call(&self, call_id: impl Into<String>, tool_name: impl Into<String>, arguments: serde_json::Value) {
        let call_id = call_id.into();
        self.with_stream(Ok(vec![
            StreamEvent::ToolCallStart { id: call_id.clone(), name: tool_name.into() },
            StreamEvent::ToolCallDelta { id: call_id.clone(), args_delta: arguments.to_string() },
            StreamEvent::ToolCallEnd { id: call_id },
            StreamEvent::Finish { reason: StopReason::ToolUse, usage: None },
        ]));
    }

    /// Queue a `complete()`/`complete_simple()` outcome (used by the
    /// compaction summarizer).
    pub fn with_completion(&self, text: impl Into<String>) {
        self.complete_scripts.lock().unwrap().push_back(Ok(LlmResponse {
            message: Message::assistant(text),
            has_tool_calls: false,
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }));
    }

    /// Number of `stream()` calls made so far.
    #[must_use]
    pub fn stream_call_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// Number of `complete()`/`complete_simple()` calls made so far.
    #[must_use]
    pub fn complete_call_count(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, _messages: &[Message], _tools: &[LlmToolDefinition], _system: &str) -> LlmResult<StreamBox> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.stream_delays.lock().unwrap().pop_front().unwrap_or_default();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        let script = self
            .stream_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::StreamingError("no scripted call queued".to_string())));
        let events = script?;
        let boxed: Pin<Box<dyn futures::Stream<Item = LlmResult<StreamEvent>> + Send>> =
            Box::pin(stream::iter(events.into_iter().map(Ok)));
        Ok(boxed)
    }

    async fn complete(&self, _messages: &[Message], _tools: &[LlmToolDefinition], _system: &str) -> LlmResult<LlmResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.complete_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::StreamingError("no scripted completion queued".to_string())))
    }

    fn max_context_length(&self) -> usize {
        self.max_context_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn queued_stream_replays_in_order() {
        let provider = MockLlmProvider::new("mock-model");
        provider.with_text_reply("hi", Usage::default());
        let mut events = provider.stream(&[], &[], "").await.unwrap();
        let first = events.next().await.unwrap().unwrap();
        assert!(matches!(first, StreamEvent::TextDelta(text) if text == "hi"));
    }

    #[tokio::test]
    async fn rate_limit_then_success_scripts_two_calls() {
        let provider = MockLlmProvider::new("mock-model");
        provider.with_rate_limit(1);
        provider.with_text_reply("recovered", Usage::default());

        let first = provider.stream(&[], &[], "").await;
        assert!(first.is_err());

        let second = provider.stream(&[], &[], "").await;
        assert!(second.is_ok());
        assert_eq!(provider.stream_call_count(), 2);
    }

    #[tokio::test]
    async fn slow_reply_delays_before_resolving() {
        let provider = MockLlmProvider::new("mock-model");
        provider.with_slow_text_reply(Duration::from_millis(20), "slow", Usage::default());
        let start = std::time::Instant::now();
        let result = provider.stream(&[], &[], "").await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn empty_queue_errors_instead_of_panicking() {
        let provider = MockLlmProvider::new("mock-model");
        let result = provider.stream(&[], &[], "").await;
        assert!(result.is_err());
    }
}
