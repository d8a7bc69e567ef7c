//! LLM Provider trait — the relevance oracle treated as an abstract
//! capability (`{prompt, schema} -> JSON`). The traversal engine depends
//! only on this trait, never on a concrete provider, so the oracle can be
//! swapped or stubbed without touching traversal logic.

use crate::types::{AccumulatedToolCall, ContentBlock, LlmRequest, StreamDelta, Usage};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("context overflow: {0}")]
    ContextOverflow(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("timed out")]
    TimedOut,

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// A fully-collected completion — the accumulated form of a `LlmStream`,
/// used by callers (the oracle client, the recommendation synthesiser) that
/// need the whole response before they can act on it.
#[derive(Clone, Debug, Default)]
pub struct LlmCompletion {
    pub text: String,
    pub tool_calls: Vec<AccumulatedToolCall>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl LlmCompletion {
    /// The parsed JSON input of the first tool call, if the model made one.
    /// This is what a schema-constrained oracle call reads back.
    pub fn first_tool_input(&self) -> Option<serde_json::Value> {
        self.tool_calls.first().and_then(|tc| tc.parse_arguments().ok())
    }
}

/// LLM Provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn models(&self) -> &[&str];

    fn supports_model(&self, model: &str) -> bool {
        self.models()
            .iter()
            .any(|m| *m == model || model.starts_with(m))
    }

    /// Stream a completion response. If `cancel` is provided and triggered,
    /// the underlying HTTP connection is dropped and the stream yields `LlmError::Cancelled`.
    async fn complete_stream(
        &self,
        request: LlmRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<LlmStream>;

    /// Drive `complete_stream` to completion and return the accumulated result.
    /// Default implementation built on the streaming primitive — providers
    /// never need to implement this themselves.
    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmCompletion> {
        let stream = self.complete_stream(request, None).await?;
        tokio::pin!(stream);

        let mut out = LlmCompletion::default();
        let mut current: Option<AccumulatedToolCall> = None;

        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Text(t) => out.text.push_str(&t),
                StreamDelta::Thinking(_) => {}
                StreamDelta::ToolCallStart { id, name } => {
                    current = Some(AccumulatedToolCall {
                        id,
                        name,
                        arguments: String::new(),
                    });
                }
                StreamDelta::ToolCallDelta { arguments, .. } => {
                    if let Some(tc) = current.as_mut() {
                        tc.arguments.push_str(&arguments);
                    }
                }
                StreamDelta::ToolCallEnd { .. } => {
                    if let Some(tc) = current.take() {
                        out.tool_calls.push(tc);
                    }
                }
                StreamDelta::Done { stop_reason, usage } => {
                    out.stop_reason = stop_reason;
                    out.usage = usage;
                }
                StreamDelta::Error(e) => return Err(LlmError::StreamError(e)),
            }
        }

        Ok(out)
    }
}

/// Render an accumulated tool call's arguments as a content block, for
/// appending the assistant's turn back onto a conversation.
pub fn tool_call_to_block(tc: &AccumulatedToolCall) -> ContentBlock {
    ContentBlock::ToolUse {
        id: tc.id.clone(),
        name: tc.name.clone(),
        input: tc.parse_arguments().unwrap_or_default(),
    }
}
