//! Streaming types for LLM responses

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::{CompletionResponse, TokenUsage};
use crate::agents::domain::{ContentPart, FinishReason, ToolCall};
use crate::agents::error::LlmError;

/// A chunk of streamed LLM response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Delta content (text being generated)
    #[serde(default)]
    pub content: String,
    /// Tool calls being made (partial or complete)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
    /// Finish reason (if this is the final chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage (usually only in final chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Provider content filter annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<Value>,
}

impl StreamChunk {
    /// Create a text content chunk
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a tool call chunk
    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            tool_calls: vec![delta],
            ..Default::default()
        }
    }

    /// Check if this chunk has content
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Delta update for a tool call (streaming tool calls)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Index of the tool call being updated
    pub index: usize,
    /// Tool call ID (may be partial)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name (may be partial)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments JSON string (partial, accumulated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// Create a new tool call delta
    pub fn new(index: usize) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, args: impl Into<String>) -> Self {
        self.arguments = Some(args.into());
        self
    }
}

/// Accumulator for building tool calls from streaming deltas.
///
/// A call is complete once a delta for a later index arrives, or when the
/// round finishes.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    tool_calls: Vec<ToolCallBuilder>,
    reported: usize,
}

#[derive(Debug, Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a delta update
    pub fn apply_delta(&mut self, delta: &ToolCallDelta) {
        while self.tool_calls.len() <= delta.index {
            self.tool_calls.push(ToolCallBuilder::default());
        }

        let builder = &mut self.tool_calls[delta.index];

        if let Some(id) = &delta.id {
            builder.id.push_str(id);
        }
        if let Some(name) = &delta.name {
            builder.name.push_str(name);
        }
        if let Some(args) = &delta.arguments {
            builder.arguments.push_str(args);
        }
    }

    /// Calls completed since the last report; `finished` completes them all.
    ///
    /// Ids are fixed here, so [`ToolCallAccumulator::build`] returns the same
    /// calls.
    pub fn take_completed(&mut self, finished: bool) -> Vec<ToolCall> {
        let upto = if finished {
            self.tool_calls.len()
        } else {
            self.tool_calls.len().saturating_sub(1)
        };
        if upto <= self.reported {
            return Vec::new();
        }

        let completed = self.tool_calls[self.reported..upto]
            .iter_mut()
            .filter(|b| !b.name.is_empty())
            .map(|b| {
                b.ensure_id();
                b.to_call()
            })
            .collect();
        self.reported = upto;
        completed
    }

    /// Build the final tool calls.
    ///
    /// Calls without a name are dropped; a missing id is generated so tool
    /// results can still be matched to their call.
    pub fn build(mut self) -> Vec<ToolCall> {
        self.tool_calls
            .iter_mut()
            .filter(|b| !b.name.is_empty())
            .map(|b| {
                b.ensure_id();
                b.to_call()
            })
            .collect()
    }
}

impl ToolCallBuilder {
    fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = ToolCall::generate_id();
        }
    }

    fn to_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: parse_arguments(&self.arguments),
        }
    }
}

/// Decode a tool call's JSON argument string, treating garbage as no arguments
pub(crate) fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed tool call arguments");
        Value::Object(Default::default())
    })
}

/// Streaming response from an LLM provider
pub struct LlmStream {
    receiver: mpsc::Receiver<Result<StreamChunk, LlmError>>,
}

impl LlmStream {
    /// Create a channel pair for building an LLM stream
    pub fn channel(buffer: usize) -> (LlmStreamSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (LlmStreamSender { sender: tx }, Self { receiver: rx })
    }

}

impl Stream for LlmStream {
    type Item = Result<StreamChunk, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Folds stream chunks into the response a non-streaming call would return.
///
/// The last finish reason seen wins.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    content: String,
    tools: ToolCallAccumulator,
    finish_reason: Option<FinishReason>,
    usage: Option<TokenUsage>,
    content_filter: Option<Value>,
}

impl ResponseBuilder {
    /// Fold `chunk` in, returning the tool calls it completed
    pub fn apply(&mut self, chunk: &StreamChunk) -> Vec<ToolCall> {
        self.content.push_str(&chunk.content);
        for delta in &chunk.tool_calls {
            self.tools.apply_delta(delta);
        }
        if let Some(reason) = chunk.finish_reason {
            self.finish_reason = Some(reason);
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage.clone();
        }
        if chunk.content_filter.is_some() {
            self.content_filter = chunk.content_filter.clone();
        }
        self.tools.take_completed(chunk.finish_reason.is_some())
    }

    /// Tool calls still open when the stream ended without a finish reason
    pub fn take_pending(&mut self) -> Vec<ToolCall> {
        self.tools.take_completed(true)
    }

    pub fn finish(self) -> CompletionResponse {
        let mut parts = Vec::new();
        if !self.content.is_empty() {
            parts.push(ContentPart::text(self.content));
        }
        parts.extend(self.tools.build().into_iter().map(ContentPart::ToolCall));

        CompletionResponse {
            parts,
            finish_reason: self.finish_reason.unwrap_or_default(),
            usage: self.usage,
            content_filter: self.content_filter,
        }
    }
}

/// Sender half for building an LLM stream
#[derive(Clone)]
pub struct LlmStreamSender {
    sender: mpsc::Sender<Result<StreamChunk, LlmError>>,
}

type SendResult = Result<(), mpsc::error::SendError<Result<StreamChunk, LlmError>>>;

impl LlmStreamSender {
    /// Send a chunk
    pub async fn send(&self, chunk: StreamChunk) -> SendResult {
        self.sender.send(Ok(chunk)).await
    }

    /// Send an error
    pub async fn send_error(&self, error: LlmError) -> SendResult {
        self.sender.send(Err(error)).await
    }

    /// Send text content
    pub async fn send_text(&self, text: impl Into<String>) -> SendResult {
        self.send(StreamChunk::text(text)).await
    }

}
