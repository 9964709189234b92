//! Deterministic collaborators for engine tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::agents::domain::{ContentPart, FinishReason, ToolCall, ToolDefinition};
use crate::agents::error::{LlmError, LlmResult, ToolError, ToolResult};
use crate::agents::llm::{
    CompletionRequest, CompletionResponse, LlmProvider, LlmStream, StreamChunk, ToolCallDelta,
};
use crate::domain::ToolPort;

/// One scripted model turn
#[derive(Debug, Clone, Default)]
pub struct ScriptedTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub content_filter: Option<Value>,
    pub error: Option<String>,
}

impl ScriptedTurn {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn call(name: &str, arguments: Value) -> Self {
        Self::default().with_call(name, arguments)
    }

    pub fn content_filter() -> Self {
        Self {
            finish_reason: FinishReason::ContentFilter,
            content_filter: Some(serde_json::json!({"hate": {"filtered": true, "severity": "high"}})),
            ..Default::default()
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_call(mut self, name: &str, arguments: Value) -> Self {
        let id = format!("call_{}", self.tool_calls.len());
        self.tool_calls.push(ToolCall::new(id, name, arguments));
        self.finish_reason = FinishReason::ToolCalls;
        self
    }

    fn response(&self) -> CompletionResponse {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(ContentPart::text(&self.text));
        }
        parts.extend(self.tool_calls.iter().cloned().map(ContentPart::ToolCall));
        CompletionResponse {
            parts,
            finish_reason: self.finish_reason,
            usage: None,
            content_filter: self.content_filter.clone(),
        }
    }
}

/// Provider replaying a queue of turns, shared by every agent that uses it
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<CompletionRequest>>,
    streaming: bool,
    chunk_delay: Option<Duration>,
    emitted: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            streaming: true,
            chunk_delay: None,
            emitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Behave like a model without native streaming
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Pause before every streamed text chunk
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Text chunks written to streams so far
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_turn(&self, request: CompletionRequest) -> LlmResult<ScriptedTurn> {
        self.requests.lock().unwrap().push(request);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidRequest("script exhausted".to_string()))?;
        match &turn.error {
            Some(message) => Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(turn),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.next_turn(request).map(|turn| turn.response())
    }

    fn complete_stream(&self, request: CompletionRequest) -> LlmStream {
        let (sender, stream) = LlmStream::channel(64);
        let turn = self.next_turn(request);
        let delay = self.chunk_delay;
        let emitted = self.emitted.clone();

        tokio::spawn(async move {
            let turn = match turn {
                Ok(turn) => turn,
                Err(e) => {
                    let _ = sender.send_error(e).await;
                    return;
                }
            };

            for word in turn.text.split_inclusive(' ') {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if sender.send_text(word).await.is_err() {
                    return;
                }
                emitted.fetch_add(1, Ordering::SeqCst);
            }

            for (index, call) in turn.tool_calls.iter().enumerate() {
                let delta = ToolCallDelta::new(index)
                    .with_id(&call.id)
                    .with_name(&call.name)
                    .with_arguments(call.arguments.to_string());
                let _ = sender.send(StreamChunk::tool_call(delta)).await;
            }

            let finish = StreamChunk {
                finish_reason: Some(turn.finish_reason),
                content_filter: turn.content_filter,
                ..Default::default()
            };
            let _ = sender.send(finish).await;
        });

        stream
    }
}

/// Tool plugin with a canned outcome
pub struct StubTool {
    plugin: String,
    function: String,
    outcome: Result<String, String>,
    calls: AtomicUsize,
}

impl StubTool {
    pub fn ok(plugin: &str, function: &str, result: &str) -> Self {
        Self {
            plugin: plugin.to_string(),
            function: function.to_string(),
            outcome: Ok(result.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails the way a timed out weather lookup does
    pub fn timing_out(plugin: &str, function: &str) -> Self {
        Self {
            outcome: Err("timeout".to_string()),
            ..Self::ok(plugin, function, "")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolPort for StubTool {
    fn plugin_name(&self) -> &str {
        &self.plugin
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            crate::agents::domain::qualified_name(&self.plugin, &self.function),
            "stub",
            serde_json::json!({"type": "object", "properties": {}}),
        )]
    }

    async fn execute_tool(&self, _name: &str, _args: &Value) -> ToolResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err(_) => Err(ToolError::Timeout(10)),
        }
    }
}
