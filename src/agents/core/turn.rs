//! One agent turn: model calls interleaved with automatic tool rounds

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agents::config::ChatConfig;
use crate::agents::domain::{
    ChunkSender, FinishReason, Message, ToolCall, ToolDefinition, ToolInvocation, PLUGIN_SEPARATOR,
};
use crate::agents::error::{AgentResult, ToolError};
use crate::agents::llm::{
    CompletionRequest, CompletionResponse, LlmProvider, ResponseBuilder, ToolChoice,
};
use crate::domain::ToolPort;

/// Sampling parameters sent with every model call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl From<&ChatConfig> for Sampling {
    fn from(config: &ChatConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

/// What one agent turn produced
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    /// Text of every round, in order
    pub text: String,
    /// Finish reason of the last model call
    pub finish_reason: FinishReason,
    /// Every tool call the model made, directives included
    pub invocations: Vec<ToolInvocation>,
    /// Calls to caller-handled functions, left unexecuted
    pub directives: Vec<ToolCall>,
    /// Provider content filter detail from the last model call
    pub content_filter: Option<Value>,
    /// Whether any text reached the chunk sender
    pub streamed: bool,
}

/// Runs model turns for one agent.
///
/// Plugin calls are executed and fed back to the model until it answers in
/// text, asks for a directive, or `max_tool_rounds` is spent. Directive
/// functions are offered to the model but handed back to the caller.
pub struct TurnRunner {
    llm: Arc<dyn LlmProvider>,
    plugins: Vec<Arc<dyn ToolPort>>,
    sampling: Sampling,
    max_tool_rounds: u32,
}

impl TurnRunner {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        plugins: Vec<Arc<dyn ToolPort>>,
        sampling: Sampling,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            llm,
            plugins,
            sampling,
            max_tool_rounds,
        }
    }

    /// Run a turn over `messages`, appending the tool traffic it generates.
    ///
    /// Text is forwarded to `sink` as it streams; with no sink the provider is
    /// called without streaming.
    pub async fn run(
        &self,
        agent: &str,
        messages: &mut Vec<Message>,
        directives: &[ToolDefinition],
        sink: Option<&ChunkSender>,
    ) -> AgentResult<TurnOutput> {
        let mut tools: Vec<ToolDefinition> =
            self.plugins.iter().flat_map(|p| p.definitions()).collect();
        tools.extend(directives.iter().cloned());
        let directive_names: HashSet<&str> = directives.iter().map(|d| d.name.as_str()).collect();

        let mut output = TurnOutput::default();
        let mut round = 0;

        loop {
            let request = self.request(messages.clone(), &tools);
            let response = match sink {
                Some(sink) if self.llm.supports_streaming() => {
                    self.stream_round(agent, request, sink, &mut output).await?
                }
                _ => {
                    let response = self.llm.complete(request).await?;
                    for call in response.tool_calls() {
                        record_call(agent, &call, &mut output);
                    }
                    response
                }
            };

            let text = response.text();
            output.text.push_str(&text);
            output.finish_reason = response.finish_reason;
            output.content_filter = response.content_filter.clone();

            let calls = response.tool_calls();
            if calls.is_empty() {
                return Ok(output);
            }

            messages.push(Message::assistant_with_tools(text, calls.clone()).with_name(agent));

            let (handed_back, plugin_calls): (Vec<ToolCall>, Vec<ToolCall>) = calls
                .into_iter()
                .partition(|c| directive_names.contains(c.name.as_str()));

            for call in &plugin_calls {
                let result = self.execute(call).await;
                messages.push(Message::tool_result(&call.id, result));
            }

            if !handed_back.is_empty() {
                for call in &handed_back {
                    messages.push(Message::tool_result(
                        &call.id,
                        json!({"status": "accepted"}).to_string(),
                    ));
                }
                output.directives = handed_back;
                return Ok(output);
            }

            round += 1;
            if round >= self.max_tool_rounds {
                warn!(agent, rounds = round, "Tool round limit reached, ending turn");
                return Ok(output);
            }
        }
    }

    fn request(&self, messages: Vec<Message>, tools: &[ToolDefinition]) -> CompletionRequest {
        CompletionRequest {
            messages,
            temperature: Some(self.sampling.temperature),
            top_p: Some(self.sampling.top_p),
            max_tokens: Some(self.sampling.max_tokens),
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            tool_choice: (!tools.is_empty()).then_some(ToolChoice::Auto),
            ..Default::default()
        }
    }

    /// Stream one model call, forwarding text and recording tool calls as
    /// each one completes
    async fn stream_round(
        &self,
        agent: &str,
        request: CompletionRequest,
        sink: &ChunkSender,
        output: &mut TurnOutput,
    ) -> AgentResult<CompletionResponse> {
        let mut stream = self.llm.complete_stream(request);
        let mut builder = ResponseBuilder::default();

        while let Some(result) = stream.next().await {
            let chunk = result?;
            if chunk.has_content() {
                sink.send_text(&chunk.content)?;
                output.streamed = true;
            }
            for call in builder.apply(&chunk) {
                record_call(agent, &call, output);
            }
        }
        for call in builder.take_pending() {
            record_call(agent, &call, output);
        }

        Ok(builder.finish())
    }

    /// Execute a plugin call; failures become an error payload for the model
    async fn execute(&self, call: &ToolCall) -> String {
        let plugin_name = call.name.split_once(PLUGIN_SEPARATOR).map(|(plugin, _)| plugin);
        let plugin = self
            .plugins
            .iter()
            .find(|p| Some(p.plugin_name()) == plugin_name);

        let result = match plugin {
            Some(plugin) => plugin.execute_tool(&call.name, &call.arguments).await,
            None => Err(ToolError::NotFound(call.name.clone())),
        };

        result.unwrap_or_else(|e| {
            warn!(tool_name = %call.name, error = %e, "Tool call failed");
            json!({ "error": e.to_string() }).to_string()
        })
    }
}

fn record_call(agent: &str, call: &ToolCall, output: &mut TurnOutput) {
    let invocation = ToolInvocation::from(call);
    let arguments = Value::Object(invocation.arguments.clone());
    info!(
        agent,
        tool_name = %invocation.tool_name,
        plugin_name = %invocation.plugin_name,
        arguments = %arguments,
        "Tool invoked"
    );
    output.invocations.push(invocation);
}
