//! OpenAI-compatible chat completions codec with streaming support

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::{
    Authenticator, CompletionRequest, CompletionResponse, LlmProvider, LlmStream, LlmStreamSender,
    StreamChunk, TokenUsage, ToolCallDelta, ToolChoice,
};
use crate::agents::config::LlmProviderConfig;
use crate::agents::domain::{ContentPart, FinishReason, Message, Role, ToolCall};
use crate::agents::error::{LlmError, LlmResult};
use crate::agents::llm::stream::parse_arguments;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions provider.
///
/// Also used by the Azure flavor, which only differs in URL and auth header.
pub struct OpenAiProvider {
    client: reqwest::Client,
    auth: Arc<dyn Authenticator>,
    url: String,
    model: String,
    name: &'static str,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &LlmProviderConfig, auth: Arc<dyn Authenticator>) -> LlmResult<Self> {
        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim_end_matches('/')
        };

        Self::with_url(
            "openai",
            format!("{}/chat/completions", base_url),
            config,
            auth,
        )
    }

    /// Create a provider posting to a fully built chat completions URL
    pub(crate) fn with_url(
        name: &'static str,
        url: String,
        config: &LlmProviderConfig,
        auth: Arc<dyn Authenticator>,
    ) -> LlmResult<Self> {
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest("Model name must be set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth,
            url,
            model: config.model.clone(),
            name,
        })
    }

    /// URL requests are posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_ref().unwrap_or(&self.model),
            "messages": convert_messages(&request.messages),
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(tools) = &request.tools {
            if !tools.is_empty() {
                body["tools"] = json!(tools.iter().map(|t| {
                    // OpenAI requires at minimum {"type": "object"} for function parameters
                    let params = if t.parameters.as_object().map_or(true, |o| o.is_empty()) {
                        json!({
                            "type": "object",
                            "properties": {},
                            "required": []
                        })
                    } else if t.parameters.get("type").is_none() {
                        let mut p = t.parameters.clone();
                        if let Some(obj) = p.as_object_mut() {
                            obj.insert("type".to_string(), json!("object"));
                        }
                        p
                    } else {
                        t.parameters.clone()
                    };
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": params
                        }
                    })
                }).collect::<Vec<_>>());

                if let Some(tool_choice) = &request.tool_choice {
                    body["tool_choice"] = match tool_choice {
                        ToolChoice::Auto => json!("auto"),
                        ToolChoice::None => json!("none"),
                        ToolChoice::Required => json!("required"),
                    };
                }
            }
        }

        if request.stream {
            body["stream"] = json!(true);
        }

        body
    }

    async fn post(&self, body: &Value) -> LlmResult<reqwest::Response> {
        post(&self.client, self.auth.as_ref(), &self.url, body).await
    }
}

async fn post(
    client: &reqwest::Client,
    auth: &dyn Authenticator,
    url: &str,
    body: &Value,
) -> LlmResult<reqwest::Response> {
    let (header, value) = auth.header();
    let response = client
        .post(url)
        .header(header, value)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;
    Ok(response)
}

/// Turn a non-success response into either a content-filter outcome or an error
async fn reject(response: reqwest::Response) -> LlmResult<CompletionResponse> {
    let status = response.status().as_u16();
    let error_text = response.text().await.unwrap_or_default();

    if let Some(filtered) = content_filter_rejection(status, &error_text) {
        return Ok(filtered);
    }

    Err(match status {
        401 | 403 => LlmError::Authentication(error_text),
        _ => LlmError::Api {
            status,
            message: error_text,
        },
    })
}

/// Azure rejects filtered prompts with HTTP 400 and `error.code == "content_filter"`
fn content_filter_rejection(status: u16, body: &str) -> Option<CompletionResponse> {
    if status != 400 {
        return None;
    }

    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    if parsed.error.code.as_deref() != Some("content_filter") {
        return None;
    }

    let detail = parsed
        .error
        .innererror
        .and_then(|inner| inner.get("content_filter_result").cloned())
        .or_else(|| parsed.error.message.map(Value::String));

    Some(CompletionResponse {
        parts: Vec::new(),
        finish_reason: FinishReason::ContentFilter,
        usage: None,
        content_filter: detail,
    })
}

/// Convert internal messages to the wire format
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let mut msg = json!({
                "role": m.role.to_string(),
                "content": m.content,
            });

            if let Some(tool_calls) = &m.tool_calls {
                if m.content.is_empty() {
                    msg["content"] = Value::Null;
                }
                msg["tool_calls"] = json!(tool_calls.iter().map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string()
                        }
                    })
                }).collect::<Vec<_>>());
            }

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(name) = &m.name {
                if m.role != Role::Tool {
                    msg["name"] = json!(name);
                }
            }

            msg
        })
        .collect()
}

/// Parse a non-streaming response
fn parse_response(response: OpenAiResponse) -> LlmResult<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))?;

    let mut parts = match choice.message.content {
        Some(OpenAiContent::Text(text)) if !text.is_empty() => vec![ContentPart::text(text)],
        Some(OpenAiContent::Text(_)) | None => Vec::new(),
        Some(OpenAiContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| part.text.map(ContentPart::text))
            .collect(),
    };

    parts.extend(
        choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                ContentPart::ToolCall(ToolCall {
                    id: tc.id.unwrap_or_else(ToolCall::generate_id),
                    name: tc.function.name,
                    arguments: parse_arguments(&tc.function.arguments),
                })
            }),
    );

    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map(FinishReason::parse)
        .unwrap_or_default();

    let content_filter = choice
        .content_filter_results
        .filter(|_| finish_reason == FinishReason::ContentFilter)
        .or_else(|| {
            response
                .prompt_filter_results
                .filter(|_| finish_reason == FinishReason::ContentFilter)
        });

    Ok(CompletionResponse {
        parts,
        finish_reason,
        usage: response.usage.map(TokenUsage::from),
        content_filter,
    })
}

/// Parse the payload of one SSE `data:` line
fn parse_stream_data(data: &str) -> Option<StreamChunk> {
    let parsed: OpenAiStreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparseable stream event");
            return None;
        }
    };

    let usage = parsed.usage.map(TokenUsage::from);
    let Some(choice) = parsed.choices.into_iter().next() else {
        return usage.map(|u| StreamChunk {
            usage: Some(u),
            ..Default::default()
        });
    };

    let mut chunk = StreamChunk {
        content: choice.delta.content.unwrap_or_default(),
        usage,
        ..Default::default()
    };

    for tc in choice.delta.tool_calls.unwrap_or_default() {
        let mut delta = ToolCallDelta::new(tc.index);
        if let Some(id) = tc.id {
            delta = delta.with_id(id);
        }
        if let Some(func) = tc.function {
            if let Some(name) = func.name {
                delta = delta.with_name(name);
            }
            if let Some(args) = func.arguments {
                delta = delta.with_arguments(args);
            }
        }
        chunk.tool_calls.push(delta);
    }

    if let Some(reason) = &choice.finish_reason {
        let reason = FinishReason::parse(reason);
        if reason == FinishReason::ContentFilter {
            chunk.content_filter = choice.content_filter_results;
        }
        chunk.finish_reason = Some(reason);
    }

    Some(chunk)
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let mut req = request;
        req.stream = false;
        let body = self.build_request_body(&req);

        let response = self.post(&body).await?;
        if !response.status().is_success() {
            return reject(response).await;
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        parse_response(parsed)
    }

    fn complete_stream(&self, request: CompletionRequest) -> LlmStream {
        let (sender, stream) = LlmStream::channel(64);

        let client = self.client.clone();
        let auth = self.auth.clone();
        let url = self.url.clone();
        let mut req = request;
        req.stream = true;
        let body = self.build_request_body(&req);

        tokio::spawn(async move {
            let result = stream_completion(client, auth, url, body, sender.clone()).await;
            if let Err(e) = result {
                let _ = sender.send_error(e).await;
            }
        });

        stream
    }
}

async fn stream_completion(
    client: reqwest::Client,
    auth: Arc<dyn Authenticator>,
    url: String,
    body: Value,
    sender: LlmStreamSender,
) -> LlmResult<()> {
    let response = post(&client, auth.as_ref(), &url, &body).await?;

    if !response.status().is_success() {
        let filtered = reject(response).await?;
        let chunk = StreamChunk {
            finish_reason: Some(filtered.finish_reason),
            content_filter: filtered.content_filter,
            ..Default::default()
        };
        let _ = sender.send(chunk).await;
        return Ok(());
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = chunk_result.map_err(|e| LlmError::Streaming(e.to_string()))?;
        buffer.extend_from_slice(&bytes);

        // Process complete lines
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                return Ok(());
            }

            if let Some(chunk) = parse_stream_data(data) {
                if sender.send(chunk).await.is_err() {
                    return Ok(()); // Receiver dropped
                }
            }
        }
    }

    Ok(())
}

// Wire types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    prompt_filter_results: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
    #[serde(default)]
    content_filter_results: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<OpenAiContent>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

/// Message content arrives either as a flat string or as typed parts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Deserialize)]
struct OpenAiContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: Option<String>,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(u: OpenAiUsage) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    finish_reason: Option<String>,
    #[serde(default)]
    content_filter_results: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: usize,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    innererror: Option<Value>,
}
