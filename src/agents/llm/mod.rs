//! LLM provider abstraction with streaming support
//!
//! - OpenAI-compatible chat completions (JSON and SSE)
//! - Azure OpenAI deployments
//! - Authenticators for API keys and bearer tokens

mod auth;
mod azure;
mod openai;
mod stream;

pub use auth::{authenticator_from_env, ApiKeyAuth, Authenticator, BearerTokenAuth};
pub use azure::AzureOpenAiProvider;
pub use openai::OpenAiProvider;
pub use stream::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::agents::config::{LlmProviderConfig, LlmProviderType};
use crate::agents::domain::{ContentPart, FinishReason, Message, ToolCall, ToolDefinition};
use crate::agents::error::LlmResult;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Check if streaming is supported
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Complete a request (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;

    /// Complete a request with streaming
    fn complete_stream(&self, request: CompletionRequest) -> LlmStream;
}

/// Request for LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tools available for calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool choice mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// Tool choice mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide
    Auto,
    /// Don't use tools
    None,
    /// Must use a tool
    Required,
}

/// Response from LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Message content as typed parts, in order
    pub parts: Vec<ContentPart>,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Provider content filter annotations, if any were reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<Value>,
}

impl CompletionResponse {
    /// Concatenated text parts
    pub fn text(&self) -> String {
        ContentPart::collect_text(&self.parts)
    }

    /// Tool call parts
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        ContentPart::collect_tool_calls(&self.parts)
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Create an LLM provider from configuration, reading credentials from the environment
pub fn create_provider(config: &LlmProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let auth = authenticator_from_env(config)?;
    create_provider_with_auth(config, auth)
}

/// Create an LLM provider from configuration with explicit credentials
pub fn create_provider_with_auth(
    config: &LlmProviderConfig,
    auth: Arc<dyn Authenticator>,
) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        LlmProviderType::Azure => Ok(Arc::new(AzureOpenAiProvider::new(config, auth)?)),
        LlmProviderType::OpenAI => Ok(Arc::new(OpenAiProvider::new(config, auth)?)),
    }
}
