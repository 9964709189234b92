//! Configuration types for the chat orchestration core

use serde::{Deserialize, Serialize};

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Provider type
    #[serde(default)]
    pub provider: LlmProviderType,
    /// Model name, or deployment name for Azure
    #[serde(default)]
    pub model: String,
    /// Endpoint base URL (the Azure resource endpoint for Azure)
    #[serde(default)]
    pub base_url: String,
    /// Azure REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Environment variable containing a pre-acquired bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderType::default(),
            model: String::new(),
            base_url: String::new(),
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
            token_env: default_token_env(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_api_version() -> String {
    "2024-10-21".to_string()
}

fn default_api_key_env() -> String {
    "AZURE_OPENAI_API_KEY".to_string()
}

fn default_token_env() -> String {
    "AZURE_OPENAI_AD_TOKEN".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Azure OpenAI
    #[default]
    #[serde(alias = "azure_openai", alias = "azureopenai")]
    Azure,
    /// OpenAI-compatible endpoint
    OpenAI,
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::Azure => write!(f, "azure"),
            LlmProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

/// Which completion engine answers chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationMode {
    /// One model call per request
    #[default]
    Single,
    /// Coordinator and query agents handing the task back and forth
    Handoff,
}

impl std::str::FromStr for OrchestrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(OrchestrationMode::Single),
            "handoff" => Ok(OrchestrationMode::Handoff),
            other => Err(format!(
                "unknown orchestration mode '{}', expected 'single' or 'handoff'",
                other
            )),
        }
    }
}

impl std::fmt::Display for OrchestrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestrationMode::Single => write!(f, "single"),
            OrchestrationMode::Handoff => write!(f, "handoff"),
        }
    }
}

/// Sampling and orchestration settings for answering chat requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Engine selected at startup
    #[serde(default)]
    pub orchestration: OrchestrationMode,
    /// Injected when the caller history has no system message
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on automatic tool round trips within one agent turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default)]
    pub handoff: HandoffConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            orchestration: OrchestrationMode::default(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            max_tool_rounds: default_max_tool_rounds(),
            handoff: HandoffConfig::default(),
        }
    }
}

pub(crate) fn default_system_prompt() -> String {
    "You are a helpful AI assistant. You can answer questions and use the weather tool \
     to look up current conditions when asked about the weather."
        .to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_max_tokens() -> u32 {
    800
}

fn default_max_tool_rounds() -> u32 {
    5
}

/// Handoff orchestration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandoffConfig {
    /// Transfers allowed before the run is abandoned
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: u32,
    /// Bound on waiting for the aggregate result in the non-streaming path
    #[serde(default = "default_result_timeout")]
    pub result_timeout_seconds: u64,
    #[serde(default = "default_coordinator_instructions")]
    pub coordinator_instructions: String,
    #[serde(default = "default_query_instructions")]
    pub query_instructions: String,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            max_handoffs: default_max_handoffs(),
            result_timeout_seconds: default_result_timeout(),
            coordinator_instructions: default_coordinator_instructions(),
            query_instructions: default_query_instructions(),
        }
    }
}

fn default_max_handoffs() -> u32 {
    8
}

fn default_result_timeout() -> u64 {
    60
}

fn default_coordinator_instructions() -> String {
    "You are a coordinator agent. Answer general questions directly and then call \
     complete_task with a short summary. If the user asks about the weather, transfer \
     the conversation to the QueryAgent."
        .to_string()
}

fn default_query_instructions() -> String {
    "You are a query agent. Use the weather tool to look up the conditions the user \
     asked about, answer the user, then call complete_task with a summary of the answer."
        .to_string()
}

/// Weather capability settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    /// Base URL of the weather function app
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u64,
    /// Location used when the model omits one
    #[serde(default = "default_location")]
    pub default_location: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            timeout_seconds: default_weather_timeout(),
            default_location: default_location(),
        }
    }
}

fn default_weather_url() -> String {
    "http://localhost:7071".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

fn default_location() -> String {
    "Seattle".to_string()
}
