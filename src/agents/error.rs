//! Error types for the chat orchestration core

use thiserror::Error;

/// Errors that can occur while answering a chat request
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(#[from] ToolError),

    /// Handoff result not available in time
    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    /// Agents kept handing the task back and forth
    #[error("Handoff limit ({0}) reached without completion")]
    HandoffLimit(u32),

    /// Cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Whether the failure came from talking to the model provider
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AgentError::Llm(_))
    }

    /// Whether the failure is an orchestration timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout(_))
    }
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Errors raised by tool plugins
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool is not registered
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The request to the backing service failed
    #[error("Request failed: {0}")]
    Request(String),

    /// The backing service answered with a non-success status
    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backing service did not answer in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AgentError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            AgentError::Cancelled
        } else {
            AgentError::Internal(format!("Background task failed: {}", err))
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for tool operations
pub type ToolResult<T> = Result<T, ToolError>;
