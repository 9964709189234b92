use async_trait::async_trait;
use serde_json::Value;

pub mod chat;

pub use chat::{ChatHistory, ChatMessage, ChatRequest, ChatResponse, MessageRole};

use crate::agents::domain::ToolDefinition;
use crate::agents::error::ToolResult;

/// A set of functions the model may call.
///
/// Tool names are qualified as `<Plugin>-<function>`; the returned string is
/// handed to the model verbatim as the tool result.
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// Plugin name used to qualify this port's functions
    fn plugin_name(&self) -> &str;

    /// Function definitions advertised to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a function by its qualified name
    async fn execute_tool(&self, name: &str, args: &Value) -> ToolResult<String>;
}
