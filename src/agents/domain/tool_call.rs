//! Tool call types for model interactions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between plugin and function in a qualified tool name
pub const PLUGIN_SEPARATOR: char = '-';

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Qualified name of the tool being called
    pub name: String,
    /// Arguments passed to the tool (as JSON)
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Generate a unique ID for a tool call
    pub fn generate_id() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("call_{}", &id[..24])
    }
}

/// Definition of a tool available to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Qualified tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema defining the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Join a plugin and function name into the name the model sees
pub fn qualified_name(plugin: &str, function: &str) -> String {
    format!("{}{}{}", plugin, PLUGIN_SEPARATOR, function)
}

/// Observational record of a tool call, used for audit logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Function name without the plugin prefix
    pub tool_name: String,
    /// Plugin that owns the function (empty when unqualified)
    pub plugin_name: String,
    /// Arguments the model supplied
    pub arguments: Map<String, Value>,
}

impl From<&ToolCall> for ToolInvocation {
    fn from(call: &ToolCall) -> Self {
        let (plugin_name, tool_name) = match call.name.split_once(PLUGIN_SEPARATOR) {
            Some((plugin, function)) => (plugin.to_string(), function.to_string()),
            None => (String::new(), call.name.clone()),
        };

        let arguments = match &call.arguments {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        Self {
            tool_name,
            plugin_name,
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_splits_qualified_name() {
        let call = ToolCall::new("call_1", "Weather-get_weather", json!({"location": "Paris"}));
        let invocation = ToolInvocation::from(&call);
        assert_eq!(invocation.plugin_name, "Weather");
        assert_eq!(invocation.tool_name, "get_weather");
        assert_eq!(invocation.arguments["location"], "Paris");
    }

    #[test]
    fn test_invocation_unqualified_name() {
        let call = ToolCall::new("call_2", "lookup", Value::Null);
        let invocation = ToolInvocation::from(&call);
        assert_eq!(invocation.plugin_name, "");
        assert_eq!(invocation.tool_name, "lookup");
        assert!(invocation.arguments.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ToolCall::generate_id();
        let b = ToolCall::generate_id();
        assert!(a.starts_with("call_"));
        assert_eq!(a.len(), 29);
        assert_ne!(a, b);
    }
}
