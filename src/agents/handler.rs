//! Chat agent service implementing ChatPort

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::agents::config::{ChatConfig, OrchestrationMode};
use crate::agents::core::SingleAgentEngine;
use crate::agents::domain::{ChatPort, ChatStream};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{create_provider, LlmProvider};
use crate::agents::orchestration::HandoffEngine;
use crate::agents::plugins::WeatherPlugin;
use crate::config::Settings;
use crate::domain::{ChatHistory, ToolPort};

/// Entry point for the HTTP layer.
///
/// The engine is chosen once, at construction, from `chat.orchestration`.
pub struct ChatAgentService {
    engine: Arc<dyn ChatPort>,
    mode: OrchestrationMode,
}

impl ChatAgentService {
    /// Build the service around an existing provider and plugin set
    pub fn new(llm: Arc<dyn LlmProvider>, plugins: Vec<Arc<dyn ToolPort>>, config: &ChatConfig) -> Self {
        let engine: Arc<dyn ChatPort> = match config.orchestration {
            OrchestrationMode::Single => Arc::new(SingleAgentEngine::new(llm, plugins, config)),
            OrchestrationMode::Handoff => Arc::new(HandoffEngine::new(llm, plugins, config)),
        };

        Self {
            engine,
            mode: config.orchestration,
        }
    }

    /// Build the provider, the weather plugin and the engine from settings
    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        let llm = create_provider(&settings.llm)?;
        let weather = WeatherPlugin::from_config(&settings.weather)
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        info!(
            provider = llm.name(),
            model = llm.model(),
            orchestration = %settings.chat.orchestration,
            "Chat agent service initialized"
        );

        Ok(Self::new(llm, vec![Arc::new(weather)], &settings.chat))
    }

    pub fn mode(&self) -> OrchestrationMode {
        self.mode
    }
}

#[async_trait]
impl ChatPort for ChatAgentService {
    fn stream_completion(&self, message: &str, history: Option<ChatHistory>) -> ChatStream {
        info!(
            stream = true,
            history_len = history.as_ref().map_or(0, ChatHistory::len),
            orchestration = %self.mode,
            "Chat request received"
        );
        self.engine.stream_completion(message, history)
    }

    async fn get_completion(
        &self,
        message: &str,
        history: Option<ChatHistory>,
    ) -> AgentResult<(String, ChatHistory)> {
        info!(
            stream = false,
            history_len = history.as_ref().map_or(0, ChatHistory::len),
            orchestration = %self.mode,
            "Chat request received"
        );
        self.engine.get_completion(message, history).await
    }
}
