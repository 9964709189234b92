//! Single-agent completion engine

use async_trait::async_trait;
use std::sync::Arc;

use super::{settle_text, Sampling, TurnRunner};
use crate::agents::config::ChatConfig;
use crate::agents::domain::{ChatCompletion, ChatPort, ChatStream, ChunkSender, Message};
use crate::agents::error::AgentResult;
use crate::agents::history::{from_internal, to_internal};
use crate::agents::llm::LlmProvider;
use crate::domain::{ChatHistory, ToolPort};

const AGENT_NAME: &str = "ChatAgent";

/// One model agent with the plugins registered, answering every request
pub struct SingleAgentEngine {
    runner: Arc<TurnRunner>,
    system_prompt: Arc<str>,
}

impl SingleAgentEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, plugins: Vec<Arc<dyn ToolPort>>, config: &ChatConfig) -> Self {
        Self {
            runner: Arc::new(TurnRunner::new(
                llm,
                plugins,
                Sampling::from(config),
                config.max_tool_rounds,
            )),
            system_prompt: Arc::from(config.system_prompt.as_str()),
        }
    }

    async fn answer(
        runner: Arc<TurnRunner>,
        system_prompt: Arc<str>,
        message: String,
        history: Option<ChatHistory>,
        sink: Option<ChunkSender>,
    ) -> AgentResult<ChatCompletion> {
        let history = history.unwrap_or_default();
        let mut messages = to_internal(&history, &system_prompt);
        messages.push(Message::user(message));

        let output = runner.run(AGENT_NAME, &mut messages, &[], sink.as_ref()).await?;
        let text = settle_text(AGENT_NAME, &output);

        // Substituted text, or a provider that answered without streaming
        if let Some(sink) = &sink {
            if !output.streamed && !text.is_empty() {
                sink.send_text(&text)?;
            }
        }

        if !text.is_empty() {
            messages.push(Message::assistant(&text));
        }

        Ok(ChatCompletion {
            text,
            finish_reason: output.finish_reason,
            tool_invocations: output.invocations,
            history: from_internal(&messages),
        })
    }
}

#[async_trait]
impl ChatPort for SingleAgentEngine {
    fn stream_completion(&self, message: &str, history: Option<ChatHistory>) -> ChatStream {
        let runner = self.runner.clone();
        let system_prompt = self.system_prompt.clone();
        let message = message.to_string();

        ChatStream::spawn(move |sender| {
            Self::answer(runner, system_prompt, message, history, Some(sender))
        })
    }

    async fn get_completion(
        &self,
        message: &str,
        history: Option<ChatHistory>,
    ) -> AgentResult<(String, ChatHistory)> {
        let completion = Self::answer(
            self.runner.clone(),
            self.system_prompt.clone(),
            message.to_string(),
            history,
            None,
        )
        .await?;

        Ok((completion.text, completion.history))
    }
}
