//! Handoff orchestration: a coordinator and a weather query agent passing the
//! task between each other until one of them completes it.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::agents::config::ChatConfig;
use crate::agents::core::{settle_text, Sampling, TurnOutput, TurnRunner, CONTENT_FILTER_APOLOGY};
use crate::agents::domain::{
    qualified_name, ChatCompletion, ChatPort, ChatStream, ChunkSender, Message, ToolDefinition,
};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::history::{from_internal, to_internal};
use crate::agents::llm::LlmProvider;
use crate::domain::{ChatHistory, ToolPort};

/// Plugin name the handoff functions are qualified with
pub const HANDOFF_PLUGIN: &str = "Handoff";
const TRANSFER_PREFIX: &str = "transfer_to_";
const COMPLETE_TASK: &str = "complete_task";

/// The two logical agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Coordinator,
    Query,
}

impl AgentRole {
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Coordinator => "CoordinatorAgent",
            AgentRole::Query => "QueryAgent",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "CoordinatorAgent" => Some(AgentRole::Coordinator),
            "QueryAgent" => Some(AgentRole::Query),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Directed permission to transfer control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffEdge {
    pub from: AgentRole,
    pub to: AgentRole,
    pub description: &'static str,
}

/// Every transfer the agents may make
pub const HANDOFF_EDGES: [HandoffEdge; 2] = [
    HandoffEdge {
        from: AgentRole::Coordinator,
        to: AgentRole::Query,
        description: "Transfer to this agent for questions about the weather.",
    },
    HandoffEdge {
        from: AgentRole::Query,
        to: AgentRole::Coordinator,
        description: "Transfer back to this agent for questions unrelated to the weather.",
    },
];

/// Where a run is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingState {
    Active(AgentRole),
    Complete,
}

/// What the active agent's turn asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Hand the task to another agent
    Transfer(AgentRole),
    /// The task is done
    Complete { summary: Option<String> },
    /// The agent replied without a directive, which also ends the task
    Answered,
}

impl Directive {
    /// Read the first directive call of a turn
    pub fn from_turn(output: &TurnOutput) -> Self {
        let transfer_prefix = qualified_name(HANDOFF_PLUGIN, TRANSFER_PREFIX);
        let complete = qualified_name(HANDOFF_PLUGIN, COMPLETE_TASK);

        for call in &output.directives {
            if call.name == complete {
                let summary = call
                    .arguments
                    .get("task_summary")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                return Directive::Complete { summary };
            }
            if let Some(role) = call
                .name
                .strip_prefix(&transfer_prefix)
                .and_then(AgentRole::from_name)
            {
                return Directive::Transfer(role);
            }
        }

        Directive::Answered
    }
}

/// Next routing state. Only declared edges transfer; anything else completes.
pub fn transition(state: RoutingState, directive: &Directive) -> RoutingState {
    match (state, directive) {
        (RoutingState::Active(from), Directive::Transfer(to))
            if HANDOFF_EDGES.iter().any(|e| e.from == from && e.to == *to) =>
        {
            RoutingState::Active(*to)
        }
        _ => RoutingState::Complete,
    }
}

/// Split text into whitespace-delimited chunks that rejoin to the text
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
        .collect()
}

/// Forwards text to the caller and keeps everything sent
struct Relay<'a> {
    sink: &'a ChunkSender,
    text: String,
}

impl<'a> Relay<'a> {
    fn new(sink: &'a ChunkSender) -> Self {
        Self {
            sink,
            text: String::new(),
        }
    }

    fn send(&mut self, chunk: &str) -> AgentResult<()> {
        self.sink.send_text(chunk)?;
        self.text.push_str(chunk);
        Ok(())
    }

    /// Text the turn already streamed on its own
    fn record(&mut self, streamed: &str) {
        self.text.push_str(streamed);
    }
}

struct HandoffAgent {
    role: AgentRole,
    instructions: String,
    runner: TurnRunner,
    functions: Vec<ToolDefinition>,
}

impl HandoffAgent {
    fn new(role: AgentRole, instructions: &str, runner: TurnRunner) -> Self {
        let mut functions: Vec<ToolDefinition> = HANDOFF_EDGES
            .iter()
            .filter(|edge| edge.from == role)
            .map(|edge| {
                ToolDefinition::new(
                    qualified_name(HANDOFF_PLUGIN, &format!("{}{}", TRANSFER_PREFIX, edge.to.name())),
                    edge.description,
                    json!({"type": "object", "properties": {}}),
                )
            })
            .collect();

        functions.push(ToolDefinition::new(
            qualified_name(HANDOFF_PLUGIN, COMPLETE_TASK),
            "Call when the user's request has been fully answered.",
            json!({
                "type": "object",
                "properties": {
                    "task_summary": {
                        "type": "string",
                        "description": "Short summary of the answer given to the user."
                    }
                },
                "required": ["task_summary"]
            }),
        ));

        Self {
            role,
            instructions: instructions.to_string(),
            runner,
            functions,
        }
    }
}

struct HandoffAgents {
    coordinator: HandoffAgent,
    query: HandoffAgent,
    system_prompt: String,
    max_handoffs: u32,
}

impl HandoffAgents {
    fn agent(&self, role: AgentRole) -> &HandoffAgent {
        match role {
            AgentRole::Coordinator => &self.coordinator,
            AgentRole::Query => &self.query,
        }
    }
}

/// Two-agent handoff engine.
///
/// Agents are built once and shared read-only by every request; each request
/// runs as its own background task relaying text through a [`ChatStream`].
pub struct HandoffEngine {
    agents: Arc<HandoffAgents>,
    result_timeout: Duration,
}

impl HandoffEngine {
    /// `query_plugins` are the tools of the query agent; the coordinator has none
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        query_plugins: Vec<Arc<dyn ToolPort>>,
        config: &ChatConfig,
    ) -> Self {
        let sampling = Sampling::from(config);
        let coordinator = HandoffAgent::new(
            AgentRole::Coordinator,
            &config.handoff.coordinator_instructions,
            TurnRunner::new(llm.clone(), Vec::new(), sampling, config.max_tool_rounds),
        );
        let query = HandoffAgent::new(
            AgentRole::Query,
            &config.handoff.query_instructions,
            TurnRunner::new(llm, query_plugins, sampling, config.max_tool_rounds),
        );

        Self {
            agents: Arc::new(HandoffAgents {
                coordinator,
                query,
                system_prompt: config.system_prompt.clone(),
                max_handoffs: config.handoff.max_handoffs,
            }),
            result_timeout: Duration::from_secs(config.handoff.result_timeout_seconds),
        }
    }

    /// Override the non-streaming result timeout
    pub fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = timeout;
        self
    }

    async fn run(
        agents: Arc<HandoffAgents>,
        message: String,
        history: Option<ChatHistory>,
        sink: ChunkSender,
    ) -> AgentResult<ChatCompletion> {
        let history = history.unwrap_or_default();
        let mut transcript = to_internal(&history, &agents.system_prompt);
        transcript.push(Message::user(message));

        let mut state = RoutingState::Active(AgentRole::Coordinator);
        let mut path = vec![state];
        let mut handoffs = 0u32;
        let mut invocations = Vec::new();
        let mut relay = Relay::new(&sink);

        while let RoutingState::Active(role) = state {
            let agent = agents.agent(role);

            let mut view = Vec::with_capacity(transcript.len() + 1);
            view.push(Message::system(&agent.instructions));
            view.extend(transcript.iter().cloned());
            let turn_start = view.len();

            let output = agent
                .runner
                .run(role.name(), &mut view, &agent.functions, Some(&sink))
                .await?;
            transcript.extend(view.drain(turn_start..));
            invocations.extend(output.invocations.iter().cloned());

            if output.streamed {
                relay.record(&output.text);
            } else {
                for word in split_words(&output.text) {
                    relay.send(&word)?;
                }
            }

            let directive = Directive::from_turn(&output);
            state = transition(state, &directive);
            path.push(state);

            if let RoutingState::Active(next) = state {
                handoffs += 1;
                info!(from = %agent.role, to = %next, reason = "transfer", "Handoff");
                if handoffs > agents.max_handoffs {
                    return Err(AgentError::HandoffLimit(agents.max_handoffs));
                }
                continue;
            }

            let reason = match &directive {
                Directive::Complete { .. } => "complete_task",
                _ => "answered",
            };
            info!(from = %agent.role, to = "complete", reason, "Handoff");
            debug!(path = ?path, "Handoff route");

            let summary = match directive {
                Directive::Complete { summary } => summary.filter(|s| !s.trim().is_empty()),
                _ => None,
            };

            let settled = settle_text(role.name(), &output);
            if output.text.is_empty() {
                match summary {
                    Some(summary) => {
                        for word in split_words(&summary) {
                            relay.send(&word)?;
                        }
                    }
                    None if settled == CONTENT_FILTER_APOLOGY => relay.send(&settled)?,
                    None => {}
                }
            }

            // The caller sees exactly what was relayed, across every agent
            let text = relay.text;
            if !text.is_empty() {
                transcript.push(Message::assistant(&text).with_name(role.name()));
            }

            return Ok(ChatCompletion {
                text,
                finish_reason: output.finish_reason,
                tool_invocations: invocations,
                history: from_internal(&transcript),
            });
        }

        Err(AgentError::Internal("Handoff run ended without an active agent".to_string()))
    }
}

#[async_trait]
impl ChatPort for HandoffEngine {
    fn stream_completion(&self, message: &str, history: Option<ChatHistory>) -> ChatStream {
        let agents = self.agents.clone();
        let message = message.to_string();
        ChatStream::spawn(move |sender| Self::run(agents, message, history, sender))
    }

    async fn get_completion(
        &self,
        message: &str,
        history: Option<ChatHistory>,
    ) -> AgentResult<(String, ChatHistory)> {
        let stream = self.stream_completion(message, history);

        match tokio::time::timeout(self.result_timeout, stream.into_completion()).await {
            Ok(completion) => {
                let completion = completion?;
                Ok((completion.text, completion.history))
            }
            Err(_) => Err(AgentError::Timeout(self.result_timeout.as_secs())),
        }
    }
}
