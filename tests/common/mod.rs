#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const TEST_API_KEY_ENV: &str = "NIMBUS_TEST_AZURE_KEY";
pub const TEST_API_KEY: &str = "test-key";

/// One scripted answer of the fake chat-completions endpoint
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Call { name: String, arguments: Value },
    PromptFiltered,
    Status(u16),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn call(name: &str, arguments: Value) -> Self {
        Reply::Call {
            name: name.to_string(),
            arguments,
        }
    }
}

/// A request the fake endpoint received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub deployment: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct FakeAzureState {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// In-process stand-in for an Azure OpenAI deployment (JSON and SSE)
pub struct FakeAzure {
    pub endpoint: String,
    state: FakeAzureState,
}

impl FakeAzure {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let state = FakeAzureState {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        };

        let app = Router::new()
            .route(
                "/openai/deployments/:deployment/chat/completions",
                post(chat_completions),
            )
            .with_state(state.clone());

        let addr = serve(app).await;
        Self {
            endpoint: format!("http://{}", addr),
            state,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn chat_completions(
    State(state): State<FakeAzureState>,
    Path(deployment): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let streaming = body["stream"].as_bool().unwrap_or(false);
    state.requests.lock().unwrap().push(Recorded {
        deployment,
        api_key: headers
            .get("api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let reply = state.replies.lock().unwrap().pop_front();
    let Some(reply) = reply else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"code": "script_exhausted", "message": "no reply left"}})),
        )
            .into_response();
    };

    match reply {
        Reply::PromptFiltered => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": "content_filter",
                    "message": "The response was filtered due to the prompt triggering content management policy.",
                    "innererror": {
                        "code": "ResponsibleAIPolicyViolation",
                        "content_filter_result": {"violence": {"filtered": true, "severity": "high"}}
                    }
                }
            })),
        )
            .into_response(),
        Reply::Status(status) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"error": {"code": status.to_string(), "message": "Access denied"}})),
        )
            .into_response(),
        reply if streaming => sse_reply(&reply),
        reply => Json(json_reply(&reply)).into_response(),
    }
}

fn json_reply(reply: &Reply) -> Value {
    match reply {
        Reply::Text(text) => json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }),
        Reply::Call { name, arguments } => json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": name, "arguments": arguments.to_string()}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }),
        _ => Value::Null,
    }
}

fn sse_reply(reply: &Reply) -> Response {
    let mut events: Vec<Value> = Vec::new();

    match reply {
        Reply::Text(text) => {
            for word in text.split_inclusive(' ') {
                events.push(json!({
                    "choices": [{"index": 0, "delta": {"content": word}, "finish_reason": null}]
                }));
            }
            events.push(json!({
                "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
            }));
        }
        Reply::Call { name, arguments } => {
            events.push(json!({
                "choices": [{
                    "index": 0,
                    "delta": {"tool_calls": [{
                        "index": 0,
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": name, "arguments": ""}
                    }]},
                    "finish_reason": null
                }]
            }));
            events.push(json!({
                "choices": [{
                    "index": 0,
                    "delta": {"tool_calls": [{"index": 0, "function": {"arguments": arguments.to_string()}}]},
                    "finish_reason": null
                }]
            }));
            events.push(json!({
                "choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]
            }));
        }
        _ => {}
    }

    let mut body = String::new();
    for event in events {
        body.push_str(&format!("data: {}\n\n", event));
    }
    body.push_str("data: [DONE]\n\n");

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from(body))
        .unwrap()
}

/// The real weather function router on an ephemeral port
pub async fn start_weather_function() -> String {
    let addr = serve(nimbus::adapters::weather_function::weather_router()).await;
    format!("http://{}", addr)
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Settings pointing at the fake deployment and the weather function
pub fn settings(endpoint: &str, weather_url: &str) -> nimbus::config::Settings {
    std::env::set_var(TEST_API_KEY_ENV, TEST_API_KEY);

    let mut settings = nimbus::config::Settings::default();
    settings.llm.base_url = endpoint.to_string();
    settings.llm.model = "gpt-4o-test".to_string();
    settings.llm.api_key_env = TEST_API_KEY_ENV.to_string();
    settings.weather.base_url = weather_url.to_string();
    settings.weather.timeout_seconds = 5;
    settings
}

/// Data payloads of an SSE body, in order
pub fn sse_data(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|event| !event.is_empty())
        .map(|event| {
            event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|data| data.strip_prefix(' ').unwrap_or(data))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}
