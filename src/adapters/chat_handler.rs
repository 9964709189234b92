//! Chat endpoints: one complete JSON answer, or the answer streamed as SSE

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::error;

use crate::agents::domain::{ChatPort, ChatStream};
use crate::agents::error::AgentError;
use crate::domain::{ChatRequest, ChatResponse};

/// Shared state for the chat routes
#[derive(Clone)]
pub struct ChatState {
    pub service: Arc<dyn ChatPort>,
}

/// Failure of a chat request, rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum ChatApiError {
    EmptyMessage,
    Processing(AgentError),
}

impl ChatApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatApiError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatApiError::Processing(e) if e.is_provider_failure() => StatusCode::BAD_GATEWAY,
            ChatApiError::Processing(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ChatApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ChatApiError::EmptyMessage => "Message cannot be empty".to_string(),
            ChatApiError::Processing(e) => format!("Error processing chat request: {}", e),
        }
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

fn require_message(request: &ChatRequest) -> Result<(), ChatApiError> {
    if request.message.trim().is_empty() {
        return Err(ChatApiError::EmptyMessage);
    }
    Ok(())
}

/// POST /api/chat - complete (non-streaming) answer
pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatApiError> {
    require_message(&request)?;

    match state
        .service
        .get_completion(&request.message, request.history)
        .await
    {
        Ok((response, history)) => Ok(Json(ChatResponse { response, history })),
        Err(e) => {
            error!(error = %e, "Chat request failed");
            Err(ChatApiError::Processing(e))
        }
    }
}

/// POST /api/chat/stream - one `data:` event per chunk, then `[DONE]`
pub async fn chat_stream(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatApiError> {
    require_message(&request)?;

    let chunks = state
        .service
        .stream_completion(&request.message, request.history);

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    Ok((headers, Sse::new(sse_events(chunks))).into_response())
}

/// Relay chunks as SSE events; errors after the response has started are sent in-band.
///
/// Dropping the returned stream (caller disconnect) drops the `ChatStream`,
/// which cancels the background orchestration.
fn sse_events(chunks: ChatStream) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    stream::unfold(Some(chunks), |state: Option<ChatStream>| async move {
        let Some(mut chunks) = state else {
            return None;
        };
        let event = match chunks.next().await {
            Some(Ok(text)) => return Some((Ok::<_, Infallible>(chunk_event(&text)), Some(chunks))),
            Some(Err(e)) => {
                error!(error = %e, "Chat stream failed");
                Event::default().data(format!("[ERROR: {}]", sse_safe(&e.to_string())))
            }
            None => Event::default().data("[DONE]"),
        };
        Some((Ok(event), None))
    })
}

fn chunk_event(text: &str) -> Event {
    Event::default().data(sse_safe(text))
}

// SSE cannot carry carriage returns
fn sse_safe(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
