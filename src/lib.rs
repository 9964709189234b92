//! # Nimbus - AI chat service
//!
//! Nimbus answers chat messages with an Azure OpenAI (or OpenAI-compatible)
//! deployment. The model can look up the weather through a plugin backed by a
//! separate weather function, and answers are streamed to the caller as
//! Server-Sent Events.
//!
//! ## Features
//!
//! - **Two engines**: a single agent, or coordinator/query agents handing off
//! - **Streaming**: text chunks relayed as SSE while the model produces them
//! - **Content filter handling**: filtered turns become a fixed apology
//! - **Configuration**: file, `NIMBUS__` env vars and CLI overrides, validated at startup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nimbus::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: Chat models exchanged with callers, tool port
//! - **Agents**: Providers, plugins and the completion engines
//! - **Adapters**: HTTP handlers
//! - **Config**: Configuration management

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;

use crate::adapters::chat_handler::{self, ChatState};
use crate::adapters::health_handler::HealthHandler;
use crate::agents::domain::ChatPort;
use crate::config::ServerSettings;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `service` - Completion engine answering chat requests
/// * `server` - Server settings (service name and CORS origins)
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(service: Arc<dyn ChatPort>, server: &ServerSettings) -> Router {
    let health_handler = Arc::new(HealthHandler::new(server.app_name.clone()));

    let health_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.root().await }
            }
        }));

    let chat_router = Router::new()
        .route("/api/chat", post(chat_handler::chat))
        .route("/api/chat/stream", post(chat_handler::chat_stream))
        .with_state(ChatState { service });

    health_router.merge(chat_router).layer(cors_layer(server))
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if server.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
