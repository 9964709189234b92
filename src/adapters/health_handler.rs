use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    pub health: String,
    pub chat_stream: String,
    pub chat: String,
}

pub struct HealthHandler {
    app_name: String,
}

impl HealthHandler {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Basic health check - returns 200 if server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            service: self.app_name.clone(),
        };

        (StatusCode::OK, Json(status))
    }

    /// Service name, version and the routes it answers
    pub async fn root(&self) -> impl IntoResponse {
        let info = ServiceInfo {
            service: self.app_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints: Endpoints {
                health: "/health".to_string(),
                chat_stream: "/api/chat/stream (POST)".to_string(),
                chat: "/api/chat (POST)".to_string(),
            },
        };

        (StatusCode::OK, Json(info))
    }
}
