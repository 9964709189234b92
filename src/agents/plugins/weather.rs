//! Weather lookup exposed to the model as the `Weather` plugin

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::agents::config::WeatherConfig;
use crate::agents::domain::{qualified_name, ToolDefinition};
use crate::agents::error::{ToolError, ToolResult};
use crate::domain::ToolPort;

/// Plugin name the weather functions are qualified with
pub const WEATHER_PLUGIN: &str = "Weather";
/// Function name of the lookup
pub const GET_WEATHER: &str = "get_weather";

/// HTTP client for the weather function app
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl WeatherClient {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> ToolResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ToolError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    /// Fetch the weather for `location`, returning the response body verbatim
    pub async fn lookup(&self, location: &str) -> ToolResult<String> {
        let url = format!("{}/api/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("location", location)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        info!(location, status = status.as_u16(), "Weather lookup");

        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!(location, body = %body, "Weather response");

        if !status.is_success() {
            return Err(ToolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout_seconds)
        } else {
            ToolError::from(err)
        }
    }
}

/// The `Weather` plugin: one function, `get_weather(location)`
#[derive(Debug, Clone)]
pub struct WeatherPlugin {
    client: WeatherClient,
    default_location: String,
}

impl WeatherPlugin {
    pub fn new(client: WeatherClient, default_location: impl Into<String>) -> Self {
        Self {
            client,
            default_location: default_location.into(),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> ToolResult<Self> {
        let client = WeatherClient::new(&config.base_url, config.timeout_seconds)?;
        Ok(Self::new(client, &config.default_location))
    }

    fn location<'a>(&'a self, args: &'a Value) -> &'a str {
        args.get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_location)
    }
}

#[async_trait]
impl ToolPort for WeatherPlugin {
    fn plugin_name(&self) -> &str {
        WEATHER_PLUGIN
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            qualified_name(WEATHER_PLUGIN, GET_WEATHER),
            "Get the current weather for a location.",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": format!(
                            "City or place to get the weather for. Defaults to {}.",
                            self.default_location
                        )
                    }
                },
                "required": []
            }),
        )]
    }

    async fn execute_tool(&self, name: &str, args: &Value) -> ToolResult<String> {
        if name != qualified_name(WEATHER_PLUGIN, GET_WEATHER) {
            return Err(ToolError::NotFound(name.to_string()));
        }
        self.client.lookup(self.location(args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn echo_router() -> Router {
        Router::new().route(
            "/api/weather",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!({"location": q.get("location").cloned().unwrap_or_default(), "temperature": 72}))
            }),
        )
    }

    #[tokio::test]
    async fn test_lookup_returns_body_verbatim() {
        let base = serve(echo_router()).await;
        let plugin = WeatherPlugin::new(WeatherClient::new(base, 5).unwrap(), "Seattle");

        let body = plugin
            .execute_tool("Weather-get_weather", &json!({"location": "Paris"}))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["location"], "Paris");
    }

    #[tokio::test]
    async fn test_missing_location_uses_default() {
        let base = serve(echo_router()).await;
        let plugin = WeatherPlugin::new(WeatherClient::new(base, 5).unwrap(), "Seattle");

        let body = plugin.execute_tool("Weather-get_weather", &json!({})).await.unwrap();
        assert!(body.contains("Seattle"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_tool_error() {
        let base = serve(Router::new().route(
            "/api/weather",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let client = WeatherClient::new(base, 5).unwrap();

        match client.lookup("Oslo").await {
            Err(ToolError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_tool_error() {
        let base = serve(Router::new().route(
            "/api/weather",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        ))
        .await;
        let client = WeatherClient::new(base, 1).unwrap();

        assert!(matches!(client.lookup("Oslo").await, Err(ToolError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let plugin = WeatherPlugin::new(WeatherClient::new("http://127.0.0.1:1", 1).unwrap(), "Seattle");
        let err = plugin.execute_tool("Weather-get_forecast", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(plugin.definitions()[0].name, "Weather-get_weather");
    }
}
