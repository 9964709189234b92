//! Stand-in for the weather function app: fixed conditions for any location

use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

const DEFAULT_LOCATION: &str = "Seattle";

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: i32,
    pub temperature_unit: String,
    pub conditions: String,
    pub humidity: u32,
    pub wind_speed: u32,
    pub wind_unit: String,
    pub forecast: String,
}

impl WeatherReport {
    pub fn fixed(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            temperature: 72,
            temperature_unit: "F".to_string(),
            conditions: "Partly Cloudy".to_string(),
            humidity: 65,
            wind_speed: 8,
            wind_unit: "mph".to_string(),
            forecast: "Clear skies expected for the rest of the day".to_string(),
        }
    }
}

/// Routes served by the `weather-function` binary
pub fn weather_router() -> Router {
    Router::new()
        .route("/api/weather", get(get_weather))
        .route("/api/health", get(health))
}

/// GET /api/weather?location=<l>
pub async fn get_weather(Query(query): Query<WeatherQuery>) -> Json<WeatherReport> {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    info!(location = %location, "Weather request");
    Json(WeatherReport::fixed(location))
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Weather Function"
    }))
}
