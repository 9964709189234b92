use thiserror::Error;

use crate::agents::config::{ChatConfig, LlmProviderConfig, WeatherConfig};
use crate::config::{ServerSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section, collecting all errors rather than stopping at the first
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(&settings.server, &mut errors);
        Self::validate_llm(&settings.llm, &mut errors);
        Self::validate_chat(&settings.chat, &mut errors);
        Self::validate_weather(&settings.weather, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings, errors: &mut Vec<ValidationError>) {
        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::invalid(
                "server.port",
                "Port must be greater than 0",
            ));
        }
    }

    fn validate_llm(llm: &LlmProviderConfig, errors: &mut Vec<ValidationError>) {
        if llm.base_url.trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "llm.base_url (AZURE_AI_PROJECT_ENDPOINT)".to_string(),
            ));
        }

        if llm.model.trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "llm.model (AZURE_AI_MODEL_DEPLOYMENT)".to_string(),
            ));
        }

        if llm.timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                "llm.timeout_seconds",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_chat(chat: &ChatConfig, errors: &mut Vec<ValidationError>) {
        if !(0.0..=2.0).contains(&chat.temperature) {
            errors.push(ValidationError::invalid(
                "chat.temperature",
                format!("{} is outside [0, 2]", chat.temperature),
            ));
        }

        if !(chat.top_p > 0.0 && chat.top_p <= 1.0) {
            errors.push(ValidationError::invalid(
                "chat.top_p",
                format!("{} is outside (0, 1]", chat.top_p),
            ));
        }

        if chat.max_tokens == 0 {
            errors.push(ValidationError::invalid(
                "chat.max_tokens",
                "Must be greater than 0",
            ));
        }

        if chat.max_tool_rounds == 0 {
            errors.push(ValidationError::invalid(
                "chat.max_tool_rounds",
                "Must be greater than 0",
            ));
        }

        if chat.handoff.max_handoffs == 0 {
            errors.push(ValidationError::invalid(
                "chat.handoff.max_handoffs",
                "Must be greater than 0",
            ));
        }

        if chat.handoff.result_timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                "chat.handoff.result_timeout_seconds",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_weather(weather: &WeatherConfig, errors: &mut Vec<ValidationError>) {
        match reqwest::Url::parse(&weather.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::invalid(
                "weather.base_url",
                format!("Unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::invalid("weather.base_url", e.to_string())),
        }

        if weather.timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                "weather.timeout_seconds",
                "Timeout must be greater than 0",
            ));
        }
    }
}
