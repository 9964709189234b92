//! Credentials attached to model provider requests

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::sync::Arc;

use crate::agents::config::{LlmProviderConfig, LlmProviderType};
use crate::agents::error::{LlmError, LlmResult};

/// Produces the header that authorizes one provider request
pub trait Authenticator: Send + Sync {
    /// Header name and value
    fn header(&self) -> (&'static str, String);
}

/// Static API key
pub struct ApiKeyAuth {
    key: SecretString,
    style: KeyStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStyle {
    /// `api-key: <key>`
    Azure,
    /// `Authorization: Bearer <key>`
    Bearer,
}

impl ApiKeyAuth {
    /// Key sent in the Azure `api-key` header
    pub fn azure(key: impl Into<String>) -> Self {
        Self {
            key: SecretString::from(key.into()),
            style: KeyStyle::Azure,
        }
    }

    /// Key sent as an OpenAI bearer token
    pub fn openai(key: impl Into<String>) -> Self {
        Self {
            key: SecretString::from(key.into()),
            style: KeyStyle::Bearer,
        }
    }
}

impl Authenticator for ApiKeyAuth {
    fn header(&self) -> (&'static str, String) {
        match self.style {
            KeyStyle::Azure => ("api-key", self.key.expose_secret().to_string()),
            KeyStyle::Bearer => (
                "Authorization",
                format!("Bearer {}", self.key.expose_secret()),
            ),
        }
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth").field("style", &self.style).finish_non_exhaustive()
    }
}

/// Pre-acquired bearer token (e.g. an Entra ID access token)
pub struct BearerTokenAuth {
    token: SecretString,
}

impl BearerTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl Authenticator for BearerTokenAuth {
    fn header(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token.expose_secret()))
    }
}

/// Pick the authenticator for `config`: the API key wins, the bearer token is
/// the fallback, and having neither is an authentication error.
pub fn authenticator_from_env(config: &LlmProviderConfig) -> LlmResult<Arc<dyn Authenticator>> {
    authenticator_from(config, |name| env::var(name).ok())
}

fn authenticator_from(
    config: &LlmProviderConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> LlmResult<Arc<dyn Authenticator>> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(&config.api_key_env) {
        let auth = match config.provider {
            LlmProviderType::Azure => ApiKeyAuth::azure(key),
            LlmProviderType::OpenAI => ApiKeyAuth::openai(key),
        };
        return Ok(Arc::new(auth));
    }

    if let Some(token) = non_empty(&config.token_env) {
        return Ok(Arc::new(BearerTokenAuth::new(token)));
    }

    Err(LlmError::Authentication(format!(
        "Neither {} nor {} is set",
        config.api_key_env, config.token_env
    )))
}
