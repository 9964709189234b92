//! Azure OpenAI LLM Provider with streaming support

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    openai::OpenAiProvider, Authenticator, CompletionRequest, CompletionResponse, LlmProvider,
    LlmStream,
};
use crate::agents::config::LlmProviderConfig;
use crate::agents::error::{LlmError, LlmResult};

/// Azure OpenAI LLM Provider
/// Uses the same API format as OpenAI but with Azure-specific endpoints
pub struct AzureOpenAiProvider {
    inner: OpenAiProvider,
}

impl AzureOpenAiProvider {
    /// Create a new Azure OpenAI provider from configuration.
    ///
    /// `config.model` is the deployment name and `config.base_url` the resource
    /// endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub fn new(config: &LlmProviderConfig, auth: Arc<dyn Authenticator>) -> LlmResult<Self> {
        let endpoint = config.base_url.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(LlmError::InvalidRequest(
                "Azure OpenAI requires an endpoint (e.g., https://your-resource.openai.azure.com)"
                    .to_string(),
            ));
        }

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint, config.model, config.api_version
        );

        let inner = OpenAiProvider::with_url("azure-openai", url, config, auth)?;
        Ok(Self { inner })
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.inner.complete(request).await
    }

    fn complete_stream(&self, request: CompletionRequest) -> LlmStream {
        self.inner.complete_stream(request)
    }
}
