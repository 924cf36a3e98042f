//! Azure OpenAI HTTP Client

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::AzureConfig;
use crate::error::{Error, Result};
use crate::resilience::CircuitBreaker;

use super::types::*;

/// Azure OpenAI chat completion client
///
/// Every call goes through a shared [`CircuitBreaker`]; while the breaker is
/// open the endpoint is not contacted and [`Error::CircuitOpen`] is returned.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
    breaker: Arc<CircuitBreaker>,
}

impl AzureOpenAiClient {
    /// Create a new client
    pub fn new(config: &AzureConfig) -> Result<Self> {
        Self::with_circuit_breaker(config, Arc::new(CircuitBreaker::default()))
    }

    /// Create with an explicit circuit breaker
    pub fn with_circuit_breaker(config: &AzureConfig, breaker: Arc<CircuitBreaker>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
            breaker,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    /// Send a chat completion request and return the first choice's text
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<String> {
        if !self.breaker.allow_request() {
            warn!("Circuit breaker open, skipping Azure OpenAI call");
            return Err(Error::CircuitOpen);
        }

        match self.send(request).await {
            Ok(text) => {
                self.breaker.record_success();
                Ok(text)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<String> {
        let url = self.completions_url();
        debug!("Sending request to Azure OpenAI: deployment={}", self.deployment);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Azure OpenAI error: {} - {}", status, body);
            return Err(Error::AzureOpenAi(format!("{}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::AzureOpenAi(format!("Failed to parse response: {}", e)))?;

        info!(
            "Azure OpenAI response: finish_reason={:?}, tokens={}",
            parsed.choices.first().and_then(|c| c.finish_reason.as_deref()),
            parsed.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0)
        );

        parsed
            .first_text()
            .map(str::to_string)
            .ok_or(Error::EmptyResponse)
    }

    /// Create a chat request builder
    pub fn request_builder(&self) -> ChatRequestBuilder {
        ChatRequestBuilder::new()
    }

    /// Get the deployment name
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Shared circuit breaker
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}
