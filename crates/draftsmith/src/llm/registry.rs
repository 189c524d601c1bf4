//! Ordered provider chain with one-attempt-each failover.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, warn};

use super::bedrock::BedrockProvider;
use super::error::LLMError;
use super::openai::OpenAICompatibleProvider;
use super::provider::LLMProvider;
use super::types::{ChatRequest, ProviderId, ProviderResult};
use crate::config::{ProviderCredentials, ProvidersConfig};

/// Providers in priority order. Immutable once built and shared read-only
/// across requests.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LLMProvider>>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl ProviderChain {
    /// A chain with no providers; every invocation fails immediately.
    pub fn empty(settings: &ProvidersConfig) -> Self {
        Self {
            providers: Vec::new(),
            timeout: Duration::from_secs(settings.timeout_seconds),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// Build the chain from credentials read at startup.
    ///
    /// Priority is fixed: the cloud gateway first, the direct API second.
    pub fn from_credentials(credentials: &ProviderCredentials, settings: &ProvidersConfig) -> Self {
        let mut chain = Self::empty(settings);
        let client = Client::builder()
            .timeout(chain.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                Client::new()
            });

        if let Some(ref token) = credentials.bedrock_token {
            match settings.bedrock.endpoint(&credentials.aws_region) {
                Ok(endpoint) => {
                    let provider = BedrockProvider::new(
                        client.clone(),
                        endpoint,
                        &settings.bedrock.model,
                        token.clone(),
                    );
                    chain.push(Arc::new(provider));
                    info!(
                        region = %credentials.aws_region,
                        model = %settings.bedrock.model,
                        "Registered Bedrock provider"
                    );
                }
                Err(e) => warn!(error = %e, "Invalid Bedrock endpoint, provider skipped"),
            }
        }

        if let Some(ref api_key) = credentials.openai_api_key {
            let provider = OpenAICompatibleProvider::new(
                client,
                settings.openai.base_url.clone(),
                Some(api_key.clone()),
                settings.openai.model.clone(),
            );
            chain.push(Arc::new(provider));
            info!(model = %settings.openai.model, "Registered OpenAI provider");
        }

        if chain.is_empty() {
            warn!(
                "No LLM providers configured, every generation will fall back. \
                Set AWS_BEARER_TOKEN_BEDROCK or OPENAI_API_KEY."
            );
        }

        chain
    }

    /// Append a provider at the lowest priority.
    pub fn push(&mut self, provider: Arc<dyn LLMProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Configured provider ids in priority order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Send `prompt` to each provider in turn until one answers.
    pub async fn invoke(&self, prompt: &str) -> Result<ProviderResult, LLMError> {
        for provider in &self.providers {
            let id = provider.id();
            let request = ChatRequest::user(prompt).with_limits(self.temperature, self.max_tokens);
            let started = Instant::now();

            let outcome = match tokio::time::timeout(self.timeout, provider.chat(request)).await {
                Ok(result) => result,
                Err(_) => Err(LLMError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(raw_text) => {
                    info!(
                        provider = %id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        chars = raw_text.chars().count(),
                        "Provider call succeeded"
                    );
                    return Ok(ProviderResult {
                        raw_text,
                        provider_id: id,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = %id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "Provider call failed, trying next"
                    );
                }
            }
        }

        Err(LLMError::NoProviderAvailable {
            attempted: self.providers.len(),
        })
    }
}
