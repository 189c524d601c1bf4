//! LLM provider trait.

use async_trait::async_trait;

use super::error::LLMError;
use super::types::{ChatRequest, ProviderId};

/// Trait for LLM backends with different API formats.
///
/// Implementations make exactly one attempt per call; failover between
/// backends is the job of [`ProviderChain`](super::ProviderChain).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Which backend this is.
    fn id(&self) -> ProviderId;

    /// Make a completion request and return the reply text.
    async fn chat(&self, request: ChatRequest) -> Result<String, LLMError>;
}
