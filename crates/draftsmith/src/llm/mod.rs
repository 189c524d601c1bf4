//! LLM provider clients and the failover chain.

mod bedrock;
mod error;
mod openai;
mod provider;
mod registry;
mod types;

pub use bedrock::BedrockProvider;
pub use error::LLMError;
pub use openai::OpenAICompatibleProvider;
pub use provider::LLMProvider;
pub use registry::ProviderChain;
pub use types::{ChatRequest, Message, ProviderId, ProviderResult, Role};

#[cfg(test)]
pub(crate) use registry::testing;
