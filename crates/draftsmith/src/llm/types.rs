//! Common types for LLM completions.

use std::fmt;

use serde::Serialize;

/// Identifies a configured backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Cloud LLM gateway (Bedrock runtime).
    Bedrock,
    /// Direct OpenAI-compatible API.
    OpenAI,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Bedrock => "bedrock",
            ProviderId::OpenAI => "openai",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completion request in provider-neutral form.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// A single-turn request carrying one user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: Role::User,
                content: content.into(),
            }],
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// Raw text returned by a provider, tagged with who produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub raw_text: String,
    pub provider_id: ProviderId,
}
