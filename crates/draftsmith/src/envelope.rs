//! The response envelope: the only shape that leaves a generation call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::document::StructuredDraft;
use crate::llm::ProviderId;
use crate::proposal::ModificationProposal;
use crate::request::TargetKind;

/// Reported as `providerUsed` when no provider produced the payload.
pub const NO_PROVIDER: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Generated,
    Fallback,
    Error,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generated => "generated",
            Mode::Fallback => "fallback",
            Mode::Error => "error",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPayload {
    pub diagram_text: String,
    pub supplement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockupPayload {
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Diagram(DiagramPayload),
    Draft(StructuredDraft),
    Chat(ChatPayload),
    Mockup(MockupPayload),
    Proposal(ModificationProposal),
}

impl From<DiagramPayload> for Payload {
    fn from(payload: DiagramPayload) -> Self {
        Payload::Diagram(payload)
    }
}

impl From<StructuredDraft> for Payload {
    fn from(draft: StructuredDraft) -> Self {
        Payload::Draft(draft)
    }
}

impl From<ChatPayload> for Payload {
    fn from(payload: ChatPayload) -> Self {
        Payload::Chat(payload)
    }
}

impl From<MockupPayload> for Payload {
    fn from(payload: MockupPayload) -> Self {
        Payload::Mockup(payload)
    }
}

impl From<ModificationProposal> for Payload {
    fn from(proposal: ModificationProposal) -> Self {
        Payload::Proposal(proposal)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub timestamp_utc: DateTime<Utc>,
    pub prompt_echo: String,
    pub mode: Mode,
    #[serde(serialize_with = "serialize_provider")]
    pub provider_used: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_kind: Option<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn serialize_provider<S>(provider: &Option<ProviderId>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(provider.map_or(NO_PROVIDER, |id| id.as_str()))
}

/// Payload plus metadata.
///
/// The constructors keep `providerUsed` consistent with the mode: only
/// [`ResponseEnvelope::generated`] names a provider.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub payload: Payload,
    pub metadata: Metadata,
}

impl ResponseEnvelope {
    pub fn generated(payload: impl Into<Payload>, prompt: &str, provider: ProviderId) -> Self {
        Self::build(payload.into(), prompt, Mode::Generated, Some(provider), None)
    }

    /// Canned content after a provider or extraction failure.
    pub fn fallback(payload: impl Into<Payload>, prompt: &str, reason: impl fmt::Display) -> Self {
        Self::build(
            payload.into(),
            prompt,
            Mode::Fallback,
            None,
            Some(reason.to_string()),
        )
    }

    /// Canned content after an unexpected fault; carries the message verbatim.
    pub fn error(payload: impl Into<Payload>, prompt: &str, message: impl fmt::Display) -> Self {
        Self::build(
            payload.into(),
            prompt,
            Mode::Error,
            None,
            Some(message.to_string()),
        )
    }

    #[must_use]
    pub fn with_target_kind(mut self, kind: Option<TargetKind>) -> Self {
        self.metadata.target_kind = kind;
        self
    }

    pub fn mode(&self) -> Mode {
        self.metadata.mode
    }

    fn build(
        payload: Payload,
        prompt: &str,
        mode: Mode,
        provider_used: Option<ProviderId>,
        error: Option<String>,
    ) -> Self {
        Self {
            payload,
            metadata: Metadata {
                timestamp_utc: Utc::now(),
                prompt_echo: prompt.to_string(),
                mode,
                provider_used,
                target_kind: None,
                error,
            },
        }
    }
}
