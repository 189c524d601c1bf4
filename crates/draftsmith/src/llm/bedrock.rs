//! Bedrock runtime provider (the cloud-gateway backend).
//!
//! Speaks the Anthropic messages format through `POST /model/{id}/invoke`,
//! authenticated with a Bedrock API key sent as a bearer token.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::error::{LLMError, check_response_error};
use super::provider::LLMProvider;
use super::types::{ChatRequest, ProviderId, Role};

/// Bedrock provider invoking Anthropic models.
pub struct BedrockProvider {
    client: Client,
    invoke_url: Url,
    token: String,
}

impl BedrockProvider {
    pub const ANTHROPIC_VERSION: &'static str = "bedrock-2023-05-31";
    const DEFAULT_MAX_TOKENS: u32 = 4000;

    /// `endpoint` is the runtime base, e.g. `https://bedrock-runtime.us-west-2.amazonaws.com`.
    #[must_use]
    pub fn new(client: Client, endpoint: Url, model_id: &str, token: String) -> Self {
        Self {
            client,
            invoke_url: invoke_url(endpoint, model_id),
            token,
        }
    }

    /// Default runtime endpoint for a region.
    pub fn regional_endpoint(region: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://bedrock-runtime.{region}.amazonaws.com"))
    }
}

/// Append `model/{id}/invoke`, percent-encoding the id (ARNs contain `/`).
fn invoke_url(mut endpoint: Url, model_id: &str) -> Url {
    if let Ok(mut segments) = endpoint.path_segments_mut() {
        segments.pop_if_empty().extend(["model", model_id, "invoke"]);
    }
    endpoint
}

#[async_trait]
impl LLMProvider for BedrockProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Bedrock
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LLMError> {
        let body = to_request(&request);

        let response = self
            .client
            .post(self.invoke_url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;

        if let Some(err) = check_response_error(&response) {
            return Err(err);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LLMError::Api { status, message });
        }

        let invoke_response: Response = response.json().await?;
        from_response(invoke_response)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(serde::Serialize)]
struct Request {
    anthropic_version: &'static str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(serde::Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Deserialize)]
struct Response {
    content: Vec<ResponseContent>,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

fn to_request(request: &ChatRequest) -> Request {
    let mut system: Option<String> = None;
    let mut messages = Vec::new();

    for msg in &request.messages {
        match msg.role {
            Role::System => {
                // Anthropic wants system as a separate field
                system = Some(match system {
                    Some(existing) => format!("{existing}\n\n{}", msg.content),
                    None => msg.content.clone(),
                });
            }
            Role::User => messages.push(RequestMessage {
                role: msg.role.as_str(),
                content: msg.content.clone(),
            }),
        }
    }

    Request {
        anthropic_version: BedrockProvider::ANTHROPIC_VERSION,
        max_tokens: request
            .max_tokens
            .unwrap_or(BedrockProvider::DEFAULT_MAX_TOKENS),
        system,
        messages,
        temperature: request.temperature,
    }
}

fn from_response(response: Response) -> Result<String, LLMError> {
    let text = response
        .content
        .into_iter()
        .filter(|c| c.content_type == "text")
        .map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(LLMError::EmptyResponse);
    }
    Ok(text)
}
