//! OpenAI-compatible LLM provider.
//!
//! Works with OpenAI and any API that mirrors its `/chat/completions` route.

use async_trait::async_trait;
use reqwest::Client;

use super::error::{LLMError, check_response_error};
use super::provider::LLMProvider;
use super::types::{ChatRequest, Message, ProviderId};

/// OpenAI-compatible provider (the direct-API backend).
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAICompatibleProvider {
    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAI
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = to_request(&self.model, request);

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.json(&body).send().await?;

        if let Some(err) = check_response_error(&response) {
            return Err(err);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LLMError::Api { status, message });
        }

        let completion: Response = response.json().await?;
        reply_text(completion)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(serde::Serialize)]
struct Request {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(serde::Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn to_request(model: &str, request: ChatRequest) -> Request {
    Request {
        model: model.to_string(),
        messages: request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn reply_text(response: Response) -> Result<String, LLMError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LLMError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_model_and_limits() {
        let request = ChatRequest::user("hello").with_limits(0.7, 4000);
        let body = serde_json::to_value(to_request("gpt-4.1", request)).unwrap();
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 4000);
    }

    #[test]
    fn reply_text_takes_first_choice() {
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
            ]
        }"#;
        let response: Response = serde_json::from_str(json).unwrap();
        assert_eq!(reply_text(response).unwrap(), "first");
    }

    #[test]
    fn reply_text_rejects_missing_content() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: Response = serde_json::from_str(json).unwrap();
        assert!(matches!(reply_text(response), Err(LLMError::EmptyResponse)));

        let response: Response = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(reply_text(response), Err(LLMError::EmptyResponse)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAICompatibleProvider::new(
            Client::new(),
            "https://api.openai.com/v1/".to_string(),
            None,
            "gpt-4.1".to_string(),
        );
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }
}
