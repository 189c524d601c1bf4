//! Method dispatch for RPC calls.
//!
//! Shared by the HTTP transport and the in-process `call` command. Each
//! generation method is a thin composition over [`GenerationService`];
//! nothing here holds per-request state.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use ulid::Ulid;

use draftsmith_protocol::{RpcError, RpcRequest, RpcResponse, error_codes, methods};

use crate::build_info::{DESCRIPTION, SERVER_NAME, VERSION};
use crate::envelope::ResponseEnvelope;
use crate::fallback;
use crate::prompt::PromptKind;
use crate::request::{DocumentSnapshot, GenerationRequest, TargetKind};
use crate::service::GenerationService;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("method not found: {0}")]
    UnknownMethod(String),

    #[error("invalid params: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    pub fn to_rpc(&self) -> RpcError {
        let code = match self {
            RouterError::UnknownMethod(_) => error_codes::METHOD_NOT_FOUND,
            RouterError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            RouterError::Internal(_) => error_codes::INTERNAL_ERROR,
        };
        RpcError::new(code, self.to_string())
    }
}

// ============================================================================
// Methods and params
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Generate(PromptKind),
    Ping,
    ServerInfo,
}

impl FromStr for Method {
    type Err = RouterError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            methods::GENERATE_DATA_MODEL => Method::Generate(PromptKind::Diagram),
            methods::GENERATE_DESIGN_DRAFT => Method::Generate(PromptKind::Draft),
            methods::GENERATE_CHAT_RESPONSE => Method::Generate(PromptKind::Chat),
            methods::GENERATE_MOCKUP_HTML => Method::Generate(PromptKind::Mockup),
            methods::GENERATE_MODIFICATION_PROPOSAL => Method::Generate(PromptKind::Modification),
            methods::PING => Method::Ping,
            methods::GET_SERVER_INFO => Method::ServerInfo,
            other => return Err(RouterError::UnknownMethod(other.to_string())),
        })
    }
}

type Object = Map<String, Value>;

#[derive(Deserialize)]
struct DataModelParams {
    prompt: String,
    #[serde(default)]
    project_context: Option<Object>,
    #[serde(default)]
    references: Option<Vec<String>>,
    #[serde(default)]
    current_mermaid_code: Option<String>,
}

#[derive(Deserialize)]
struct DesignDraftParams {
    prompt: String,
    #[serde(default)]
    context: Option<Object>,
    #[serde(default)]
    target_type: Option<String>,
    #[serde(default)]
    project_context: Option<Object>,
    #[serde(default)]
    references: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChatParams {
    user_message: String,
    #[serde(default)]
    context: Option<Object>,
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    project_context: Option<Object>,
}

#[derive(Deserialize)]
struct MockupParams {
    prompt: String,
    #[serde(default)]
    context: Option<Object>,
    #[serde(default)]
    project_context: Option<Object>,
}

#[derive(Deserialize)]
struct ModificationParams {
    #[serde(alias = "change_description")]
    user_prompt: String,
    #[serde(default)]
    context: Option<Object>,
    #[serde(default)]
    project_context: Option<Object>,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RouterError> {
    Ok(serde_json::from_value(params)?)
}

/// Unknown kinds are dropped so the draft prompt falls back to a domain hint.
fn target_kind(raw: Option<&str>) -> Option<TargetKind> {
    let raw = raw?;
    match raw.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            debug!(error = %e, "Ignoring target kind");
            None
        }
    }
}

fn generation_request(kind: PromptKind, params: Value) -> Result<GenerationRequest, RouterError> {
    let request = match kind {
        PromptKind::Diagram => {
            let p: DataModelParams = parse_params(params)?;
            let state = p.current_mermaid_code.map(|code| {
                let mut state = Object::new();
                state.insert(DocumentSnapshot::DIAGRAM_KEY.to_string(), Value::String(code));
                state
            });
            GenerationRequest::new(p.prompt)
                .with_project_context(p.project_context)
                .with_document_state(state)
                .with_references(p.references.unwrap_or_default())
        }
        PromptKind::Draft => {
            let p: DesignDraftParams = parse_params(params)?;
            GenerationRequest::new(p.prompt)
                .with_target_kind(target_kind(p.target_type.as_deref()))
                .with_project_context(p.project_context)
                .with_document_state(p.context)
                .with_references(p.references.unwrap_or_default())
        }
        PromptKind::Chat => {
            let p: ChatParams = parse_params(params)?;
            GenerationRequest::new(p.user_message)
                .with_target_kind(target_kind(p.document_type.as_deref()))
                .with_project_context(p.project_context)
                .with_document_state(p.context)
        }
        PromptKind::Mockup => {
            let p: MockupParams = parse_params(params)?;
            GenerationRequest::new(p.prompt)
                .with_project_context(p.project_context)
                .with_document_state(p.context)
        }
        PromptKind::Modification => {
            let p: ModificationParams = parse_params(params)?;
            GenerationRequest::new(p.user_prompt)
                .with_project_context(p.project_context)
                .with_document_state(p.context)
        }
    };
    Ok(request)
}

// ============================================================================
// RpcRouter
// ============================================================================

#[derive(Clone)]
pub struct RpcRouter {
    service: GenerationService,
}

impl RpcRouter {
    pub fn new(service: GenerationService) -> Self {
        Self { service }
    }

    /// Handle one call. Always yields a well-formed response.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let request_id = Ulid::new();
        let span = info_span!("rpc", request_id = %request_id, method = %request.method);

        async move {
            let started = Instant::now();
            let RpcRequest { method, params, id } = request;

            match self.dispatch(&method, params).await {
                Ok(result) => {
                    let mode = result
                        .pointer("/metadata/mode")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("-");
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        mode,
                        "Handled call"
                    );
                    RpcResponse::success(result, id)
                }
                Err(e) => {
                    warn!(error = %e, "Rejected call");
                    RpcResponse::failure(e.to_rpc(), id)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RouterError> {
        match method.parse::<Method>()? {
            Method::Ping => Ok(self.ping()),
            Method::ServerInfo => Ok(self.server_info()),
            Method::Generate(kind) => {
                let request = generation_request(kind, params)?;
                let envelope = self.generate(kind, &request).await;
                serde_json::to_value(&envelope)
                    .or_else(|e| unserializable_envelope(kind, &request.prompt, e))
            }
        }
    }

    /// Run one pipeline; a panic inside it becomes a `mode=error` envelope.
    async fn generate(&self, kind: PromptKind, request: &GenerationRequest) -> ResponseEnvelope {
        let service = &self.service;
        let pipeline = async {
            match kind {
                PromptKind::Diagram => service.generate_data_model(request).await,
                PromptKind::Draft => service.generate_design_draft(request).await,
                PromptKind::Chat => service.generate_chat_response(request).await,
                PromptKind::Mockup => service.generate_mockup_html(request).await,
                PromptKind::Modification => service.generate_modification_proposal(request).await,
            }
        };

        match AssertUnwindSafe(pipeline).catch_unwind().await {
            Ok(envelope) => envelope,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(kind = ?kind, error = %message, "Generation panicked");
                fallback::error(kind, &request.prompt, message)
            }
        }
    }

    fn ping(&self) -> Value {
        json!({
            "status": "ok",
            "message": format!("{SERVER_NAME} is running"),
            "timestamp": Utc::now().to_rfc3339(),
            "server_name": SERVER_NAME,
            "version": VERSION,
        })
    }

    fn server_info(&self) -> Value {
        json!({
            "server_name": SERVER_NAME,
            "version": VERSION,
            "description": DESCRIPTION,
            "available_tools": methods::ALL,
            "providers": self.service.provider_ids(),
            "status": "ready",
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

/// Replace an envelope that failed to serialize with the `mode=error` one.
fn unserializable_envelope(
    kind: PromptKind,
    prompt: &str,
    error: serde_json::Error,
) -> Result<Value, RouterError> {
    error!(kind = ?kind, error = %error, "Could not serialize envelope");
    serde_json::to_value(fallback::error(kind, prompt, &error))
        .map_err(|e| RouterError::Internal(e.to_string()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_diagram;
    use crate::llm::ProviderId;
    use crate::llm::testing::{MockProvider, Script, chain_of};

    fn router_with(providers: Vec<std::sync::Arc<MockProvider>>) -> RpcRouter {
        RpcRouter::new(GenerationService::new(chain_of(providers)))
    }

    fn call(method: &str, params: Value) -> RpcRequest {
        RpcRequest::new(method, params).with_id(7)
    }

    #[tokio::test]
    async fn ping_reports_ok() {
        let response = router_with(Vec::new()).handle(call("ping", Value::Null)).await;
        assert!(!response.is_error());
        assert_eq!(response.id, Some(json!(7)));
        let result = response.result.unwrap();
        assert_eq!(result["status"], "ok");
        assert_eq!(result["server_name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn server_info_lists_tools_and_providers() {
        let router = router_with(vec![MockProvider::replying(ProviderId::Bedrock, "x")]);
        let result = router
            .handle(call("get_server_info", json!({})))
            .await
            .result
            .unwrap();
        assert_eq!(result["status"], "ready");
        assert_eq!(result["available_tools"].as_array().unwrap().len(), methods::ALL.len());
        assert_eq!(result["providers"], json!(["bedrock"]));
    }

    #[tokio::test]
    async fn unknown_method_is_client_error() {
        let response = router_with(Vec::new())
            .handle(call("doesNotExist", json!({})))
            .await;
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
        assert!(error.is_client_error());
        assert!(error.message.contains("doesNotExist"));
        assert_eq!(response.id, Some(json!(7)));
    }

    #[tokio::test]
    async fn missing_params_are_invalid() {
        let router = router_with(Vec::new());
        for params in [Value::Null, json!({}), json!({"prompt": 5})] {
            let response = router.handle(call("generate_data_model", params)).await;
            assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
        }
    }

    #[tokio::test]
    async fn zero_providers_diagram_falls_back() {
        let response = router_with(Vec::new())
            .handle(call("generate_data_model", json!({"prompt": "library system"})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["metadata"]["mode"], "fallback");
        assert_eq!(result["metadata"]["providerUsed"], "none");
        assert_eq!(result["metadata"]["promptEcho"], "library system");

        let diagram = result["payload"]["diagramText"].as_str().unwrap();
        assert_eq!(extract_diagram(diagram).unwrap(), diagram);
    }

    #[tokio::test]
    async fn every_generation_method_answers_without_providers() {
        let router = router_with(Vec::new());
        let calls = [
            (methods::GENERATE_DATA_MODEL, json!({"prompt": "p"})),
            (methods::GENERATE_DESIGN_DRAFT, json!({"prompt": "p", "target_type": "screen"})),
            (methods::GENERATE_CHAT_RESPONSE, json!({"user_message": "p"})),
            (methods::GENERATE_MOCKUP_HTML, json!({"prompt": "p"})),
            (methods::GENERATE_MODIFICATION_PROPOSAL, json!({"change_description": "p"})),
        ];
        for (method, params) in calls {
            let result = router.handle(call(method, params)).await.result.unwrap();
            assert_eq!(result["metadata"]["mode"], "fallback", "{method}");
            assert_eq!(result["metadata"]["promptEcho"], "p", "{method}");
        }
    }

    #[tokio::test]
    async fn current_diagram_reaches_provider() {
        let provider = MockProvider::replying(ProviderId::OpenAI, "```mermaid\nerDiagram\n    A {\n    }\n```");
        let router = router_with(vec![provider.clone()]);
        let params = json!({
            "prompt": "add B",
            "current_mermaid_code": "erDiagram\n    EXISTING_ENTITY {\n    }",
            "references": ["screen-1"]
        });
        let result = router
            .handle(call("generate_data_model", params))
            .await
            .result
            .unwrap();
        assert_eq!(result["metadata"]["mode"], "generated");
        assert_eq!(result["metadata"]["providerUsed"], "openai");

        let prompt = provider.last_prompt().unwrap();
        assert!(prompt.contains("EXISTING_ENTITY"));
        assert!(prompt.contains("screen-1"));
    }

    #[tokio::test]
    async fn draft_reports_target_kind() {
        let router = router_with(Vec::new());
        let result = router
            .handle(call(
                "generate_design_draft",
                json!({"prompt": "p", "target_type": "database"}),
            ))
            .await
            .result
            .unwrap();
        assert_eq!(result["metadata"]["targetKind"], "model");

        let result = router
            .handle(call(
                "generate_design_draft",
                json!({"prompt": "p", "target_type": "ecommerce"}),
            ))
            .await
            .result
            .unwrap();
        assert!(result["metadata"].get("targetKind").is_none());
    }

    #[tokio::test]
    async fn panic_becomes_error_envelope() {
        let router = router_with(vec![MockProvider::new(ProviderId::Bedrock, Script::Panic)]);
        let response = router
            .handle(call("generate_chat_response", json!({"user_message": "hi"})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["metadata"]["mode"], "error");
        assert_eq!(result["metadata"]["providerUsed"], "none");
        assert_eq!(result["metadata"]["error"], "scripted panic");
        assert!(result["payload"]["reply"].is_string());
    }

    #[test]
    fn serialization_failure_becomes_error_envelope() {
        let failure = serde_json::from_str::<Value>("{").unwrap_err();
        let message = failure.to_string();
        let result = unserializable_envelope(PromptKind::Diagram, "shop", failure).unwrap();
        assert_eq!(result["metadata"]["mode"], "error");
        assert_eq!(result["metadata"]["promptEcho"], "shop");
        assert_eq!(result["metadata"]["error"], message);
        assert!(result["payload"]["diagramText"].is_string());
    }

    #[tokio::test]
    async fn generated_call_logs_and_returns_mode() {
        let provider = MockProvider::replying(ProviderId::Bedrock, "Fine as is.");
        let response = router_with(vec![provider])
            .handle(call("generate_chat_response", json!({"user_message": "ok?"})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["metadata"]["mode"], "generated");
        assert_eq!(result["payload"]["reply"], "Fine as is.");
    }
}
