//! Draftsmith RPC protocol types.
//!
//! Every call is a single JSON object `{method, params, id}` and every reply is
//! either `{result, id}` or `{error: {code, message}, id}`. The `id` is echoed
//! back untouched and may be any JSON value (or absent).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound procedure call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A reply to an [`RpcRequest`]. Exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn success(result: Value, id: Option<Value>) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(error: RpcError, id: Option<Value>) -> Self {
        Self {
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Error object carried by a failed [`RpcResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (as opposed to the server).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code,
            error_codes::PARSE_ERROR
                | error_codes::INVALID_REQUEST
                | error_codes::METHOD_NOT_FOUND
                | error_codes::INVALID_PARAMS
        )
    }
}

/// Standard error codes (JSON-RPC numbering).
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Method names understood by the server.
pub mod methods {
    pub const GENERATE_DATA_MODEL: &str = "generate_data_model";
    pub const GENERATE_DESIGN_DRAFT: &str = "generate_design_draft";
    pub const GENERATE_CHAT_RESPONSE: &str = "generate_chat_response";
    pub const GENERATE_MOCKUP_HTML: &str = "generate_mockup_html";
    pub const GENERATE_MODIFICATION_PROPOSAL: &str = "generate_modification_proposal";
    pub const PING: &str = "ping";
    pub const GET_SERVER_INFO: &str = "get_server_info";

    /// All methods, in the order they are advertised by `get_server_info`.
    pub const ALL: &[&str] = &[
        GENERATE_DATA_MODEL,
        GENERATE_DESIGN_DRAFT,
        GENERATE_CHAT_RESPONSE,
        GENERATE_MOCKUP_HTML,
        GENERATE_MODIFICATION_PROPOSAL,
        PING,
        GET_SERVER_INFO,
    ];
}
