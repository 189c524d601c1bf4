//! RPC endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::debug;

use draftsmith_protocol::{RpcError, RpcRequest, RpcResponse, error_codes};

use crate::server::AppState;

/// POST /
///
/// Client faults (bad JSON, unknown method, bad params) answer 400; every
/// other outcome, fallbacks included, answers 200.
pub async fn rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return reject(
                RpcError::new(error_codes::PARSE_ERROR, format!("parse error: {e}")),
                None,
            );
        }
    };

    let id = value.get("id").cloned();
    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return reject(
                RpcError::new(error_codes::INVALID_REQUEST, format!("invalid request: {e}")),
                id,
            );
        }
    };

    let response = state.router.handle(request).await;
    let status = match response.error {
        Some(ref error) if error.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, Json(response)).into_response()
}

fn reject(error: RpcError, id: Option<Value>) -> Response {
    debug!(code = error.code, message = %error.message, "Rejected request body");
    (
        StatusCode::BAD_REQUEST,
        Json(RpcResponse::failure(error, id)),
    )
        .into_response()
}
