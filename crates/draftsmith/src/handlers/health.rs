use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use crate::build_info::{SERVER_NAME, VERSION};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    timestamp: String,
}

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

pub async fn readyz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server: SERVER_NAME,
        version: VERSION,
        timestamp: Utc::now().to_rfc3339(),
    })
}
