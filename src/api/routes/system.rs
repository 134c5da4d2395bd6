//! System handlers: home, health, OpenAPI.

use crate::api::AppState;
use crate::types::ToolStatus;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Response for GET /health
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` when the server answers
    pub status: String,
    /// Fixed liveness note
    pub uptime: String,
    /// Crate version
    pub version: String,
    /// Presence and version of yt-dlp, ffmpeg and ffprobe
    pub tools: BTreeMap<String, ToolStatus>,
    /// Whether every tool was found
    pub all_tools_present: bool,
}

/// GET / - Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Welcome message")
    )
)]
pub async fn home() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the yt-relay downloader",
        "status": "OK"
    }))
}

/// GET /health - Health check
///
/// Always 200; a missing tool shows up as `all_tools_present: false`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up, with a tool report", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let tools = state.orchestrator.tools().status_report().await;
    let all_tools_present = tools.values().all(|t| t.present);

    Json(HealthResponse {
        status: "healthy".into(),
        uptime: "running smoothly".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        tools,
        all_tools_present,
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
