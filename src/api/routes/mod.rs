//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Synchronous and streamed downloads
//! - [`details`] - Metadata and thumbnail lookups
//! - [`system`] - Home, health, OpenAPI

use crate::error::ApiError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

mod details;
mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use details::*;
pub use downloads::*;
pub use system::*;

// ============================================================================
// Query Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /download
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Video URL (required)
    pub url: Option<String>,
    /// `true` to receive live progress as Server-Sent Events
    pub stream: Option<String>,
    /// `true` to receive the video itself (raw bytes, or base64 when streaming)
    pub binary: Option<String>,
}

/// Query parameters for GET /details
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DetailsQuery {
    /// Video URL (required)
    pub url: Option<String>,
    /// `true` to include yt-dlp's full info JSON
    pub raw: Option<String>,
}

/// Query parameters for GET /thumbnail
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThumbnailQuery {
    /// Video URL (required)
    pub url: Option<String>,
    /// `true` to receive the image instead of its URL
    pub download: Option<String>,
}

/// Interpret a boolean query flag: only `true` (any case) is true
pub(crate) fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// The `url` parameter, or the 400 response for a missing one
pub(crate) fn require_url(url: Option<String>) -> Result<String, Response> {
    match url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::missing_param("url")),
        )
            .into_response()),
    }
}
