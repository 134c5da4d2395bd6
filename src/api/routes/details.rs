//! Metadata handlers: video details and thumbnails.

use super::{DetailsQuery, ThumbnailQuery, flag, require_url};
use crate::api::AppState;
use crate::error::{ApiError, Error, Result};
use crate::metadata::{FetchedMetadata, MetadataFetcher};
use crate::tools::Tool;
use crate::types::{Failure, ResultStatus, ToolVersions, VideoMetadata};
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Response for GET /details
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailsResponse {
    /// Always `success`
    pub status: ResultStatus,
    /// The URL that was looked up
    pub url: String,
    /// Versions of yt-dlp and ffmpeg
    #[schema(value_type = Object)]
    pub tool_versions: ToolVersions,
    /// Curated metadata
    pub data: VideoMetadata,
    /// yt-dlp's full info JSON (only with `raw=true`)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub raw: Option<serde_json::Value>,
}

/// Response for GET /thumbnail without `download=true`
#[derive(Debug, Serialize, ToSchema)]
pub struct ThumbnailResponse {
    /// Always `success`
    pub status: ResultStatus,
    /// Human-readable summary
    pub message: String,
    /// Thumbnail image URL
    pub thumbnail: String,
    /// Version of yt-dlp
    #[schema(value_type = Object)]
    pub tool_versions: ToolVersions,
}

/// Validate, check tools, and run the metadata query
///
/// Tool versions are returned alongside any failure that happens after they
/// were queried, so error bodies can include them.
async fn lookup(
    state: &AppState,
    url: &str,
    tools: &[Tool],
) -> std::result::Result<(FetchedMetadata, ToolVersions), (Error, Option<ToolVersions>)> {
    if !crate::validation::is_valid_youtube_url(url) {
        return Err((
            Error::InvalidInput("Invalid YouTube URL provided.".into()),
            None,
        ));
    }

    let checker = state.orchestrator.tools();
    let ytdlp = checker
        .ensure_present(tools)
        .and_then(|()| checker.path(Tool::YtDlp))
        .map_err(|e| (e, None))?;
    let versions = checker.versions(tools).await;

    let fetcher = MetadataFetcher::new(ytdlp, state.config.metadata.clone());
    match fetcher.fetch_with_raw(url).await {
        Ok(fetched) => Ok((fetched, versions)),
        Err(e) => Err((e, Some(versions))),
    }
}

fn failure_response(url: &str, error: Error, versions: Option<ToolVersions>) -> Response {
    tracing::warn!(url, error = %error, "metadata lookup failed");
    Failure::from_error(&error, versions).into_response()
}

/// GET /details - Video metadata
#[utoipa::path(
    get,
    path = "/details",
    tag = "metadata",
    params(DetailsQuery),
    responses(
        (status = 200, description = "Video metadata", body = DetailsResponse),
        (status = 400, description = "Missing/invalid URL, missing tool or failed lookup", body = crate::types::DownloadResult),
        (status = 500, description = "Internal server error", body = crate::types::DownloadResult)
    )
)]
pub async fn details(State(state): State<AppState>, Query(query): Query<DetailsQuery>) -> Response {
    let url = match require_url(query.url) {
        Ok(url) => url,
        Err(response) => return response,
    };

    match lookup(&state, &url, &Tool::DOWNLOAD).await {
        Ok((fetched, tool_versions)) => {
            let response = DetailsResponse {
                status: ResultStatus::Success,
                url,
                tool_versions,
                data: fetched.metadata,
                raw: flag(query.raw.as_deref()).then_some(fetched.raw),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err((error, versions)) => failure_response(&url, error, versions),
    }
}

/// GET /thumbnail - Thumbnail URL, or the image itself with `download=true`
#[utoipa::path(
    get,
    path = "/thumbnail",
    tag = "metadata",
    params(ThumbnailQuery),
    responses(
        (status = 200, description = "Thumbnail URL (JSON) or image bytes", body = ThumbnailResponse),
        (status = 400, description = "Missing/invalid URL, missing tool, failed lookup or no thumbnail", body = crate::types::DownloadResult),
        (status = 502, description = "Thumbnail host could not be reached", body = ApiError)
    )
)]
pub async fn thumbnail(
    State(state): State<AppState>,
    Query(query): Query<ThumbnailQuery>,
) -> Response {
    let url = match require_url(query.url) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let (fetched, tool_versions) = match lookup(&state, &url, &[Tool::YtDlp]).await {
        Ok(found) => found,
        Err((error, versions)) => return failure_response(&url, error, versions),
    };

    let Some(thumbnail) = fetched.metadata.thumbnail else {
        let failure = Failure::from_error(
            &Error::InvalidInput("Thumbnail not found in video metadata.".into()),
            Some(tool_versions),
        );
        return failure.into_response();
    };

    if !flag(query.download.as_deref()) {
        let response = ThumbnailResponse {
            status: ResultStatus::Success,
            message: "Thumbnail URL retrieved successfully.".into(),
            thumbnail,
            tool_versions,
        };
        return (StatusCode::OK, Json(response)).into_response();
    }

    match fetch_image(&state, &thumbnail).await {
        Ok((content_type, bytes)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) => {
            tracing::warn!(url = %url, thumbnail = %thumbnail, error = %e, "thumbnail fetch failed");
            let status = StatusCode::from_u16(crate::error::ToHttpStatus::status_code(&e))
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let body = ApiError::with_details(
                format!("Failed to download thumbnail image: {}", e),
                serde_json::json!({ "thumbnail": thumbnail }),
            );
            (status, Json(body)).into_response()
        }
    }
}

async fn fetch_image(state: &AppState, url: &str) -> Result<(String, axum::body::Bytes)> {
    let response = state
        .http
        .get(url)
        .timeout(state.config.metadata.thumbnail_timeout)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = response.bytes().await?;

    Ok((content_type, bytes))
}
