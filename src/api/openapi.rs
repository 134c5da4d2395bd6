//! OpenAPI documentation and schema generation
//!
//! The OpenAPI document is generated at compile time with utoipa and served at
//! `/openapi.json` (plus `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the yt-relay REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "yt-relay REST API",
        version = "0.1.0",
        description = "HTTP front-end for yt-dlp: synchronous and streamed downloads, video metadata and thumbnails",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::download,

        // Metadata
        crate::api::routes::details,
        crate::api::routes::thumbnail,

        // System
        crate::api::routes::home,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DownloadResult,
        crate::types::FileInfo,
        crate::types::VideoMetadata,
        crate::types::FormatSummary,
        crate::types::ResultStatus,
        crate::types::StreamKind,
        crate::types::Phase,
        crate::types::ToolStatus,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::ToolsConfig,
        crate::config::MetadataConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // Response types from routes
        crate::api::routes::DetailsResponse,
        crate::api::routes::ThumbnailResponse,
        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "downloads", description = "Downloads - Fetch a video as JSON, raw bytes, or a live event stream"),
        (name = "metadata", description = "Metadata - Video details and thumbnails without downloading"),
        (name = "system", description = "System endpoints - Home, health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
