//! REST API server module
//!
//! Exposes the download pipeline over HTTP: synchronous or SSE-streamed
//! downloads, metadata lookups, thumbnails, health and OpenAPI docs.

use crate::error::ApiError;
use crate::{Config, Result};
use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Response, StatusCode},
    response::IntoResponse,
    routing::get,
};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `GET /download?url=&stream=&binary=` - Download a video (JSON, raw bytes or SSE)
///
/// ## Metadata
/// - `GET /details?url=&raw=` - Video metadata
/// - `GET /thumbnail?url=&download=` - Thumbnail URL or image
///
/// ## System
/// - `GET /` - Welcome message
/// - `GET /health` - Health check with tool report
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// The older `/yt_download`, `/yt_details` and `/yt_thumbnail` paths are kept
/// as aliases. Anything else is a JSON 404.
pub fn create_router(config: Arc<Config>) -> Router {
    let state = AppState::new(config.clone());

    let router = Router::new()
        // Downloads
        .route("/download", get(routes::download))
        .route("/yt_download", get(routes::download))
        // Metadata
        .route("/details", get(routes::details))
        .route("/yt_details", get(routes::details))
        .route("/thumbnail", get(routes::thumbnail))
        .route("/yt_thumbnail", get(routes::thumbnail))
        // System
        .route("/", get(routes::home))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .fallback(not_found)
        .with_state(state)
        // Innermost: a panicking handler becomes a JSON 500 instead of a dropped connection
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found()))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic_message(panic.as_ref());
    tracing::error!(panic = %detail, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal(detail)),
    )
        .into_response()
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGINT/SIGTERM (Ctrl+C elsewhere), then stops accepting
/// connections and waits for in-flight requests to finish.
///
/// # Example
///
/// ```no_run
/// use yt_relay::Config;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::from_env()?);
/// yt_relay::api::start_api_server(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, config, crate::shutdown_signal()).await
}

/// Serve the API on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, config: Arc<Config>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(config);

    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests;
