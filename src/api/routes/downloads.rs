//! Download handlers.

use super::{DownloadQuery, flag, require_url};
use crate::api::{AppState, panic_message};
use crate::error::Result;
use crate::orchestrator::{BufferedChannel, StreamingChannel};
use crate::sse;
use crate::types::DownloadRequest;
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// GET /download - Download a video
///
/// Three response shapes:
/// - `stream=true`: `text/event-stream` with `info`, `progress`, and a final
///   `complete` or `error` event
/// - `binary=true` (not streaming) and success: the video file as an attachment
/// - otherwise: a JSON download result, 200 on success and 400 on failure
#[utoipa::path(
    get,
    path = "/download",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Download result (JSON), video bytes, or SSE stream", body = crate::types::DownloadResult),
        (status = 400, description = "Missing/invalid URL, missing tool or failed download", body = crate::types::DownloadResult),
        (status = 500, description = "Internal server error", body = crate::types::DownloadResult)
    )
)]
pub async fn download(State(state): State<AppState>, Query(query): Query<DownloadQuery>) -> Response {
    let url = match require_url(query.url) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let request = state.orchestrator.request(
        &url,
        flag(query.binary.as_deref()),
        flag(query.stream.as_deref()),
    );

    if request.wants_streaming {
        return stream_download(state, request);
    }

    let mut channel = BufferedChannel::new();
    if let Err(e) = state.orchestrator.run(&request, &mut channel).await {
        tracing::warn!(url = %request.url, error = %e, "download did not complete");
    }
    channel.into_response()
}

/// Run the download in its own task and stream its events as the response body
///
/// The task ends once the terminal event is sent, or early if the client goes
/// away (the yt-dlp process is killed in that case).
fn stream_download(state: AppState, request: DownloadRequest) -> Response {
    let (tx, rx) = mpsc::channel(state.config.download.stream_buffer.max(1));
    let fallback = tx.clone();
    let orchestrator = state.orchestrator;

    tokio::spawn(async move {
        let url = request.url.clone();
        let run = async move {
            let mut channel = StreamingChannel::new(tx);
            orchestrator.run(&request, &mut channel).await
        };
        drive_stream(&url, run, fallback).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}

/// Drive one streamed download to its end
///
/// A panic inside `run` becomes a final `error` frame on `fallback`, so the
/// stream still ends with exactly one terminal event.
pub(crate) async fn drive_stream<F>(url: &str, run: F, fallback: mpsc::Sender<Bytes>)
where
    F: Future<Output = Result<()>>,
{
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "event stream ended early")
        }
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            tracing::error!(url = %url, panic = %detail, "download task panicked");
            let frame = sse::fallback_error_frame(&format!("Unexpected error: {}", detail));
            let _ = fallback.send(frame).await;
        }
    }
}
