//! Response delivery: one JSON body, or a live SSE stream
//!
//! The orchestrator only ever calls [`ResponseChannel::emit`]; which of the two
//! transports sits behind it is decided by the HTTP handler.

use crate::error::{ApiError, Error, Result};
use crate::sse;
use crate::types::{DownloadResult, ProgressEvent};
use async_trait::async_trait;
use axum::{
    Json,
    body::Bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::sync::mpsc;

/// Sink for the events of one download
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    /// Deliver one event, in order
    ///
    /// Fails with [`Error::ClientDisconnected`] once the receiving side is gone.
    async fn emit(&mut self, event: ProgressEvent) -> Result<()>;

    /// Resolves when the receiving side goes away; never resolves if it cannot
    async fn closed(&self);
}

/// Synchronous delivery: keeps only the terminal event
#[derive(Debug, Default)]
pub struct BufferedChannel {
    terminal: Option<ProgressEvent>,
}

impl BufferedChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// The terminal event, if one was emitted
    pub fn into_terminal(self) -> Option<ProgressEvent> {
        self.terminal
    }

    /// Render the terminal event as an HTTP response
    ///
    /// - success with inlined bytes: the raw file as an attachment
    /// - other success: the result as JSON, 200
    /// - failure: the error result as JSON with its mapped status (400 or 500)
    pub fn into_response(self) -> Response {
        match self.terminal {
            Some(ProgressEvent::Complete(result)) => success_response(*result),
            Some(ProgressEvent::Error(failure)) => (*failure).into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal("download finished without a result")),
            )
                .into_response(),
        }
    }
}

fn success_response(mut result: DownloadResult) -> Response {
    let Some(bytes) = result.video_bytes.take() else {
        return (StatusCode::OK, Json(result)).into_response();
    };

    let content_type = result
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name = result
        .file
        .map(|f| f.name)
        .unwrap_or_else(|| "video".to_string());
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&file_name)
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

#[async_trait]
impl ResponseChannel for BufferedChannel {
    async fn emit(&mut self, event: ProgressEvent) -> Result<()> {
        if event.is_terminal() {
            self.terminal = Some(event);
        }
        Ok(())
    }

    async fn closed(&self) {
        // A dropped synchronous request drops the whole handler future instead
        std::future::pending::<()>().await
    }
}

/// Live delivery: every event becomes an SSE frame on a bounded channel
///
/// The receiving half feeds the HTTP response body. `emit` waits for room, so
/// a slow client applies backpressure all the way to the subprocess pipe.
#[derive(Debug, Clone)]
pub struct StreamingChannel {
    tx: mpsc::Sender<Bytes>,
}

impl StreamingChannel {
    /// Wrap an existing sender
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// A channel plus the receiver for the response body
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ResponseChannel for StreamingChannel {
    async fn emit(&mut self, event: ProgressEvent) -> Result<()> {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) if event.is_terminal() => {
                tracing::error!(error = %e, "failed to encode terminal event, sending fallback");
                sse::fallback_error_frame(&e.to_string())
            }
            Err(e) => return Err(e),
        };

        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::ClientDisconnected)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::decode::frames;
    use crate::types::{FileInfo, Failure, InfoUpdate, Phase};
    use std::path::PathBuf;

    fn info() -> ProgressEvent {
        ProgressEvent::Info(InfoUpdate {
            status: Phase::Starting,
            message: "Initializing download...".into(),
            stream_type: None,
            tool_versions: None,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn buffered_keeps_only_terminal_event() {
        let mut channel = BufferedChannel::new();
        channel.emit(info()).await.unwrap();
        channel
            .emit(ProgressEvent::Complete(Box::new(DownloadResult::success("ok"))))
            .await
            .unwrap();

        match channel.into_terminal() {
            Some(ProgressEvent::Complete(result)) => assert_eq!(result.message, "ok"),
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn buffered_error_uses_failure_status() {
        let mut channel = BufferedChannel::new();
        let failure = Failure::from_error(
            &Error::InvalidInput("Invalid YouTube URL provided.".into()),
            None,
        );
        channel
            .emit(ProgressEvent::Error(Box::new(failure)))
            .await
            .unwrap();

        let response = channel.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Invalid YouTube URL provided.");

        let mut channel = BufferedChannel::new();
        let failure = Failure::from_error(&Error::Other("boom".into()), None);
        channel
            .emit(ProgressEvent::Error(Box::new(failure)))
            .await
            .unwrap();
        assert_eq!(
            channel.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn buffered_binary_success_is_an_attachment() {
        let mut result = DownloadResult::success("Video downloaded successfully.");
        result.file = Some(FileInfo {
            name: "My Video: part 1.mp4".into(),
            path: PathBuf::from("downloads/My Video: part 1.mp4"),
            size_bytes: Some(3),
            size_mb: Some(0.0),
        });
        result.content_type = Some("video/mp4".into());
        result.video_bytes = Some(vec![1, 2, 3]);

        let mut channel = BufferedChannel::new();
        channel
            .emit(ProgressEvent::Complete(Box::new(result)))
            .await
            .unwrap();
        let response = channel.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''My%20Video%3A%20part%201.mp4"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn buffered_without_terminal_is_internal_error() {
        let mut channel = BufferedChannel::new();
        channel.emit(info()).await.unwrap();
        assert_eq!(
            channel.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn streaming_frames_every_event_in_order() {
        let (mut channel, mut rx) = StreamingChannel::pair(8);
        channel.emit(info()).await.unwrap();
        channel
            .emit(ProgressEvent::Complete(Box::new(DownloadResult::success("ok"))))
            .await
            .unwrap();
        drop(channel);

        let mut body = Vec::new();
        while let Some(frame) = rx.recv().await {
            body.extend_from_slice(&frame);
        }
        let decoded = frames(std::str::from_utf8(&body).unwrap());
        let kinds: Vec<_> = decoded.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(kinds, ["info", "complete"]);
    }

    #[tokio::test]
    async fn streaming_reports_disconnect() {
        let (mut channel, rx) = StreamingChannel::pair(1);
        drop(rx);

        // closed() resolves immediately once the receiver is gone
        channel.closed().await;
        assert!(matches!(
            channel.emit(info()).await,
            Err(Error::ClientDisconnected)
        ));
    }
}
