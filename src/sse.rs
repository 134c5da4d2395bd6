//! Server-Sent Events framing
//!
//! Frames are written by hand rather than through `axum::response::Sse` so the
//! bytes on the wire are exactly `event: <type>\ndata: <json>\n\n`: one
//! `data:` line per frame, no keep-alive comments, no id field. JSON encoding
//! escapes embedded newlines, so a single `data:` line is always enough.

use crate::error::Result;
use crate::types::ProgressEvent;
use axum::body::Bytes;
use serde::Serialize;

/// Encode one SSE frame
pub fn encode<T: Serialize + ?Sized>(event_type: &str, payload: &T) -> Result<Bytes> {
    let data = serde_json::to_string(payload)?;
    let frame = format!("event: {}\ndata: {}\n\n", event_type, data);
    tracing::trace!(event_type, bytes = frame.len(), "encoded SSE frame");
    Ok(Bytes::from(frame))
}

/// A hand-built `error` frame for when the real payload cannot be encoded
pub fn fallback_error_frame(message: &str) -> Bytes {
    let message =
        serde_json::to_string(message).unwrap_or_else(|_| "\"Unexpected error\"".to_string());
    Bytes::from(format!(
        "event: error\ndata: {{\"status\":\"error\",\"message\":{}}}\n\n",
        message
    ))
}

impl ProgressEvent {
    /// Encode this event as an SSE frame
    pub fn to_frame(&self) -> Result<Bytes> {
        let event_type = self.event_type();
        match self {
            ProgressEvent::Info(info) => encode(event_type, info),
            ProgressEvent::Progress(progress) => encode(event_type, progress),
            ProgressEvent::Error(failure) => encode(event_type, &failure.result),
            ProgressEvent::Complete(result) => encode(event_type, result.as_ref()),
        }
    }
}
