//! # yt-relay
//!
//! HTTP front-end for [yt-dlp](https://github.com/yt-dlp/yt-dlp).
//!
//! A client asks for a video by URL and gets back one of:
//! - a JSON result once the download has finished
//! - the video file itself as an attachment
//! - a live Server-Sent Events stream of `info`, `progress` and a final
//!   `complete` or `error` event
//!
//! Metadata and thumbnail lookups are served without downloading anything.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use yt_relay::{Config, api};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     api::start_api_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Embedding the pipeline
//!
//! The HTTP layer is optional: [`DownloadOrchestrator::run`] drives one
//! download against any [`ResponseChannel`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use yt_relay::{BufferedChannel, Config, DownloadOrchestrator, ProgressEvent};
//!
//! # async fn example() -> yt_relay::Result<()> {
//! let orchestrator = DownloadOrchestrator::new(Arc::new(Config::default()));
//! let request = orchestrator.request("https://youtu.be/dQw4w9WgXcQ", false, false);
//!
//! let mut channel = BufferedChannel::new();
//! orchestrator.run(&request, &mut channel).await?;
//! if let Some(ProgressEvent::Complete(result)) = channel.into_terminal() {
//!     println!("{}", result.message);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// yt-dlp metadata queries
pub mod metadata;
/// Download lifecycle and response delivery
pub mod orchestrator;
/// External process execution
pub mod process;
/// yt-dlp output line parsing
pub mod progress;
/// Server-Sent Events framing
pub mod sse;
/// External tool discovery and versions
pub mod tools;
/// Core types
pub mod types;
/// Input validation
pub mod validation;

#[cfg(all(test, unix))]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{BufferedChannel, DownloadOrchestrator, ResponseChannel, StreamingChannel};
pub use tools::{Tool, ToolChecker};
pub use types::{
    DownloadRequest, DownloadResult, Failure, FileInfo, ProgressEvent, ResultStatus, StreamKind,
    VideoMetadata,
};

/// Resolves on SIGTERM or SIGINT (Ctrl+C on non-unix platforms)
///
/// Passed to the API server as its graceful-shutdown trigger.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C on non-unix platforms)
///
/// Passed to the API server as its graceful-shutdown trigger.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
