//! Error types for yt-relay
//!
//! This module provides the error taxonomy shared by every component:
//! - Pre-flight rejections (invalid input, missing external tools)
//! - Subprocess failures (spawn, non-zero exit, unparsable output, timeouts)
//! - Transport failures (client gone, I/O) and unexpected faults
//! - HTTP status code mapping and the JSON error body used by the API

use crate::types::ResultStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for yt-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yt-relay
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing request input (e.g. a URL that fails the shape check)
    #[error("{0}")]
    InvalidInput(String),

    /// One or more required external binaries could not be resolved
    #[error(
        "Missing required tool(s): {}. Please install them before using this endpoint.",
        .tools.join(", ")
    )]
    DependencyMissing {
        /// Binary names that were not found
        tools: Vec<String>,
    },

    /// The external process could not be started
    #[error("failed to execute {}: {source}", .program.display())]
    Spawn {
        /// Program that was being launched
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The external process exited with a non-zero status
    #[error("{program} exited with code {exit_code}: {}", .stderr.trim())]
    ProcessFailed {
        /// Program name (for messages)
        program: String,
        /// Exit code (-1 when terminated by a signal)
        exit_code: i32,
        /// Everything the process wrote to stderr
        stderr: String,
    },

    /// The download process exited with a non-zero status
    #[error("{}", download_failure_message(.exit_code, .stderr))]
    DownloadFailed {
        /// Exit code (-1 when terminated by a signal)
        exit_code: i32,
        /// Everything the process wrote to stderr
        stderr: String,
    },

    /// Structured tool output could not be parsed
    #[error("failed to parse tool output: {0}")]
    ParseFailed(String),

    /// A bounded subprocess wait elapsed
    #[error("{program} timed out after {seconds}s")]
    TimedOut {
        /// Program name (for messages)
        program: String,
        /// The bound that elapsed, in seconds
        seconds: u64,
    },

    /// The streaming client went away while events were still being produced
    #[error("client disconnected")]
    ClientDisconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PORT")
        key: Option<String>,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Unexpected fault
    #[error("Unexpected error: {0}")]
    Other(String),
}

fn download_failure_message(exit_code: &i32, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("Download failed with exit code {}", exit_code)
    } else {
        format!("Download failed: {}", stderr)
    }
}

impl Error {
    /// Whether this error is an internal fault rather than an operation failure
    pub fn is_unexpected(&self) -> bool {
        self.status_code() >= 500
    }
}

/// API error response format
///
/// Mirrors the error shape of a failed download result so that clients only
/// ever have to look at `status` and `message`.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "status": "error",
///   "message": "Missing 'url' query parameter."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always `error`
    pub status: ResultStatus,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error with additional details
    pub fn with_details(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a "not found" error
    pub fn not_found() -> Self {
        Self::new("Not found")
    }

    /// Create a "missing query parameter" error
    pub fn missing_param(name: &str) -> Self {
        Self::new(format!("Missing '{}' query parameter.", name))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(format!("Internal server error: {}", message.into()))
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - the requested operation failed
            Error::InvalidInput(_) => 400,
            Error::DependencyMissing { .. } => 400,
            Error::Spawn { .. } => 400,
            Error::ProcessFailed { .. } => 400,
            Error::DownloadFailed { .. } => 400,
            Error::ParseFailed(_) => 400,
            Error::TimedOut { .. } => 400,

            // 499 Client Closed Request (nginx convention, never actually delivered)
            Error::ClientDisconnected => 499,

            // 502 Bad Gateway - upstream HTTP errors
            Error::Network(_) => 502,

            // 500 Internal Server Error - unexpected faults
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Config { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::DependencyMissing { .. } => "dependency_missing",
            Error::Spawn { .. } => "spawn_error",
            Error::ProcessFailed { .. } => "process_failed",
            Error::DownloadFailed { .. } => "download_failed",
            Error::ParseFailed(_) => "parse_failed",
            Error::TimedOut { .. } => "timed_out",
            Error::ClientDisconnected => "client_disconnected",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Network(_) => "network_error",
            Error::Config { .. } => "config_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "unexpected",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let details = match &error {
            Error::DependencyMissing { tools } => {
                let map: serde_json::Map<String, serde_json::Value> = tools
                    .iter()
                    .map(|t| (t.clone(), serde_json::Value::Bool(false)))
                    .collect();
                Some(serde_json::json!({ "tools": map }))
            }
            Error::TimedOut { seconds, .. } => Some(serde_json::json!({
                "timeout_seconds": seconds,
            })),
            _ => None,
        };

        ApiError {
            status: ResultStatus::Error,
            message: error.to_string(),
            details,
        }
    }
}
