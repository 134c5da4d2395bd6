//! Core types for yt-relay

use crate::error::{Error, ToHttpStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Tool name → first line of its version output (`None` if it could not be queried)
pub type ToolVersions = BTreeMap<String, Option<String>>;

/// Overall outcome of a request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// The operation succeeded (possibly with metadata omitted)
    #[default]
    Success,
    /// The operation failed
    Error,
}

/// Classification of the sub-item yt-dlp is currently fetching
///
/// Derived from `Destination:` lines. Sticky: it only changes when a new
/// destination line indicates a different kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Audio-only track
    Audio,
    /// Video track
    Video,
    /// Not recognisable from the file name
    #[default]
    Unknown,
}

impl StreamKind {
    /// Lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Audio => "audio",
            StreamKind::Video => "video",
            StreamKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse stage of the download lifecycle
///
/// The orchestrator walks these in order; `Merging` is optional and only
/// entered when yt-dlp announces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Checking the URL shape
    Validating,
    /// Resolving required external binaries
    ToolCheck,
    /// About to spawn the download process
    Starting,
    /// Consuming progress output
    Downloading,
    /// yt-dlp is merging audio and video
    Merging,
    /// Process exited, fetching metadata and assembling the result
    Finalizing,
    /// Terminal event emitted
    Terminal,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Validating => "validating",
            Phase::ToolCheck => "tool_check",
            Phase::Starting => "starting",
            Phase::Downloading => "downloading",
            Phase::Merging => "merging",
            Phase::Finalizing => "finalizing",
            Phase::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// A single accepted download request
///
/// Immutable once built; lives for the duration of one HTTP request.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Media page URL handed to yt-dlp
    pub url: String,
    /// Directory the artifact is written to
    pub output_dir: PathBuf,
    /// Inline the downloaded bytes in the terminal result
    pub wants_binary: bool,
    /// Deliver live progress over SSE instead of one JSON body
    pub wants_streaming: bool,
}

/// One available format, as summarised for clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FormatSummary {
    /// yt-dlp format identifier (e.g. "137")
    pub format_id: Option<String>,
    /// Container extension
    pub ext: Option<String>,
    /// Resolution label (e.g. "1920x1080" or "audio only")
    pub resolution: Option<String>,
    /// Approximate size in bytes
    pub filesize_approx: Option<u64>,
}

/// Structured metadata about a media item
///
/// Fetched wholesale from `yt-dlp -j`; never patched in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoMetadata {
    /// Platform video ID
    pub id: String,
    /// Title as reported by the tool (used verbatim for the file name)
    pub title: String,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Uploader display name
    pub uploader: Option<String>,
    /// Upload date as `YYYYMMDD`
    pub upload_date: Option<String>,
    /// View count
    pub view_count: Option<u64>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,

    /// Channel ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Human-readable duration (e.g. "3:32")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_string: Option<String>,
    /// Like count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    /// Comment count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    /// Categories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Description, truncated to the configured limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// First few available formats
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<FormatSummary>,
}

/// The artifact written to disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    /// File name (`{title}.{ext}`)
    pub name: String,
    /// Full path inside the output directory
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Size in bytes (`None` if the file is not where it was expected)
    pub size_bytes: Option<u64>,
    /// Size in MiB rounded to two decimals
    pub size_mb: Option<f64>,
}

/// Terminal result of a download request
///
/// Built only by the orchestrator, handed to a response channel, then dropped.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadResult {
    /// `success` or `error`
    pub status: ResultStatus,
    /// Human-readable summary
    pub message: String,
    /// Artifact details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
    /// Media metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    /// Versions of the tools used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub tool_versions: Option<ToolVersions>,
    /// Missing tools (always `false`), only on dependency errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<BTreeMap<String, bool>>,
    /// Base64-encoded artifact (streaming delivery only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_base64: Option<String>,
    /// MIME type of the inlined artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Raw artifact bytes (synchronous delivery only, never serialized)
    #[serde(skip)]
    pub video_bytes: Option<Vec<u8>>,
}

impl DownloadResult {
    /// A successful result with the given message
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            ..Default::default()
        }
    }

    /// An error result carrying only a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Whether this is a success result
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// A terminal error, with the HTTP status it maps to for synchronous delivery
#[derive(Clone, Debug)]
pub struct Failure {
    /// HTTP status code (400 for operation failures, 500 for unexpected faults)
    pub status_code: u16,
    /// The error result body
    pub result: DownloadResult,
}

impl Failure {
    /// Build a failure from an error, attaching tool versions when known
    pub fn from_error(error: &Error, tool_versions: Option<ToolVersions>) -> Self {
        let mut result = DownloadResult::error(error.to_string());
        if let Error::DependencyMissing { tools } = error {
            result.tools = Some(tools.iter().map(|t| (t.clone(), false)).collect());
        }
        result.tool_versions = tool_versions;
        Self {
            status_code: error.status_code(),
            result,
        }
    }
}

/// Informational update (`info` event)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfoUpdate {
    /// Lifecycle phase being announced
    pub status: Phase,
    /// Human-readable message
    pub message: String,
    /// Stream kind, when the update is about a new track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<StreamKind>,
    /// Versions of the tools in use (only on `starting`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_versions: Option<ToolVersions>,
}

/// Percent progress update (`progress` event)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Percent complete, 0.0..=100.0, forwarded exactly as parsed
    pub percent: f64,
    /// Total size token as printed by yt-dlp (e.g. "10MiB")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<String>,
    /// Speed token (e.g. "1MiB/s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// ETA token (e.g. "00:05")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Track the progress belongs to
    pub stream_type: StreamKind,
}

/// Events produced for one download, in the order they must reach the client
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Phase or stream-kind announcement
    Info(InfoUpdate),
    /// Percent progress
    Progress(ProgressUpdate),
    /// Terminal failure
    Error(Box<Failure>),
    /// Terminal success
    Complete(Box<DownloadResult>),
}

impl ProgressEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Info(_) => "info",
            ProgressEvent::Progress(_) => "progress",
            ProgressEvent::Error(_) => "error",
            ProgressEvent::Complete(_) => "complete",
        }
    }

    /// Whether this event ends the request's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Error(_) | ProgressEvent::Complete(_))
    }
}

/// Presence and version of one external tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolStatus {
    /// Whether the binary could be resolved
    pub present: bool,
    /// First line of its version output
    pub version: Option<String>,
}
