//! Configuration types for yt-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (output location, format selection)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Output directory for finished files (default: "./downloads")
    #[serde(default = "default_output_dir")]
    #[schema(value_type = String)]
    pub output_dir: PathBuf,

    /// Container extension passed to `--merge-output-format` (default: "mp4")
    ///
    /// Also used to derive the artifact's file name and `video/<ext>` content type.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// yt-dlp `-f` format selector (default: "bestvideo+bestaudio/best")
    #[serde(default = "default_format_selector")]
    pub format_selector: String,

    /// Capacity of the per-request event channel feeding an SSE response (default: 32)
    ///
    /// When the client reads slower than yt-dlp prints, the orchestrator waits
    /// for room instead of buffering without bound.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            output_format: default_output_format(),
            format_selector: default_format_selector(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg, ffprobe)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ffprobe_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Bound on each `--version` query (default: 10 seconds)
    #[serde(default = "default_version_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub version_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            search_path: true,
            version_timeout: default_version_timeout(),
        }
    }
}

/// Metadata query configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataConfig {
    /// Bound on the `yt-dlp -j` query (default: 30 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// Maximum description length in characters (default: 500)
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,

    /// Maximum number of formats reported (default: 5)
    #[serde(default = "default_format_limit")]
    pub format_limit: usize,

    /// Bound on fetching a thumbnail image (default: 10 seconds)
    #[serde(default = "default_thumbnail_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub thumbnail_timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            timeout: default_metadata_timeout(),
            description_limit: default_description_limit(),
            format_limit: default_format_limit(),
            thumbnail_timeout: default_thumbnail_timeout(),
        }
    }
}

/// Main configuration for yt-relay
///
/// Built once at startup and shared as `Arc<Config>`; nothing reads
/// configuration from globals.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Metadata query settings
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Build a configuration from environment variables on top of the defaults
    ///
    /// Recognised variables: `PORT`, `BIND_HOST`, `OUTPUT_DIR`, `YTDLP_PATH`,
    /// `FFMPEG_PATH`, `FFPROBE_PATH`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("BIND_HOST") {
            let ip = host.parse().map_err(|_| Error::Config {
                message: format!("invalid bind host '{}'", host),
                key: Some("BIND_HOST".into()),
            })?;
            config.server.api.bind_address.set_ip(ip);
        }

        if let Some(port) = lookup("PORT") {
            let port = port.parse::<u16>().map_err(|_| Error::Config {
                message: format!("invalid port '{}'", port),
                key: Some("PORT".into()),
            })?;
            config.server.api.bind_address.set_port(port);
        }

        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.download.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("YTDLP_PATH") {
            config.tools.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FFMPEG_PATH") {
            config.tools.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FFPROBE_PATH") {
            config.tools.ffprobe_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_output_format() -> String {
    "mp4".into()
}

fn default_format_selector() -> String {
    "bestvideo+bestaudio/best".into()
}

fn default_stream_buffer() -> usize {
    32
}

fn default_true() -> bool {
    true
}

fn default_version_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_description_limit() -> usize {
    500
}

fn default_format_limit() -> usize {
    5
}

fn default_thumbnail_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
