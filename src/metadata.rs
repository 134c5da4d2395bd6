//! Video metadata queries via `yt-dlp -j`
//!
//! The query runs as its own short-lived, buffered process with a bounded
//! wait. Its output is yt-dlp's info JSON; only the fields clients care about
//! are kept, with the description and format list capped.

use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::process::CommandSpec;
use crate::types::{FormatSummary, VideoMetadata};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Metadata as typed fields plus the untouched info JSON
#[derive(Clone, Debug)]
pub struct FetchedMetadata {
    /// Curated, truncated metadata
    pub metadata: VideoMetadata,
    /// The full document yt-dlp printed
    pub raw: serde_json::Value,
}

/// Runs metadata queries against one yt-dlp binary
#[derive(Clone, Debug)]
pub struct MetadataFetcher {
    ytdlp: PathBuf,
    config: MetadataConfig,
}

impl MetadataFetcher {
    /// Create a fetcher for the given yt-dlp binary
    pub fn new(ytdlp: PathBuf, config: MetadataConfig) -> Self {
        Self { ytdlp, config }
    }

    /// The query command for `url`
    pub fn command(&self, url: &str) -> CommandSpec {
        CommandSpec::new(&self.ytdlp).args(["-j", "--no-warnings", url])
    }

    /// Fetch curated metadata
    pub async fn fetch(&self, url: &str) -> Result<VideoMetadata> {
        self.fetch_with_raw(url).await.map(|fetched| fetched.metadata)
    }

    /// Fetch curated metadata along with the raw info JSON
    ///
    /// # Errors
    ///
    /// - [`Error::Spawn`] if yt-dlp cannot be started
    /// - [`Error::TimedOut`] if the configured bound elapses (the process is killed)
    /// - [`Error::ProcessFailed`] on a non-zero exit
    /// - [`Error::ParseFailed`] if stdout holds no usable JSON document
    pub async fn fetch_with_raw(&self, url: &str) -> Result<FetchedMetadata> {
        let command = self.command(url);
        let output = command.run_buffered(Some(self.config.timeout)).await?;

        if !output.success() {
            tracing::error!(
                url,
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "metadata query failed"
            );
            return Err(Error::ProcessFailed {
                program: command.program_name(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let fetched = parse_info_json(
            &output.stdout,
            self.config.description_limit,
            self.config.format_limit,
        )?;
        tracing::info!(url, id = %fetched.metadata.id, title = %fetched.metadata.title, "metadata fetched");
        Ok(fetched)
    }
}

/// Parse the first JSON document in yt-dlp's `-j` output
///
/// Playlist URLs print one document per entry; only the first is used.
pub fn parse_info_json(
    stdout: &str,
    description_limit: usize,
    format_limit: usize,
) -> Result<FetchedMetadata> {
    let raw = serde_json::Deserializer::from_str(stdout)
        .into_iter::<serde_json::Value>()
        .next()
        .ok_or_else(|| Error::ParseFailed("no JSON document in yt-dlp output".into()))?
        .map_err(|e| Error::ParseFailed(e.to_string()))?;

    let info = RawInfo::deserialize(&raw).map_err(|e| Error::ParseFailed(e.to_string()))?;
    let metadata = info.into_metadata(description_limit, format_limit);

    Ok(FetchedMetadata { metadata, raw })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    upload_date: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    view_count: Option<u64>,
    thumbnail: Option<String>,
    channel_id: Option<String>,
    duration_string: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    like_count: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    comment_count: Option<u64>,
    categories: Option<Vec<String>>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    formats: Option<Vec<RawFormat>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    filesize_approx: Option<u64>,
}

impl RawInfo {
    fn into_metadata(self, description_limit: usize, format_limit: usize) -> VideoMetadata {
        VideoMetadata {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            duration: self.duration,
            uploader: self.uploader,
            upload_date: self.upload_date,
            view_count: self.view_count,
            thumbnail: self.thumbnail,
            channel_id: self.channel_id,
            duration_string: self.duration_string,
            like_count: self.like_count,
            comment_count: self.comment_count,
            categories: self.categories.unwrap_or_default(),
            description: self
                .description
                .map(|d| d.chars().take(description_limit).collect()),
            tags: self.tags.unwrap_or_default(),
            formats: self
                .formats
                .unwrap_or_default()
                .into_iter()
                .take(format_limit)
                .map(|f| FormatSummary {
                    format_id: f.format_id,
                    ext: f.ext,
                    resolution: f.resolution,
                    filesize_approx: f.filesize_approx,
                })
                .collect(),
        }
    }
}

// yt-dlp sometimes reports counts and sizes as floats
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(value.and_then(|n| {
        n.as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
    }))
}
