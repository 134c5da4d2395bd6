//! Download orchestration
//!
//! [`DownloadOrchestrator::run`] drives one request through
//! `Validating → ToolCheck → Starting → Downloading → (Merging) → Finalizing`
//! and always finishes by emitting exactly one terminal event, `complete` or
//! `error`, on the supplied [`ResponseChannel`]. The only exception is a
//! streaming client that disconnected: there is nobody left to tell, so the
//! subprocess is killed and [`Error::ClientDisconnected`] is returned instead.

mod channel;

pub use channel::{BufferedChannel, ResponseChannel, StreamingChannel};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::MetadataFetcher;
use crate::process::{CommandSpec, ProcessOutcome, RunMode};
use crate::progress::{self, ParseResult};
use crate::tools::{Tool, ToolChecker};
use crate::types::{
    DownloadRequest, DownloadResult, Failure, FileInfo, InfoUpdate, Phase, ProgressEvent,
    ProgressUpdate, StreamKind, ToolVersions,
};
use crate::validation::is_valid_youtube_url;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Coordinates one download from validation to terminal event
#[derive(Clone, Debug)]
pub struct DownloadOrchestrator {
    config: Arc<Config>,
    tools: ToolChecker,
}

/// Per-run bookkeeping
struct RunState<'a> {
    url: &'a str,
    phase: Phase,
    tool_versions: Option<ToolVersions>,
}

impl RunState<'_> {
    fn enter(&mut self, next: Phase) {
        tracing::debug!(url = self.url, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }
}

impl DownloadOrchestrator {
    /// Create an orchestrator over the given configuration
    pub fn new(config: Arc<Config>) -> Self {
        let tools = ToolChecker::new(config.tools.clone());
        Self { config, tools }
    }

    /// The tool checker this orchestrator resolves binaries with
    pub fn tools(&self) -> &ToolChecker {
        &self.tools
    }

    /// Build a request against the configured output directory
    pub fn request(&self, url: &str, wants_binary: bool, wants_streaming: bool) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            output_dir: self.config.download.output_dir.clone(),
            wants_binary,
            wants_streaming,
        }
    }

    /// The yt-dlp invocation for a request
    pub fn download_command(&self, ytdlp: &Path, request: &DownloadRequest) -> CommandSpec {
        let ext = &self.config.download.output_format;
        let template = request.output_dir.join(format!("%(title)s.{}", ext));

        let mut command = CommandSpec::new(ytdlp)
            .arg("-f")
            .arg(&self.config.download.format_selector)
            .arg("--merge-output-format")
            .arg(ext);
        if RunMode::for_streaming(request.wants_streaming) == RunMode::Streamed {
            command = command.args(["--newline", "--progress"]);
        }
        command
            .arg("-o")
            .arg(template.to_string_lossy())
            .arg(&request.url)
    }

    /// Run a request to completion, emitting its events on `channel`
    ///
    /// # Errors
    ///
    /// Only [`Error::ClientDisconnected`] (the client went away mid-stream) or
    /// a failure to hand over the terminal event. Every other problem is
    /// reported to the client as an `error` event.
    pub async fn run(
        &self,
        request: &DownloadRequest,
        channel: &mut dyn ResponseChannel,
    ) -> Result<()> {
        let mut state = RunState {
            url: &request.url,
            phase: Phase::Validating,
            tool_versions: None,
        };

        let terminal = match self.execute(request, channel, &mut state).await {
            Ok(result) => ProgressEvent::Complete(Box::new(result)),
            Err(Error::ClientDisconnected) => {
                tracing::info!(url = %request.url, phase = %state.phase, "client disconnected, download abandoned");
                return Err(Error::ClientDisconnected);
            }
            Err(e) => {
                tracing::error!(
                    url = %request.url,
                    phase = %state.phase,
                    error = %e,
                    "download error"
                );
                ProgressEvent::Error(Box::new(Failure::from_error(&e, state.tool_versions.take())))
            }
        };

        state.enter(Phase::Terminal);
        channel.emit(terminal).await
    }

    async fn execute(
        &self,
        request: &DownloadRequest,
        channel: &mut dyn ResponseChannel,
        state: &mut RunState<'_>,
    ) -> Result<DownloadResult> {
        if !is_valid_youtube_url(&request.url) {
            tracing::warn!(url = %request.url, "invalid YouTube URL");
            return Err(Error::InvalidInput("Invalid YouTube URL provided.".into()));
        }

        state.enter(Phase::ToolCheck);
        self.tools.ensure_present(&Tool::DOWNLOAD)?;
        let ytdlp = self.tools.path(Tool::YtDlp)?;
        let tool_versions = self.tools.versions(&Tool::DOWNLOAD).await;
        state.tool_versions = Some(tool_versions.clone());

        state.enter(Phase::Starting);
        channel
            .emit(ProgressEvent::Info(InfoUpdate {
                status: Phase::Starting,
                message: "Initializing download...".into(),
                stream_type: None,
                tool_versions: Some(tool_versions.clone()),
            }))
            .await?;

        tokio::fs::create_dir_all(&request.output_dir).await?;

        tracing::info!(
            url = %request.url,
            output_dir = %request.output_dir.display(),
            streaming = request.wants_streaming,
            "download started"
        );
        let command = self.download_command(&ytdlp, request);

        state.enter(Phase::Downloading);
        let outcome = match RunMode::for_streaming(request.wants_streaming) {
            RunMode::Buffered => {
                let output = command.run_buffered(None).await?;
                ProcessOutcome {
                    exit_code: output.exit_code,
                    aggregated_stderr: output.stderr,
                }
            }
            RunMode::Streamed => self.stream_download(&command, channel, state).await?,
        };

        if !outcome.success() {
            return Err(Error::DownloadFailed {
                exit_code: outcome.exit_code,
                stderr: outcome.aggregated_stderr,
            });
        }

        state.enter(Phase::Finalizing);
        self.finalize(&ytdlp, request, tool_versions).await
    }

    /// Pump the live output through the parser until the process exits
    async fn stream_download(
        &self,
        command: &CommandSpec,
        channel: &mut dyn ResponseChannel,
        state: &mut RunState<'_>,
    ) -> Result<ProcessOutcome> {
        let mut handle = command.spawn_streamed()?;
        let mut kind = StreamKind::Unknown;
        let mut merging = false;

        loop {
            let next = tokio::select! {
                line = handle.next_line() => Some(line),
                _ = channel.closed() => None,
            };

            let line = match next {
                Some(Ok(Some(line))) => line,
                Some(Ok(None)) => break,
                Some(Err(e)) => {
                    handle.terminate().await;
                    return Err(e);
                }
                None => {
                    handle.terminate().await;
                    return Err(Error::ClientDisconnected);
                }
            };

            for signal in progress::parse(&line, kind) {
                let event = match signal {
                    ParseResult::StreamKindChanged(next_kind) => {
                        tracing::debug!(url = state.url, stream_kind = %next_kind, "stream kind changed");
                        kind = next_kind;
                        ProgressEvent::Info(InfoUpdate {
                            status: Phase::Downloading,
                            message: format!("Downloading {}...", kind),
                            stream_type: Some(kind),
                            tool_versions: None,
                        })
                    }
                    ParseResult::PhaseChanged(Phase::Merging) if !merging => {
                        merging = true;
                        state.enter(Phase::Merging);
                        ProgressEvent::Info(InfoUpdate {
                            status: Phase::Merging,
                            message: "Merging video and audio...".into(),
                            stream_type: None,
                            tool_versions: None,
                        })
                    }
                    ParseResult::PhaseChanged(_) => continue,
                    ParseResult::Progress {
                        percent,
                        total_size,
                        speed,
                        eta,
                    } => ProgressEvent::Progress(ProgressUpdate {
                        percent,
                        total_size,
                        speed,
                        eta,
                        stream_type: kind,
                    }),
                };

                if let Err(e) = channel.emit(event).await {
                    handle.terminate().await;
                    return Err(e);
                }
            }
        }

        handle.wait().await
    }

    /// Fetch metadata and assemble the success result
    async fn finalize(
        &self,
        ytdlp: &Path,
        request: &DownloadRequest,
        tool_versions: ToolVersions,
    ) -> Result<DownloadResult> {
        let fetcher = MetadataFetcher::new(ytdlp.to_path_buf(), self.config.metadata.clone());
        let metadata = match fetcher.fetch(&request.url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "metadata unavailable, reporting success without it");
                let mut result =
                    DownloadResult::success("Video downloaded successfully (metadata unavailable).");
                result.tool_versions = Some(tool_versions);
                if request.wants_binary {
                    tracing::warn!(
                        url = %request.url,
                        "binary payload requested but the file name is unknown without metadata"
                    );
                }
                return Ok(result);
            }
        };

        let ext = &self.config.download.output_format;
        let name = format!("{}.{}", metadata.title, ext);
        let path = request.output_dir.join(&name);
        let file = file_info(name, path).await;

        tracing::info!(
            url = %request.url,
            title = %metadata.title,
            size_mb = file.size_mb.unwrap_or(0.0),
            "download complete"
        );

        let mut result = DownloadResult::success("Video downloaded successfully.");
        if request.wants_binary && file.size_bytes.is_some() {
            let bytes = tokio::fs::read(&file.path).await?;
            if request.wants_streaming {
                result.video_base64 = Some(base64::engine::general_purpose::STANDARD.encode(&bytes));
            } else {
                result.video_bytes = Some(bytes);
            }
            result.content_type = Some(format!("video/{}", ext));
        } else if request.wants_binary {
            tracing::warn!(
                url = %request.url,
                path = %file.path.display(),
                "binary payload requested but the downloaded file was not found"
            );
        }
        result.file = Some(file);
        result.metadata = Some(metadata);
        result.tool_versions = Some(tool_versions);
        Ok(result)
    }
}

async fn file_info(name: String, path: PathBuf) -> FileInfo {
    let size_bytes = tokio::fs::metadata(&path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len());
    FileInfo {
        name,
        path,
        size_bytes,
        size_mb: size_bytes.map(|b| (b as f64 / BYTES_PER_MB * 100.0).round() / 100.0),
    }
}
