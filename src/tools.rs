//! External tool discovery and version reporting
//!
//! Each tool resolves from its explicitly configured path first, then from
//! `PATH` (via `which`) when `search_path` is enabled. Nothing is cached: a
//! binary installed or removed while the server runs is picked up on the next
//! request.

use crate::config::ToolsConfig;
use crate::error::{Error, Result};
use crate::process::CommandSpec;
use crate::types::{ToolStatus, ToolVersions};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// An external binary yt-relay depends on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// The downloader
    YtDlp,
    /// Muxer used by yt-dlp to merge audio and video
    Ffmpeg,
    /// Media inspector shipped with ffmpeg
    Ffprobe,
}

impl Tool {
    /// Every known tool, in reporting order
    pub const ALL: [Tool; 3] = [Tool::YtDlp, Tool::Ffmpeg, Tool::Ffprobe];

    /// Tools needed to download or inspect a video
    pub const DOWNLOAD: [Tool; 2] = [Tool::YtDlp, Tool::Ffmpeg];

    /// Binary name
    pub fn name(&self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    /// Flag that prints the version (ffmpeg family uses a single dash)
    pub fn version_flag(&self) -> &'static str {
        match self {
            Tool::YtDlp => "--version",
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves tool binaries and queries their versions
#[derive(Clone, Debug)]
pub struct ToolChecker {
    config: ToolsConfig,
}

impl ToolChecker {
    /// Create a checker over the given tool configuration
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    fn configured_path(&self, tool: Tool) -> Option<&PathBuf> {
        match tool {
            Tool::YtDlp => self.config.ytdlp_path.as_ref(),
            Tool::Ffmpeg => self.config.ffmpeg_path.as_ref(),
            Tool::Ffprobe => self.config.ffprobe_path.as_ref(),
        }
    }

    /// Locate a tool's binary
    ///
    /// An explicitly configured path wins and is not second-guessed by a PATH
    /// search; it only has to exist.
    pub fn resolve(&self, tool: Tool) -> Option<PathBuf> {
        if let Some(path) = self.configured_path(tool) {
            return path.exists().then(|| path.clone());
        }
        if self.config.search_path {
            return which::which(tool.name()).ok();
        }
        None
    }

    /// The subset of `tools` that cannot be resolved
    pub fn missing(&self, tools: &[Tool]) -> Vec<Tool> {
        tools
            .iter()
            .copied()
            .filter(|tool| self.resolve(*tool).is_none())
            .collect()
    }

    /// Fail with [`Error::DependencyMissing`] unless every tool resolves
    pub fn ensure_present(&self, tools: &[Tool]) -> Result<()> {
        let missing = self.missing(tools);
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::DependencyMissing {
            tools: missing.iter().map(|t| t.name().to_string()).collect(),
        })
    }

    /// Path of a required tool
    pub fn path(&self, tool: Tool) -> Result<PathBuf> {
        self.resolve(tool).ok_or_else(|| Error::DependencyMissing {
            tools: vec![tool.name().to_string()],
        })
    }

    /// First line of a tool's version output, `None` if it cannot be queried
    pub async fn version(&self, tool: Tool) -> Option<String> {
        let path = self.resolve(tool)?;
        let spec = CommandSpec::new(path).arg(tool.version_flag());

        match spec.run_buffered(Some(self.config.version_timeout)).await {
            Ok(output) if output.success() => output
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string),
            Ok(output) => {
                tracing::warn!(tool = %tool, exit_code = output.exit_code, "version query failed");
                None
            }
            Err(e) => {
                tracing::warn!(tool = %tool, error = %e, "version query failed");
                None
            }
        }
    }

    /// Versions of several tools, queried concurrently
    pub async fn versions(&self, tools: &[Tool]) -> ToolVersions {
        let versions = futures::future::join_all(tools.iter().map(|tool| self.version(*tool))).await;
        tools
            .iter()
            .map(|tool| tool.name().to_string())
            .zip(versions)
            .collect()
    }

    /// Presence and version of every known tool
    pub async fn status_report(&self) -> BTreeMap<String, ToolStatus> {
        let versions = self.versions(&Tool::ALL).await;
        Tool::ALL
            .iter()
            .map(|tool| {
                let status = ToolStatus {
                    present: self.resolve(*tool).is_some(),
                    version: versions.get(tool.name()).cloned().flatten(),
                };
                (tool.name().to_string(), status)
            })
            .collect()
    }

    /// Startup check: log every tool and fail if any is absent
    pub async fn boot_check(&self) -> Result<()> {
        for (name, status) in self.status_report().await {
            if status.present {
                tracing::info!(
                    tool = %name,
                    version = status.version.as_deref().unwrap_or("unknown"),
                    "tool found"
                );
            } else {
                tracing::error!(tool = %name, "tool not found");
            }
        }
        self.ensure_present(&Tool::ALL)
    }
}
