//! Shared test helpers: fake yt-dlp/ffmpeg/ffprobe binaries.
//!
//! Each fake is a POSIX shell script in a temp dir. Every invocation appends
//! one word to a log file (`version`, `metadata` or `download`) so tests can
//! assert exactly which subprocesses ran.

use crate::config::{Config, ToolsConfig};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Which pipe a scripted download line is written to
#[derive(Clone, Copy, Debug)]
pub(crate) enum Pipe {
    Stdout,
    Stderr,
}

/// Scripted behaviour for the fake tools
#[derive(Clone, Debug)]
pub(crate) struct FakeToolsBuilder {
    title: String,
    thumbnail: Option<String>,
    lines: Vec<(Pipe, String)>,
    download_exit: i32,
    write_file: bool,
    hang: bool,
    metadata_exit: i32,
    metadata_delay_secs: u64,
    metadata_stdout: Option<String>,
    with_ffmpeg: bool,
}

impl Default for FakeToolsBuilder {
    fn default() -> Self {
        Self {
            title: "Test Video".into(),
            thumbnail: None,
            lines: Vec::new(),
            download_exit: 0,
            write_file: true,
            hang: false,
            metadata_exit: 0,
            metadata_delay_secs: 0,
            metadata_stdout: None,
            with_ffmpeg: true,
        }
    }
}

impl FakeToolsBuilder {
    pub(crate) fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub(crate) fn thumbnail(mut self, url: &str) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub(crate) fn stdout(mut self, line: &str) -> Self {
        self.lines.push((Pipe::Stdout, line.into()));
        self
    }

    pub(crate) fn stderr(mut self, line: &str) -> Self {
        self.lines.push((Pipe::Stderr, line.into()));
        self
    }

    pub(crate) fn download_exit(mut self, code: i32) -> Self {
        self.download_exit = code;
        self
    }

    /// Skip creating the output file on a successful download
    pub(crate) fn no_file(mut self) -> Self {
        self.write_file = false;
        self
    }

    /// Print the scripted lines, record the PID, then sleep for a long time
    pub(crate) fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub(crate) fn metadata_exit(mut self, code: i32) -> Self {
        self.metadata_exit = code;
        self
    }

    pub(crate) fn metadata_delay_secs(mut self, secs: u64) -> Self {
        self.metadata_delay_secs = secs;
        self
    }

    pub(crate) fn metadata_stdout(mut self, stdout: &str) -> Self {
        self.metadata_stdout = Some(stdout.into());
        self
    }

    pub(crate) fn without_ffmpeg(mut self) -> Self {
        self.with_ffmpeg = false;
        self
    }

    pub(crate) fn build(self) -> FakeTools {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("invocations.log");
        let args_log = dir.path().join("download-args.log");
        let pid_file = dir.path().join("download.pid");

        let metadata_json = self.metadata_stdout.clone().unwrap_or_else(|| {
            serde_json::json!({
                "id": "fake123",
                "title": self.title,
                "duration": 212,
                "uploader": "Fake Uploader",
                "upload_date": "20240101",
                "view_count": 42,
                "thumbnail": self.thumbnail,
                "description": "A fake video",
                "tags": ["fake"],
                "formats": [{"format_id": "18", "ext": "mp4", "resolution": "640x360"}]
            })
            .to_string()
        });

        let mut script = format!(
            "#!/bin/sh\n\
             LOG={log}\n\
             case \"$1\" in\n\
             --version) echo version >> \"$LOG\"; echo 2024.08.06; exit 0 ;;\n\
             -j)\n\
             echo metadata >> \"$LOG\"\n\
             sleep {delay}\n\
             if [ {mexit} -ne 0 ]; then echo 'ERROR: metadata unavailable' >&2; exit {mexit}; fi\n\
             printf '%s\\n' {json}\n\
             exit 0 ;;\n\
             esac\n\
             echo download >> \"$LOG\"\n\
             echo \"$@\" > {args}\n\
             OUT=''\n\
             EXT=mp4\n\
             while [ $# -gt 0 ]; do\n\
             case \"$1\" in\n\
             -o) OUT=\"$2\" ;;\n\
             --merge-output-format) EXT=\"$2\" ;;\n\
             esac\n\
             shift\n\
             done\n",
            log = quote(&log.display().to_string()),
            delay = self.metadata_delay_secs,
            mexit = self.metadata_exit,
            json = quote(&metadata_json),
            args = quote(&args_log.display().to_string()),
        );

        for (pipe, line) in &self.lines {
            let redirect = match pipe {
                Pipe::Stdout => "",
                Pipe::Stderr => " >&2",
            };
            script.push_str(&format!("printf '%s\\n' {}{}\n", quote(line), redirect));
        }

        if self.hang {
            script.push_str(&format!(
                "echo $$ > {}\nexec sleep 30\n",
                quote(&pid_file.display().to_string())
            ));
        }

        if self.download_exit == 0 && self.write_file {
            script.push_str(&format!(
                "printf 'fake video bytes' > \"$(dirname \"$OUT\")\"/{}.\"$EXT\"\n",
                quote(&self.title)
            ));
        }
        script.push_str(&format!("exit {}\n", self.download_exit));

        let ytdlp = dir.path().join("yt-dlp");
        write_script(&ytdlp, &script);

        let version_script = |name: &str| {
            format!(
                "#!/bin/sh\necho version >> {}\necho '{} version 6.1-fake'\n",
                quote(&log.display().to_string()),
                name
            )
        };
        let ffmpeg = dir.path().join("ffmpeg");
        if self.with_ffmpeg {
            write_script(&ffmpeg, &version_script("ffmpeg"));
        }
        let ffprobe = dir.path().join("ffprobe");
        write_script(&ffprobe, &version_script("ffprobe"));

        FakeTools {
            dir,
            log,
            args_log,
            pid_file,
            title: self.title,
        }
    }
}

/// A temp dir holding fake tool scripts and their invocation log
pub(crate) struct FakeTools {
    dir: TempDir,
    log: PathBuf,
    args_log: PathBuf,
    pid_file: PathBuf,
    title: String,
}

impl FakeTools {
    pub(crate) fn builder() -> FakeToolsBuilder {
        FakeToolsBuilder::default()
    }

    pub(crate) fn ytdlp(&self) -> PathBuf {
        self.dir.path().join("yt-dlp")
    }

    pub(crate) fn tools_config(&self) -> ToolsConfig {
        ToolsConfig {
            ytdlp_path: Some(self.ytdlp()),
            ffmpeg_path: Some(self.dir.path().join("ffmpeg")),
            ffprobe_path: Some(self.dir.path().join("ffprobe")),
            search_path: false,
            ..Default::default()
        }
    }

    /// Configuration pointing at the fakes, writing into `<tempdir>/downloads`
    pub(crate) fn config(&self) -> Config {
        let mut config = Config::default();
        config.tools = self.tools_config();
        config.download.output_dir = self.output_dir();
        config
    }

    pub(crate) fn output_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    /// Where a successful download lands
    pub(crate) fn artifact(&self) -> PathBuf {
        self.output_dir().join(format!("{}.mp4", self.title))
    }

    /// Logged invocation kinds, in order
    pub(crate) fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Invocations other than version queries
    pub(crate) fn work_invocations(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|kind| kind != "version")
            .collect()
    }

    /// Arguments of the last download invocation
    pub(crate) fn download_args(&self) -> String {
        std::fs::read_to_string(&self.args_log)
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    /// PID recorded by a hanging download, once it is available
    pub(crate) async fn wait_for_pid(&self) -> u32 {
        for _ in 0..200 {
            if let Ok(pid) = std::fs::read_to_string(&self.pid_file) {
                if let Ok(pid) = pid.trim().parse() {
                    return pid;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        panic!("fake download never recorded its PID");
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Single-quote a string for sh
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
