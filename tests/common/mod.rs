//! Common test utilities for yt-relay integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use yt_relay::Config;
use yt_relay::config::ToolsConfig;

/// A URL every validation pattern accepts
pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Write fake yt-dlp, ffmpeg and ffprobe scripts into a temp dir
///
/// The fake yt-dlp answers `--version` and `-j`, and for a download prints
/// `download_lines` to stdout before writing `<dir of -o>/Integration.mp4`.
pub fn fake_tools(download_lines: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut ytdlp = String::from(
        "#!/bin/sh\n\
         case \"$1\" in\n\
         --version) echo 2024.08.06; exit 0 ;;\n\
         -j) echo '{\"id\":\"int1\",\"title\":\"Integration\",\"duration\":5}'; exit 0 ;;\n\
         esac\n\
         OUT=''\n\
         while [ $# -gt 0 ]; do\n\
         if [ \"$1\" = -o ]; then OUT=\"$2\"; fi\n\
         shift\n\
         done\n",
    );
    for line in download_lines {
        ytdlp.push_str(&format!("echo '{}'\n", line.replace('\'', "'\\''")));
    }
    ytdlp.push_str("printf 'integration bytes' > \"$(dirname \"$OUT\")/Integration.mp4\"\n");

    write_script(&dir.path().join("yt-dlp"), &ytdlp);
    write_script(
        &dir.path().join("ffmpeg"),
        "#!/bin/sh\necho 'ffmpeg version 6.1-fake'\n",
    );
    write_script(
        &dir.path().join("ffprobe"),
        "#!/bin/sh\necho 'ffprobe version 6.1-fake'\n",
    );
    dir
}

/// Configuration pointing at the fakes in `dir`
pub fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.tools = ToolsConfig {
        ytdlp_path: Some(dir.join("yt-dlp")),
        ffmpeg_path: Some(dir.join("ffmpeg")),
        ffprobe_path: Some(dir.join("ffprobe")),
        search_path: false,
        ..Default::default()
    };
    config.download.output_dir = dir.join("downloads");
    config
}

/// A running server and the means to stop it
pub struct TestServer {
    pub address: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<yt_relay::Result<()>>,
}

impl TestServer {
    /// Serve `config` on an ephemeral localhost port
    pub async fn start(config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(yt_relay::api::serve(
            listener,
            Arc::new(config),
            async move {
                let _ = stopped.await;
            },
        ));

        Self {
            address,
            stop: Some(stop),
            handle,
        }
    }

    /// `http://<address><path_and_query>`
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.address, path_and_query)
    }

    /// Trigger graceful shutdown and wait for the server to exit
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle
            .await
            .expect("server task")
            .expect("server exited cleanly");
    }
}

/// Split an SSE body into `(event, data)` pairs
pub fn sse_frames(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut event = String::new();
            let mut data = serde_json::Value::Null;
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event: ") {
                    event = name.to_string();
                } else if let Some(json) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(json).expect("frame data is JSON");
                }
            }
            (event, data)
        })
        .collect()
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}
