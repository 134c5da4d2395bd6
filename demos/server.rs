//! yt-relay server
//!
//! Reads configuration from the environment (and a `.env` file if present),
//! checks that yt-dlp, ffmpeg and ffprobe are installed, then serves the API.
//!
//! ```text
//! PORT=5000 OUTPUT_DIR=downloads cargo run --example server
//! ```
//!
//! After starting, you can:
//! - Download as JSON:  curl 'http://localhost:5000/download?url=https://youtu.be/dQw4w9WgXcQ'
//! - Stream progress:   curl -N 'http://localhost:5000/download?url=https://youtu.be/dQw4w9WgXcQ&stream=true'
//! - Fetch the file:    curl -OJ 'http://localhost:5000/download?url=https://youtu.be/dQw4w9WgXcQ&binary=true'
//! - Look up metadata:  curl 'http://localhost:5000/details?url=https://youtu.be/dQw4w9WgXcQ'
//! - View Swagger UI at http://localhost:5000/swagger-ui

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yt_relay::{Config, ToolChecker, api::start_api_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("yt_relay=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    if let Err(e) = ToolChecker::new(config.tools.clone()).boot_check().await {
        tracing::error!(error = %e, "refusing to start without the required tools");
        std::process::exit(1);
    }

    let address = config.server.api.bind_address;
    println!("🚀 Starting yt-relay on http://{}", address);
    if config.server.api.swagger_ui {
        println!("📖 Swagger UI: http://{}/swagger-ui", address);
    }

    start_api_server(Arc::new(config)).await?;
    Ok(())
}
