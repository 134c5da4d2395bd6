//! Application state for the API server

use crate::Config;
use crate::orchestrator::DownloadOrchestrator;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; everything inside is either an `Arc` or cheap to
/// clone. Nothing here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Config>,

    /// Download pipeline (also owns the tool checker)
    pub orchestrator: DownloadOrchestrator,

    /// HTTP client for thumbnail fetches
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Arc<Config>) -> Self {
        let orchestrator = DownloadOrchestrator::new(config.clone());
        Self {
            config,
            orchestrator,
            http: reqwest::Client::new(),
        }
    }
}
