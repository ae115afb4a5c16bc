use std::sync::Arc;

use crate::config::Config;
use crate::generation::orchestrator::JobOrchestrator;
use crate::render::PreviewRenderer;
use crate::storage::ProgressStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub orchestrator: Arc<JobOrchestrator>,
    /// One renderer for the whole process; its session pool is the global
    /// bound on concurrent browser sessions.
    pub renderer: Arc<PreviewRenderer>,
    pub config: Config,
}
