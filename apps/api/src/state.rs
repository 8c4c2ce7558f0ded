use std::sync::Arc;

use crate::scoring::pipeline::ScoringPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; owns the resolved model handle for the process lifetime.
    pub pipeline: Arc<ScoringPipeline>,
    /// Multipart request body cap, in bytes.
    pub max_upload_bytes: usize,
}
