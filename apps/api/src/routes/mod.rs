pub mod health;
pub mod score;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(health::health_handler))
        .route("/api/score", post(score::handle_score))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
