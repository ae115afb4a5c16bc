pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Portfolio API
        .route(
            "/api/v1/portfolio/generate",
            post(handlers::handle_generate),
        )
        .route(
            "/api/v1/portfolio/status/:job_id",
            get(handlers::handle_status),
        )
        .route(
            "/api/v1/portfolio/owner/:owner",
            get(handlers::handle_owner_portfolio),
        )
        .with_state(state)
}
