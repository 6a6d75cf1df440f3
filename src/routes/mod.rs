use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod analyses;
pub mod error;
pub mod health;
pub mod metrics;
pub mod params;

#[cfg(test)]
mod tests;

/// Multipart framing and the description field on top of the file itself.
pub const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// API and health routes with state applied.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/analyses",
            post(analyses::submit_analysis).get(analyses::list_analyses),
        )
        .route(
            "/api/v1/analyses/{id}",
            get(analyses::get_analysis).delete(analyses::delete_analysis),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
