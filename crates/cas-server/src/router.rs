use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all store endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(handler::upload))
        .route("/download/:hash", get(handler::download))
        .route("/delete/:hash", delete(handler::delete))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
