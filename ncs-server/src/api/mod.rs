//! HTTP API.
//!
//! Exactly one vision operation is routed per instance; the other name falls
//! through to the router's 404.

pub mod health;
pub mod vision;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use ncs_common::RequestMode;
use tower_http::cors::CorsLayer;

use crate::logging::request_logger;
use crate::state::AppState;

/// Build the API router for `mode`.
pub fn router(mode: RequestMode) -> Router<Arc<AppState>> {
    Router::new().merge(vision::router(mode))
}

/// The full application: the operation route, health, request logging and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    let mode = state.gateway.mode();
    Router::new()
        .merge(router(mode))
        .route("/health", get(health::health))
        .layer(middleware::from_fn(request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
