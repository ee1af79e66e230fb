//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::gateway::GatewayState;
use crate::state::AppState;

/// GET /health - Gateway state and what it serves.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let gateway = &state.gateway;
    let (status, label) = match gateway.state() {
        GatewayState::Serving => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };

    (
        status,
        Json(json!({
            "status": label,
            "state": gateway.state(),
            "mode": gateway.mode(),
            "model": gateway.config().model_kind(),
            "operation": gateway.operation(),
            "serving_since": gateway.serving_since().map(|t| t.to_rfc3339()),
        })),
    )
}
