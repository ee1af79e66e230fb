//! The classify/detect operation endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ncs_common::{
    ClassifyObjectRequest, ClassifyObjectResponse, DetectObjectRequest, DetectObjectResponse,
    RequestMode,
};

use crate::error::Result;
use crate::state::AppState;

/// Register the handler for `mode` under its operation name.
pub fn router(mode: RequestMode) -> Router<Arc<AppState>> {
    let path = format!("/{}", mode.operation_name());
    match mode {
        RequestMode::Classification => Router::new().route(&path, post(classify_object)),
        RequestMode::Detection => Router::new().route(&path, post(detect_object)),
    }
}

/// POST /classify_object - Rank the categories in an image.
async fn classify_object(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyObjectRequest>,
) -> Result<Json<ClassifyObjectResponse>> {
    tracing::debug!("classify_object request for {}", request.image_path);
    let response = state.gateway.handle_classify(&request).await?;
    Ok(Json(response))
}

/// POST /detect_object - Locate objects in an image.
async fn detect_object(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectObjectRequest>,
) -> Result<Json<DetectObjectResponse>> {
    tracing::debug!("detect_object request for {}", request.image_path);
    let response = state.gateway.handle_detect(&request).await?;
    Ok(Json(response))
}
