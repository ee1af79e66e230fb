//! Error types for the image server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A vision parameter failed validation. Always fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid param {field} = {value:?}: {reason}")]
pub struct ConfigurationError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// The engine could not be built from a valid configuration.
#[derive(Debug, thiserror::Error)]
pub enum EngineConstructionError {
    #[error("Engine rejected configuration: {0}")]
    Rejected(String),

    #[error("Engine communication error: {0}")]
    Communication(String),

    #[error("Engine already initialized")]
    AlreadyInitialized,
}

/// Anything that keeps the gateway from reaching the serving state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Engine(#[from] EngineConstructionError),
}

/// Decoding an image file into a pixel buffer failed.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("cannot read image {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("image is empty: {0}")]
    Empty(String),
}

/// A single request failed. Scoped to that request; gateway state is untouched.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    #[error("Image load failed: {0}")]
    ImageLoad(#[from] ImageLoadError),

    #[error("Engine returned no result for {operation}")]
    NoResult { operation: &'static str },

    #[error("Gateway is not serving")]
    NotServing,

    #[error("Operation not registered: {0}")]
    OperationNotRegistered(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RequestFailure {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RequestFailure::ImageLoad(_) => (StatusCode::BAD_REQUEST, "image_load_failed"),
            RequestFailure::NoResult { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "inference_failed")
            }
            RequestFailure::NotServing => (StatusCode::SERVICE_UNAVAILABLE, "not_serving"),
            RequestFailure::OperationNotRegistered(_) => {
                (StatusCode::NOT_FOUND, "operation_not_registered")
            }
            RequestFailure::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RequestFailure>;
