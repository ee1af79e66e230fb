//! Request logging middleware.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Middleware that logs HTTP requests at INFO level, tagging everything
/// logged while handling one with its request id.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!("request", request_id = %request_id);
    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    let duration = start.elapsed();

    span.in_scope(|| {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "HTTP request"
        );
    });

    response
}
