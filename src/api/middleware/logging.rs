//! Request/response logging middleware.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Level, info, span};

use super::RequestId;

/// Logs every request with its method, path, request id, and once handled,
/// the response status and duration.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let span = span!(
        Level::INFO,
        "http_request",
        method = %method,
        uri = %uri,
        request_id = %request_id
    );
    let _enter = span.enter();

    info!(method = %method, path = %uri.path(), "Request received");

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    info!(
        status = %response.status().as_u16(),
        duration_ms = %duration.as_millis(),
        "Response sent"
    );

    response
}
