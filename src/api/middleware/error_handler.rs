//! Conversion of `AppError` into HTTP responses.
//!
//! Rate limiting maps to 503 so that consumers (Radarr and friends) treat it
//! as temporary and retry later; upstream failures map to 502 because the
//! proxy itself is healthy.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::dto::ErrorResponse;
use crate::error::{AppError, error_chain};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::RateLimited { .. } => (StatusCode::SERVICE_UNAVAILABLE, "RATE_LIMITED"),
            AppError::UpstreamStatus { .. }
            | AppError::UpstreamTransport { .. }
            | AppError::UpstreamPayload { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Configuration { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            AppError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            AppError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_chain(&self), "Request failed");
        }

        let body = ErrorResponse::new(code, &self.to_string()).with_details(&error_chain(&self));
        (status, Json(body)).into_response()
    }
}
