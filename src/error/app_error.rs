use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Application-wide error type.
///
/// Rate limiting and upstream failures are the interesting cases here: the
/// throttler raises `RateLimited` before or after an outbound call, and the
/// list/IMDb clients raise the `Upstream*` variants for anything the caller
/// has to surface as a request failure. A missing IMDb id is not an error at
/// all; it travels as `Ok(None)` and ends up in the negative cache.
#[derive(Error, Debug)]
pub enum AppError {
    /// The target host is throttled; no network call was made.
    #[error(
        "Rate limited by {host}. Need to wait at least {wait_secs:.0} seconds before the next call."
    )]
    RateLimited { host: String, wait_secs: f64 },

    /// Upstream returned a non-success status the caller must handle.
    #[error("Upstream request to {url} failed with status {status}")]
    UpstreamStatus { url: String, status: u16 },

    /// The request never produced a usable response (connect, timeout, body
    /// read, JSON decode).
    #[error("Upstream request to {url} failed")]
    UpstreamTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered 2xx but the payload does not have the expected shape.
    #[error("Unexpected upstream payload from {url}: {message}")]
    UpstreamPayload { url: String, message: String },

    /// Forbidden access error with authorization message
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}: {message}")]
    Configuration { key: String, message: String },

    /// Cache operation error
    #[error("Cache error")]
    Cache(#[from] CacheError),

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Configuration {
            key: "config".to_string(),
            message: error.to_string(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
