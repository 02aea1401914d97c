//! Cache error types.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache operation failed: {0}")]
    Operation(String),

    #[error("Failed to open cache: {0}")]
    Open(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
