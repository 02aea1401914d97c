//! Error types and helpers shared across the application.

mod app_error;

pub use app_error::{AppError, AppResult};

/// Renders an error with its full source chain, one cause per segment.
///
/// Used by the HTTP error handler to put diagnostic detail in the response
/// body without losing intermediate causes.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
