//! Data transfer objects for the HTTP API.

mod error;
mod list;
mod stats;

pub use error::ErrorResponse;
pub use list::{ListQuery, ResolvedItem, SyncQuery};
pub use stats::{CacheSizes, StatsResponse};
