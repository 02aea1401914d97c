//! Persistent key-value caching with per-entry TTL.
//!
//! Two independent caches back the proxy: one per list flavor for full list
//! snapshots, and one for resolved IMDb ids. Both survive process restarts.

mod disk;
mod error;

pub use disk::{DiskCache, unix_now};
pub use error::CacheError;
