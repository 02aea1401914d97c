//! Doudarr — a caching proxy that serves Douban movie lists with IMDb ids.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod jobs;
pub mod logger;
pub mod server;
pub mod state;

pub use state::AppState;
