//! Configuration loading and validation.

mod error;
mod loader;
pub mod settings;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{BootstrapSettings, Settings, SyncSettings};
