//! Configuration loader.
//!
//! Sources, in order of priority:
//! 1. an optional TOML file (`--config`, `DOUDARR_CONFIG_FILE`, or
//!    `config.toml` in the working directory)
//! 2. `DOUDARR_*` environment variables (highest priority), with `__` as the
//!    separator for nested keys, e.g. `DOUDARR_DOUBAN__LIST_CACHE_TTL_SECONDS`.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};

use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Default configuration file, loaded only if present
const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "DOUDARR";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

#[derive(Debug)]
pub struct ConfigLoader {
    /// Explicit configuration file path, if any
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader. An explicitly named file must exist; the implicit
    /// `config.toml` is optional.
    pub fn new(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(ref path) = config_file
            && !path.is_file()
        {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        Ok(Self { config_file })
    }

    /// Load and validate settings from all sources.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        builder = match self.config_file {
            Some(ref path) => builder.add_source(
                File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(true),
            ),
            None => builder
                .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        // Environment variables are always highest priority:
        // DOUDARR_SERVER__PORT -> server.port
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sync.push_to"),
        );

        let settings: Settings = builder.build()?.try_deserialize().map_err(|e| {
            ConfigError::Parse(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.cache.base_dir, "cache");
        assert_eq!(settings.douban.list_cache_ttl_seconds, 3600.0 * 24.0);
        assert_eq!(settings.imdb.idatabase_url, None);
        assert!(settings.sync.push_to.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [server]
            port = 9000

            [douban]
            list_cache_ttl_seconds = 60.0

            [sync]
            push_to = ["http://peer:8000/sync?apikey=k"]
            apikey = "secret"
            "#,
        )
        .unwrap();

        let settings = ConfigLoader::new(Some(path)).unwrap().load().unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.douban.list_cache_ttl_seconds, 60.0);
        assert_eq!(settings.sync.push_to.len(), 1);
        assert_eq!(settings.sync.apikey.as_deref(), Some("secret"));
        // Untouched sections keep their defaults
        assert_eq!(settings.bootstrap.lists_max, 100);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new(Some(PathBuf::from("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_peer_url_rejected() {
        let mut settings = Settings::default();
        settings.sync.push_to = vec!["not a url".to_string()];
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Validation(_))
        ));
    }
}
