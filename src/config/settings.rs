//! Configuration settings structures for doudarr.
//!
//! All sections deserialize from TOML files and `DOUDARR_`-prefixed
//! environment variables; every field carries a default so the proxy runs
//! with no configuration at all.

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::LogFormat;

// ============================================================================
// Default value functions
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cache_base_dir() -> String {
    "cache".to_string()
}

fn default_douban_api_base_url() -> String {
    "https://m.douban.com/rexxar/api/v2".to_string()
}

fn default_douban_request_delay_max() -> f64 {
    1.0
}

fn default_list_cache_ttl() -> f64 {
    3600.0 * 24.0
}

fn default_rate_limit_delay() -> f64 {
    3600.0
}

fn default_movie_base_url() -> String {
    "https://movie.douban.com".to_string()
}

fn default_imdb_request_delay_max() -> f64 {
    30.0
}

fn default_not_found_ttl() -> f64 {
    3600.0 * 24.0
}

fn default_idatabase_timeout() -> f64 {
    30.0
}

fn default_bootstrap_interval() -> f64 {
    3600.0 * 24.0
}

fn default_bootstrap_list_interval() -> f64 {
    30.0
}

fn default_bootstrap_lists_max() -> usize {
    100
}

fn default_sync_interval() -> f64 {
    3600.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Base directory for the on-disk caches. Each cache (collection,
    /// doulist, imdb) lives in its own subdirectory.
    #[serde(default = "default_cache_base_dir")]
    pub base_dir: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            base_dir: default_cache_base_dir(),
        }
    }
}

// ============================================================================
// Douban Configuration
// ============================================================================

/// Settings for talking to the Douban list API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubanSettings {
    /// Base URL of the Douban mobile list API.
    #[serde(default = "default_douban_api_base_url")]
    pub api_base_url: String,

    /// Maximum random delay between two list page requests, in seconds.
    #[serde(default = "default_douban_request_delay_max")]
    pub request_delay_max_seconds: f64,

    /// TTL for cached list snapshots, in seconds.
    #[serde(default = "default_list_cache_ttl")]
    pub list_cache_ttl_seconds: f64,

    /// How long to back off after Douban redirects to its security challenge.
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_seconds: f64,

    /// Optional outbound proxy for all HTTP requests.
    #[serde(default)]
    pub proxy_address: Option<String>,

    /// Optional `dbcl2` session cookie, to call Douban as a logged-in user.
    #[serde(default)]
    pub cookie_dbcl2: Option<String>,
}

impl Default for DoubanSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_douban_api_base_url(),
            request_delay_max_seconds: default_douban_request_delay_max(),
            list_cache_ttl_seconds: default_list_cache_ttl(),
            rate_limit_delay_seconds: default_rate_limit_delay(),
            proxy_address: None,
            cookie_dbcl2: None,
        }
    }
}

// ============================================================================
// IMDb Resolver Configuration
// ============================================================================

/// Settings for the IMDb id resolver.
///
/// When `idatabase_url` is set, the resolver queries that service instead of
/// scraping the Douban details page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbSettings {
    /// Base URL of the Douban movie details site (HTML provider).
    #[serde(default = "default_movie_base_url")]
    pub movie_base_url: String,

    /// Maximum random delay before a details-page fetch, in seconds.
    #[serde(default = "default_imdb_request_delay_max")]
    pub request_delay_max_seconds: f64,

    /// TTL for cached "IMDb id not found" results, in seconds. Found ids are
    /// cached without expiry.
    #[serde(default = "default_not_found_ttl")]
    pub not_found_ttl_seconds: f64,

    /// Base URL of the idatabase lookup service. Selects the idatabase
    /// provider when present.
    #[serde(default)]
    pub idatabase_url: Option<String>,

    /// Request timeout for the idatabase service, in seconds.
    #[serde(default = "default_idatabase_timeout")]
    pub idatabase_timeout_seconds: f64,

    /// Optional API key sent to the idatabase service as `X-API-Key`.
    #[serde(default)]
    pub idatabase_api_key: Option<String>,
}

impl Default for ImdbSettings {
    fn default() -> Self {
        Self {
            movie_base_url: default_movie_base_url(),
            request_delay_max_seconds: default_imdb_request_delay_max(),
            not_found_ttl_seconds: default_not_found_ttl(),
            idatabase_url: None,
            idatabase_timeout_seconds: default_idatabase_timeout(),
            idatabase_api_key: None,
        }
    }
}

// ============================================================================
// Bootstrap Configuration
// ============================================================================

/// Cadence and fan-out limits for the background cache pre-warming loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Seconds between two bootstrap runs.
    #[serde(default = "default_bootstrap_interval")]
    pub interval_seconds: f64,

    /// Seconds to sleep between two lists within one run.
    #[serde(default = "default_bootstrap_list_interval")]
    pub list_interval_seconds: f64,

    /// Maximum number of distinct lists visited per run.
    #[serde(default = "default_bootstrap_lists_max")]
    pub lists_max: usize,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_bootstrap_interval(),
            list_interval_seconds: default_bootstrap_list_interval(),
            lists_max: default_bootstrap_lists_max(),
        }
    }
}

// ============================================================================
// Sync Configuration
// ============================================================================

/// Peer replication of the IMDb cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Seconds between two push rounds.
    #[serde(default = "default_sync_interval")]
    pub interval_seconds: f64,

    /// Peer `/sync?apikey=...` URLs to push the IMDb cache to. Empty
    /// disables the sync loop.
    #[serde(default)]
    pub push_to: Vec<String>,

    /// API key required from callers of our own `/sync` endpoint.
    #[serde(default)]
    pub apikey: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_sync_interval(),
            push_to: Vec::new(),
            apikey: None,
        }
    }
}

// ============================================================================
// Logger Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level filter (tracing `EnvFilter` syntax).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to use ANSI colors when stdout is a terminal.
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            colored: default_true(),
        }
    }
}

// ============================================================================
// Root Settings
// ============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub douban: DoubanSettings,

    #[serde(default)]
    pub imdb: ImdbSettings,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub logger: LoggerSettings,
}

impl Settings {
    /// Validates cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.douban.request_delay_max_seconds < 0.0
            || self.imdb.request_delay_max_seconds < 0.0
        {
            return Err(ConfigError::Validation(
                "request delay bounds must not be negative".to_string(),
            ));
        }
        if self.bootstrap.lists_max == 0 {
            return Err(ConfigError::Validation(
                "bootstrap.lists_max must be at least 1".to_string(),
            ));
        }
        for url in &self.sync.push_to {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Validation(format!("invalid sync peer URL {url}: {e}")))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Validation(format!(
                    "sync peer URL {url} must use http or https"
                )));
            }
        }
        Ok(())
    }
}
