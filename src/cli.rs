//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;

/// A caching proxy that serves Douban movie lists with IMDb ids.
#[derive(Parser, Debug)]
#[command(name = "doudarr", version, about)]
pub struct Cli {
    /// Configuration file path (TOML). Defaults to `config.toml` in the
    /// working directory if present.
    #[arg(short, long, value_name = "FILE", env = "DOUDARR_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Host address to bind to, overriding the configuration.
    #[arg(long, value_name = "ADDRESS")]
    pub host: Option<String>,

    /// Port to listen on, overriding the configuration.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log level filter, overriding the configuration (tracing syntax, e.g.
    /// `debug` or `doudarr=debug,info`).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Applies command line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(ref host) = self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logger.level = level.clone();
        }
    }
}
