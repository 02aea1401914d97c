//! Application state shared across request handlers and background tasks.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::AppResult;
use crate::external::douban::{ListApi, ListFlavor};
use crate::external::imdb::ImdbResolver;
use crate::external::throttler::Throttler;

/// Shared services. Cloning is cheap, everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<ListApi>,
    pub doulists: Arc<ListApi>,
    pub imdb: Arc<ImdbResolver>,
    pub throttler: Arc<Throttler>,
    /// API key the sync receiver requires from callers.
    pub sync_apikey: Option<String>,
}

impl AppState {
    /// Builds every service from the loaded configuration. The throttler is
    /// shared by all outbound clients so a rate-limit signal seen by one of
    /// them blocks the host for all of them.
    pub fn new(settings: &Settings) -> AppResult<Self> {
        let throttler = Arc::new(Throttler::new(settings.douban.rate_limit_delay_seconds));
        let collections = Arc::new(ListApi::new(
            ListFlavor::Collection,
            settings,
            throttler.clone(),
        )?);
        let doulists = Arc::new(ListApi::new(ListFlavor::Doulist, settings, throttler.clone())?);
        let imdb = Arc::new(ImdbResolver::from_settings(settings, throttler.clone())?);

        Ok(Self {
            collections,
            doulists,
            imdb,
            throttler,
            sync_apikey: settings.sync.apikey.clone(),
        })
    }
}
