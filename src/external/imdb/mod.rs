//! IMDb id resolution with negative caching.
//!
//! Two providers exist: scraping the Douban details page (default) and the
//! idatabase lookup service (selected when `imdb.idatabase_url` is
//! configured). The choice is made once at startup; the resolver itself only
//! knows the `ImdbProvider` capability.

mod html;
mod idatabase;
mod provider;

pub use html::HtmlImdbProvider;
pub use idatabase::IdatabaseImdbProvider;
pub use provider::ImdbProvider;

use std::path::Path;
use std::sync::Arc;

use crate::cache::DiskCache;
use crate::config::Settings;
use crate::error::AppResult;
use crate::external::douban::ListItem;
use crate::external::throttler::Throttler;

pub struct ImdbResolver {
    cache: DiskCache,
    provider: Box<dyn ImdbProvider>,
    not_found_ttl: f64,
}

impl ImdbResolver {
    /// Builds the resolver with the provider selected by configuration.
    pub fn from_settings(settings: &Settings, throttler: Arc<Throttler>) -> AppResult<Self> {
        let provider: Box<dyn ImdbProvider> = match settings.imdb.idatabase_url.as_deref() {
            Some(url) if !url.is_empty() => {
                tracing::info!(%url, "Using idatabase IMDb provider");
                Box::new(IdatabaseImdbProvider::new(url, settings, throttler)?)
            }
            _ => {
                tracing::info!("Using Douban HTML IMDb provider");
                Box::new(HtmlImdbProvider::new(settings, throttler)?)
            }
        };
        let cache = DiskCache::open(Path::new(&settings.cache.base_dir).join("imdb"))?;
        Ok(Self::with_provider(
            cache,
            provider,
            settings.imdb.not_found_ttl_seconds,
        ))
    }

    pub fn with_provider(
        cache: DiskCache,
        provider: Box<dyn ImdbProvider>,
        not_found_ttl: f64,
    ) -> Self {
        Self {
            cache,
            provider,
            not_found_ttl,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Resolves the IMDb id for one Douban subject.
    ///
    /// The cache read is three-state: a hit (with or without an id) is
    /// returned as-is, only a true miss reaches the provider. A resolved id
    /// is cached permanently; a not-found result is cached with the
    /// configured TTL so a later retry can pick the id up once the upstream
    /// catalog learns it. Concurrent misses on the same id may both invoke
    /// the provider; the fetch is idempotent, so the duplicate is accepted.
    pub async fn get_imdb_id(&self, douban_id: &str, item: &ListItem) -> AppResult<Option<String>> {
        if let Some(cached) = self.cache.get::<Option<String>>(douban_id)? {
            return Ok(cached);
        }

        let imdb_id = self.provider.fetch_imdb_id(douban_id, item).await?;
        let ttl = if imdb_id.is_none() {
            Some(self.not_found_ttl)
        } else {
            None
        };
        self.cache.set(douban_id, &imdb_id, ttl)?;
        Ok(imdb_id)
    }
}
