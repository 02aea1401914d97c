//! Cached access to Douban lists.
//!
//! Two list flavors exist — curated subject collections and user-curated
//! doulists. They share pagination and caching and differ only in endpoint
//! path, cache namespace and the JSON key the page items live under, so both
//! are instances of one parameterized [`ListApi`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::header::REFERER;

use crate::cache::DiskCache;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::external::client::SourceClient;
use crate::external::douban::types::{ListInfo, ListItem};
use crate::external::pagination::{Page, paginate};
use crate::external::sleep_jitter;
use crate::external::throttler::Throttler;

const PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFlavor {
    Collection,
    Doulist,
}

impl ListFlavor {
    fn sub_path(self) -> &'static str {
        match self {
            ListFlavor::Collection => "subject_collection",
            ListFlavor::Doulist => "doulist",
        }
    }

    fn items_key(self) -> &'static str {
        match self {
            ListFlavor::Collection => "subject_collection_items",
            ListFlavor::Doulist => "items",
        }
    }

    fn cache_name(self) -> &'static str {
        match self {
            ListFlavor::Collection => "collection",
            ListFlavor::Doulist => "doulist",
        }
    }
}

impl fmt::Display for ListFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_name())
    }
}

pub struct ListApi {
    flavor: ListFlavor,
    client: SourceClient,
    cache: DiskCache,
    request_delay_max: f64,
    list_ttl: f64,
}

impl ListApi {
    pub fn new(
        flavor: ListFlavor,
        settings: &Settings,
        throttler: Arc<Throttler>,
    ) -> AppResult<Self> {
        let sub_path = flavor.sub_path();
        let client = SourceClient::builder(throttler)
            .base_url(&format!("{}/{}", settings.douban.api_base_url, sub_path))
            .header(REFERER, &format!("https://m.douban.com/{sub_path}"))?
            .proxy(settings.douban.proxy_address.as_deref())
            .douban_cookie(settings.douban.cookie_dbcl2.as_deref())
            .build()?;
        let cache = DiskCache::open(Path::new(&settings.cache.base_dir).join(flavor.cache_name()))?;
        Ok(Self {
            flavor,
            client,
            cache,
            request_delay_max: settings.douban.request_delay_max_seconds,
            list_ttl: settings.douban.list_cache_ttl_seconds,
        })
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// List metadata. Not cached; only bootstrap calls this, once per list
    /// per run.
    pub async fn get_info(&self, id: &str) -> AppResult<ListInfo> {
        self.client.get_json(id).await
    }

    /// The full item sequence of a list.
    ///
    /// Served from the cache when a live snapshot exists. Otherwise the list
    /// is paged in completely and cached as a single snapshot before
    /// returning; a failure mid-pagination propagates and caches nothing.
    /// Concurrent misses on the same id may fetch twice — the fetch is
    /// idempotent and the last writer wins.
    pub async fn get_items(&self, id: &str) -> AppResult<Vec<ListItem>> {
        if let Some(items) = self.cache.get::<Vec<ListItem>>(id)? {
            return Ok(items);
        }

        tracing::info!(flavor = %self.flavor, list = %id, "Fetching items");
        let items: Vec<ListItem> =
            paginate(PAGE_SIZE, |start, count| self.read_page(id, start, count))
                .try_collect()
                .await?;
        tracing::info!(flavor = %self.flavor, list = %id, count = items.len(), "Fetched items");

        self.cache.set(id, &items, Some(self.list_ttl))?;
        Ok(items)
    }

    async fn read_page(&self, id: &str, start: u64, count: u64) -> AppResult<Page<ListItem>> {
        sleep_jitter(self.request_delay_max).await;
        let path = format!("{id}/items?start={start}&count={count}");
        let data: serde_json::Value = self.client.get_json(&path).await?;

        let total = data
            .get("total")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| AppError::UpstreamPayload {
                url: path.clone(),
                message: "missing or non-numeric total".to_string(),
            })?;

        let raw_items = data
            .get(self.flavor.items_key())
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();
        let items = raw_items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ListItem>, _>>()
            .map_err(|e| AppError::UpstreamPayload {
                url: path,
                message: format!("malformed item: {e}"),
            })?;

        Ok(Page { total, items })
    }
}
