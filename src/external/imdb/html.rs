//! IMDb id resolution by scraping the Douban movie details page.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::config::Settings;
use crate::error::AppResult;
use crate::external::client::SourceClient;
use crate::external::douban::ListItem;
use crate::external::imdb::provider::ImdbProvider;
use crate::external::sleep_jitter;
use crate::external::throttler::Throttler;

/// Matches the `IMDb:` marker on the details page followed by a canonical id.
static IMDB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IMDb:.*?(\btt\d+\b)").expect("invalid IMDb id pattern"));

pub struct HtmlImdbProvider {
    client: SourceClient,
    base_url: String,
    request_delay_max: f64,
}

impl HtmlImdbProvider {
    pub fn new(settings: &Settings, throttler: Arc<Throttler>) -> AppResult<Self> {
        let client = SourceClient::builder(throttler)
            .proxy(settings.douban.proxy_address.as_deref())
            .douban_cookie(settings.douban.cookie_dbcl2.as_deref())
            .build()?;
        Ok(Self {
            client,
            base_url: settings.imdb.movie_base_url.trim_end_matches('/').to_string(),
            request_delay_max: settings.imdb.request_delay_max_seconds,
        })
    }
}

#[async_trait]
impl ImdbProvider for HtmlImdbProvider {
    async fn fetch_imdb_id(&self, douban_id: &str, item: &ListItem) -> AppResult<Option<String>> {
        sleep_jitter(self.request_delay_max).await;

        tracing::info!(title = %item.title, douban_id, "Fetching IMDb ID from details page");
        let html = self
            .client
            .get_text(&format!("{}/subject/{}/", self.base_url, douban_id))
            .await?;

        match IMDB_ID_PATTERN.captures(&html) {
            Some(captures) => {
                let imdb_id = captures[1].to_string();
                tracing::info!(title = %item.title, douban_id, imdb_id, "Resolved IMDb ID");
                Ok(Some(imdb_id))
            }
            None => {
                tracing::warn!(title = %item.title, douban_id, "IMDb ID not found on details page");
                Ok(None)
            }
        }
    }
}
