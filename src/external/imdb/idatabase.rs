//! IMDb id resolution through the idatabase lookup service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderName;
use serde::Deserialize;

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::external::client::SourceClient;
use crate::external::douban::ListItem;
use crate::external::imdb::provider::ImdbProvider;
use crate::external::throttler::Throttler;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

#[derive(Debug, Deserialize)]
struct IdatabaseRecord {
    #[serde(default)]
    imdb_id: Option<String>,
}

pub struct IdatabaseImdbProvider {
    client: SourceClient,
}

impl IdatabaseImdbProvider {
    /// `base_url` is `imdb.idatabase_url`; the caller has already checked it
    /// is configured.
    pub fn new(base_url: &str, settings: &Settings, throttler: Arc<Throttler>) -> AppResult<Self> {
        let mut builder = SourceClient::builder(throttler)
            .base_url(base_url)
            .timeout(Duration::from_secs_f64(
                settings.imdb.idatabase_timeout_seconds,
            ))
            .proxy(settings.douban.proxy_address.as_deref());
        if let Some(ref api_key) = settings.imdb.idatabase_api_key {
            builder = builder.header(API_KEY_HEADER, api_key)?;
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ImdbProvider for IdatabaseImdbProvider {
    async fn fetch_imdb_id(&self, douban_id: &str, item: &ListItem) -> AppResult<Option<String>> {
        tracing::info!(title = %item.title, douban_id, "Fetching IMDb ID from idatabase");

        let response = self
            .client
            .get(&format!("api/item?douban_id={douban_id}"))
            .await?;
        let status = response.status();

        // 404 means the subject is simply not in the database yet.
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(title = %item.title, douban_id, "Item not found in idatabase");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let url = response.url().to_string();
        let records: Vec<IdatabaseRecord> = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamTransport { url, source: e })?;

        let imdb_id = records.into_iter().next().and_then(|record| record.imdb_id);
        match &imdb_id {
            Some(id) => tracing::info!(title = %item.title, douban_id, imdb_id = %id, "Resolved IMDb ID"),
            None => tracing::warn!(title = %item.title, douban_id, "IMDb ID not available in idatabase"),
        }
        Ok(imdb_id)
    }
}
