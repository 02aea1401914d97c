//! Cache pre-warming.
//!
//! Starting from a handful of well-known collections, the bootstrap loop
//! walks Douban's `related_charts` graph breadth-first, warming the list
//! cache and resolving IMDb ids along the way so that interactive requests
//! are served from a hot cache. The walk is bounded per run and the run
//! repeats on a fixed interval.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::config::BootstrapSettings;
use crate::error::{AppResult, error_chain};
use crate::external::douban::ListApi;
use crate::external::imdb::ImdbResolver;

/// Seed collections for every run. Always-popular charts whose related
/// charts fan out over most of the catalog.
const COMMON_COLLECTIONS: [&str; 4] = [
    "movie_top250",
    "movie_weekly_best",
    "movie_real_time_hotest",
    "subject_real_time_hotest",
];

/// Warming loop. Runs until the process exits.
pub async fn run(
    collections: Arc<ListApi>,
    resolver: Arc<ImdbResolver>,
    settings: BootstrapSettings,
) {
    loop {
        tracing::info!("Bootstrap run starting");
        let seeds: Vec<String> = COMMON_COLLECTIONS.iter().map(|s| s.to_string()).collect();
        let visited = run_once(&collections, &resolver, &settings, seeds).await;
        tracing::info!(visited, "Bootstrap run finished");
        tokio::time::sleep(Duration::from_secs_f64(settings.interval_seconds)).await;
    }
}

/// One warming pass. Returns the number of lists visited. Per-list failures
/// are logged and the walk continues with the next queued list.
async fn run_once(
    collections: &ListApi,
    resolver: &ImdbResolver,
    settings: &BootstrapSettings,
    seeds: Vec<String>,
) -> usize {
    let mut queue: VecDeque<String> = seeds.into();
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if visited.contains(&id) {
            continue;
        }
        if visited.len() >= settings.lists_max {
            tracing::info!(limit = settings.lists_max, "Bootstrap list limit reached");
            break;
        }
        visited.insert(id.clone());

        match warm_list(collections, resolver, &id).await {
            Ok(related) => {
                for related_id in related {
                    if !visited.contains(&related_id) {
                        queue.push_back(related_id);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(list = %id, error = %error_chain(&e), "Failed to warm list");
            }
        }

        tokio::time::sleep(Duration::from_secs_f64(settings.list_interval_seconds)).await;
    }

    visited.len()
}

/// Warms one collection: caches its items, resolves IMDb ids for its movies,
/// and returns the ids of its related charts for further walking.
async fn warm_list(
    collections: &ListApi,
    resolver: &ImdbResolver,
    id: &str,
) -> AppResult<Vec<String>> {
    let info = collections.get_info(id).await?;
    let related: Vec<String> = info
        .related_charts
        .map(|charts| charts.items.into_iter().map(|chart| chart.id).collect())
        .unwrap_or_default();

    let items = collections.get_items(id).await?;
    for item in items.iter().filter(|item| item.is_movie()) {
        if let Some(douban_id) = item.douban_id() {
            resolver.get_imdb_id(&douban_id, item).await?;
        }
    }

    Ok(related)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::cache::DiskCache;
    use crate::config::Settings;
    use crate::error::AppResult;
    use crate::external::douban::{ListFlavor, ListItem};
    use crate::external::imdb::ImdbProvider;
    use crate::external::throttler::Throttler;

    struct NullProvider;

    #[async_trait]
    impl ImdbProvider for NullProvider {
        async fn fetch_imdb_id(&self, douban_id: &str, _: &ListItem) -> AppResult<Option<String>> {
            Ok(Some(format!("tt{douban_id}")))
        }
    }

    fn collection_page(ids: &[u64]) -> serde_json::Value {
        let items: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "type": "movie",
                    "title": format!("movie-{id}"),
                    "url": format!("https://movie.douban.com/subject/{id}/")
                })
            })
            .collect();
        json!({"total": items.len(), "subject_collection_items": items})
    }

    async fn mount_collection(server: &MockServer, id: &str, movies: &[u64], related: &[&str]) {
        let related_items: Vec<_> = related.iter().map(|id| json!({"id": id})).collect();
        Mock::given(method("GET"))
            .and(path(format!("/rexxar/api/v2/subject_collection/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "related_charts": {"items": related_items}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/rexxar/api/v2/subject_collection/{id}/items"
            )))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(collection_page(movies)))
            .mount(server)
            .await;
    }

    fn fixture(server: &MockServer, dir: &TempDir) -> (ListApi, ImdbResolver, BootstrapSettings) {
        let mut settings = Settings::default();
        settings.douban.api_base_url = format!("{}/rexxar/api/v2", server.uri());
        settings.douban.request_delay_max_seconds = 0.0;
        settings.cache.base_dir = dir.path().display().to_string();
        settings.bootstrap.list_interval_seconds = 0.0;

        let throttler = Arc::new(Throttler::new(3600.0));
        let collections = ListApi::new(ListFlavor::Collection, &settings, throttler).unwrap();
        let cache = DiskCache::open(dir.path().join("imdb")).unwrap();
        let resolver = ImdbResolver::with_provider(cache, Box::new(NullProvider), 3600.0);
        (collections, resolver, settings.bootstrap)
    }

    #[tokio::test]
    async fn test_walks_related_charts() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_collection(&server, "seed", &[1, 2], &["child"]).await;
        mount_collection(&server, "child", &[3], &[]).await;

        let (collections, resolver, settings) = fixture(&server, &dir);
        let visited = run_once(
            &collections,
            &resolver,
            &settings,
            vec!["seed".to_string()],
        )
        .await;

        assert_eq!(visited, 2);
        assert!(
            collections
                .cache()
                .get::<Vec<ListItem>>("child")
                .unwrap()
                .is_some()
        );
        assert_eq!(
            resolver.cache().get::<Option<String>>("3").unwrap(),
            Some(Some("tt3".to_string()))
        );
    }

    #[tokio::test]
    async fn test_respects_lists_max() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_collection(&server, "a", &[1], &["b"]).await;
        mount_collection(&server, "b", &[2], &["c"]).await;
        mount_collection(&server, "c", &[3], &[]).await;

        let (collections, resolver, mut settings) = fixture(&server, &dir);
        settings.lists_max = 2;
        let visited = run_once(&collections, &resolver, &settings, vec!["a".to_string()]).await;

        assert_eq!(visited, 2);
        assert!(
            collections
                .cache()
                .get::<Vec<ListItem>>("c")
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_failed_list_is_skipped() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        // "broken" has no mocks mounted, so its info fetch 404s
        mount_collection(&server, "good", &[1], &[]).await;

        let (collections, resolver, settings) = fixture(&server, &dir);
        let visited = run_once(
            &collections,
            &resolver,
            &settings,
            vec!["broken".to_string(), "good".to_string()],
        )
        .await;

        assert_eq!(visited, 2);
        assert!(
            collections
                .cache()
                .get::<Vec<ListItem>>("good")
                .unwrap()
                .is_some()
        );
    }
}
