//! Router configuration for the API.

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Middleware is applied in reverse order of declaration, so request ids are
/// assigned before the logging layer runs.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::stats::stats_routes())
        .merge(handlers::lists::list_routes())
        .merge(handlers::sync::sync_routes())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::cache::unix_now;
    use crate::config::Settings;

    /// Settings with every upstream pointed at the mock server and all
    /// request delays disabled.
    fn test_settings(server: &MockServer, cache_dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.douban.api_base_url = format!("{}/rexxar/api/v2", server.uri());
        settings.douban.request_delay_max_seconds = 0.0;
        settings.imdb.movie_base_url = server.uri();
        settings.imdb.request_delay_max_seconds = 0.0;
        settings.cache.base_dir = cache_dir.path().display().to_string();
        settings.sync.apikey = Some("secret".to_string());
        settings
    }

    async fn mount_upstream(server: &MockServer) {
        // One collection with two movies and a tv show; only movie 1 has an
        // IMDb id on its details page.
        Mock::given(method("GET"))
            .and(path("/rexxar/api/v2/subject_collection/list1/items"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 3,
                "subject_collection_items": [
                    {
                        "type": "movie",
                        "title": "resolved",
                        "url": "https://movie.douban.com/subject/1/",
                        "rating": {"value": 9.0}
                    },
                    {
                        "type": "movie",
                        "title": "unresolved",
                        "url": "https://movie.douban.com/subject/2/",
                        "rating": {"value": 6.0}
                    },
                    {
                        "type": "tv",
                        "title": "a show",
                        "url": "https://movie.douban.com/subject/3/",
                        "rating": {"value": 9.5}
                    }
                ]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subject/1/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<span class="pl">IMDb:</span> tt0111161<br>"#),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subject/2/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no id here</html>"))
            .mount(server)
            .await;
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_collection_drops_non_movies_and_unresolved() {
        let server = MockServer::start().await;
        let cache_dir = TempDir::new().unwrap();
        mount_upstream(&server).await;

        let state = AppState::new(&test_settings(&server, &cache_dir)).unwrap();
        let base = serve(state).await;

        let items: Vec<serde_json::Value> = reqwest::get(format!("{base}/collection/list1"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["douban_id"], "1");
        assert_eq!(items[0]["imdb_id"], "tt0111161");
    }

    #[tokio::test]
    async fn test_min_rating_filters_before_resolution() {
        let server = MockServer::start().await;
        let cache_dir = TempDir::new().unwrap();
        mount_upstream(&server).await;

        let state = AppState::new(&test_settings(&server, &cache_dir)).unwrap();
        let base = serve(state).await;

        let items: Vec<serde_json::Value> =
            reqwest::get(format!("{base}/collection/list1?min_rating=8"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "resolved");
        // The 6.0-rated movie was filtered out before any details-page fetch
        let fetched_pages: Vec<_> = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().starts_with("/subject/2"))
            .collect();
        assert!(fetched_pages.is_empty());
    }

    #[tokio::test]
    async fn test_sync_requires_apikey() {
        let server = MockServer::start().await;
        let cache_dir = TempDir::new().unwrap();

        let state = AppState::new(&test_settings(&server, &cache_dir)).unwrap();
        let imdb = state.imdb.clone();
        let base = serve(state).await;

        let records = json!([{
            "key": "1",
            "value": "tt0111161",
            "expire_time": unix_now() + 3600.0
        }]);
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/sync"))
            .json(&records)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);

        let response = client
            .post(format!("{base}/sync?apikey=wrong"))
            .json(&records)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);

        let response = client
            .post(format!("{base}/sync?apikey=secret"))
            .json(&records)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(
            imdb.cache().get::<Option<String>>("1").unwrap(),
            Some(Some("tt0111161".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stats_reports_cache_sizes() {
        let server = MockServer::start().await;
        let cache_dir = TempDir::new().unwrap();
        mount_upstream(&server).await;

        let state = AppState::new(&test_settings(&server, &cache_dir)).unwrap();
        let base = serve(state).await;

        // Warm the caches through the list endpoint first
        reqwest::get(format!("{base}/collection/list1"))
            .await
            .unwrap()
            .error_for_status()
            .unwrap();

        let stats: serde_json::Value = reqwest::get(format!("{base}/stats"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(stats["cache_size"]["collection"], 1);
        // Both movies were looked up; one negative entry, one resolved
        assert_eq!(stats["cache_size"]["imdb"], 2);
        assert!(stats["throttler_info"].is_object());
    }
}
