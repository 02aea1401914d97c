//! Stats endpoint.

use axum::{Router, extract::State, response::Json, routing::get};

use crate::api::dto::{CacheSizes, StatsResponse};
use crate::state::AppState;

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stats))
        .route("/stats", get(stats))
}

/// Cache sizes and current per-host throttle state. Doubles as a health
/// check, so it is also served at `/`.
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache_size: CacheSizes {
            collection: state.collections.cache().len(),
            doulist: state.doulists.cache().len(),
            imdb: state.imdb.cache().len(),
        },
        throttler_info: state.throttler.info(),
    })
}
