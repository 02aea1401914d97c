//! List endpoints: collections and doulists, resolved to IMDb ids.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::get,
};

use crate::api::dto::{ListQuery, ResolvedItem};
use crate::error::AppResult;
use crate::external::douban::ListApi;
use crate::state::AppState;

pub fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/collection/{id}", get(collection))
        .route("/doulist/{id}", get(doulist))
}

async fn collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ResolvedItem>>> {
    resolve_list(&state, &state.collections, &id, &query).await
}

async fn doulist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ResolvedItem>>> {
    resolve_list(&state, &state.doulists, &id, &query).await
}

/// Serves one list: movies only, optionally filtered by rating, each resolved
/// to its IMDb id. Items whose id cannot be resolved are dropped; the
/// consumers match on IMDb ids and could do nothing with the rest.
async fn resolve_list(
    state: &AppState,
    api: &ListApi,
    id: &str,
    query: &ListQuery,
) -> AppResult<Json<Vec<ResolvedItem>>> {
    let items = api.get_items(id).await?;

    let mut resolved = Vec::new();
    for item in items.iter().filter(|item| item.is_movie()) {
        if let Some(min_rating) = query.min_rating
            && !item.rating_value().is_some_and(|rating| rating >= min_rating)
        {
            continue;
        }
        let Some(douban_id) = item.douban_id() else {
            tracing::warn!(title = %item.title, url = %item.url, "Item without a usable subject URL");
            continue;
        };
        if let Some(imdb_id) = state.imdb.get_imdb_id(&douban_id, item).await? {
            resolved.push(ResolvedItem {
                douban_id,
                title: item.title.clone(),
                imdb_id,
            });
        }
    }

    Ok(Json(resolved))
}
