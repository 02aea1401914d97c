//! Sync receiver: peers push their IMDb cache records here.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::post,
};

use crate::api::dto::SyncQuery;
use crate::error::{AppError, AppResult};
use crate::jobs::sync::{SyncRecord, merge_records};
use crate::state::AppState;

pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync", post(receive))
}

/// Merges pushed records into the local IMDb cache. Requires the configured
/// apikey; an instance without one configured accepts no pushes at all.
async fn receive(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
    Json(records): Json<Vec<SyncRecord>>,
) -> AppResult<StatusCode> {
    let authorized = match (&state.sync_apikey, &query.apikey) {
        (Some(expected), Some(provided)) => {
            !expected.is_empty() && !provided.is_empty() && expected == provided
        }
        _ => false,
    };
    if !authorized {
        return Err(AppError::Forbidden {
            message: "invalid or missing apikey".to_string(),
        });
    }

    tracing::info!(count = records.len(), "Receiving sync records");
    merge_records(state.imdb.cache(), records)?;
    Ok(StatusCode::NO_CONTENT)
}
