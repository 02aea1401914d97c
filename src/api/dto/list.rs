//! List endpoint DTOs.

use serde::{Deserialize, Serialize};

/// One movie of a served list, enriched with its IMDb id.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub douban_id: String,
    pub title: String,
    pub imdb_id: String,
}

/// Query parameters of the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Minimum Douban rating; unrated items are dropped when set.
    pub min_rating: Option<f64>,
}

/// Query parameters of the sync receiver.
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub apikey: Option<String>,
}
