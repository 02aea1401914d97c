use async_trait::async_trait;

use crate::error::AppResult;
use crate::external::douban::ListItem;

/// A backend capable of resolving the IMDb id for one Douban subject.
///
/// `Ok(None)` is the soft "looked up, nothing found" outcome; errors are
/// reserved for failures the caller must surface (transport problems,
/// unexpected upstream statuses).
#[async_trait]
pub trait ImdbProvider: Send + Sync {
    async fn fetch_imdb_id(&self, douban_id: &str, item: &ListItem) -> AppResult<Option<String>>;
}
