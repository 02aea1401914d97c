//! Cursor-based pagination over a page-reader capability.

use std::collections::VecDeque;
use std::future::Future;

use futures::{Stream, stream};

use crate::error::AppResult;

/// One page of an upstream listing.
pub struct Page<T> {
    /// Total number of items the upstream claims to have.
    pub total: u64,
    pub items: Vec<T>,
}

struct PageCursor<T, F> {
    read_page: F,
    page_size: u64,
    offset: u64,
    total: Option<u64>,
    pending: VecDeque<T>,
}

/// Produces a lazy, non-restartable item stream covering `[0, total)`.
///
/// `read_page(offset, page_size)` is called as the stream is consumed; the
/// total is captured from the first page and the offset advances by however
/// many items each page actually returned. An empty page terminates the
/// stream early even if `offset < total`, so an inconsistent upstream total
/// cannot cause an infinite loop. Delays between page reads (jitter) belong
/// to the page reader, not to this function.
pub fn paginate<T, F, Fut>(page_size: u64, read_page: F) -> impl Stream<Item = AppResult<T>>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = AppResult<Page<T>>>,
{
    let cursor = PageCursor {
        read_page,
        page_size,
        offset: 0,
        total: None,
        pending: VecDeque::new(),
    };
    stream::try_unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(item) = cursor.pending.pop_front() {
                return Ok(Some((item, cursor)));
            }
            if let Some(total) = cursor.total
                && cursor.offset >= total
            {
                return Ok(None);
            }
            let page = (cursor.read_page)(cursor.offset, cursor.page_size).await?;
            if cursor.total.is_none() {
                cursor.total = Some(page.total);
            }
            if page.items.is_empty() {
                return Ok(None);
            }
            cursor.offset += page.items.len() as u64;
            cursor.pending.extend(page.items);
        }
    })
}
