//! Lazy, forward-only walk over paged search results.

use futures_util::Stream;
use futures_util::stream;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;
use crate::models::SearchResult;

/// A page that knows whether another one follows it.
pub trait Page {
    fn has_more_pages(&self) -> bool;
    fn next_start_index(&self) -> u32;
}

impl<T> Page for SearchResult<T> {
    fn has_more_pages(&self) -> bool {
        SearchResult::has_more_pages(self)
    }

    fn next_start_index(&self) -> u32 {
        SearchResult::next_start_index(self)
    }
}

struct Cursor<F> {
    fetch: F,
    start_index: u32,
    pages: u32,
    delay_pending: bool,
    done: bool,
}

/// Streams pages produced by `fetch(start_index, per_page)`, starting at 0.
///
/// Nothing is fetched until the stream is polled. The walk ends after a page
/// that reports no further pages, after `max_pages` pages, or after the
/// first error (which is yielded). `page_delay` is slept before every fetch
/// except the first, so finishing never waits.
pub fn paginate<P, F, Fut>(
    per_page: u32,
    max_pages: Option<u32>,
    page_delay: Duration,
    fetch: F,
) -> impl Stream<Item = Result<P, ApiError>>
where
    P: Page,
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<P, ApiError>>,
{
    let cursor = Cursor {
        fetch,
        start_index: 0,
        pages: 0,
        delay_pending: false,
        done: false,
    };

    stream::unfold(cursor, move |mut cursor| async move {
        if cursor.done {
            return None;
        }
        if max_pages.is_some_and(|max| cursor.pages >= max) {
            debug!("Reached page limit of {}", cursor.pages);
            return None;
        }
        if cursor.delay_pending {
            tokio::time::sleep(page_delay).await;
        }

        debug!(
            "Fetching page {} at start index {}...",
            cursor.pages + 1,
            cursor.start_index
        );

        match (cursor.fetch)(cursor.start_index, per_page).await {
            Ok(page) => {
                cursor.pages += 1;
                if page.has_more_pages() {
                    let next = page.next_start_index();
                    if next <= cursor.start_index {
                        warn!(
                            "Next start index {} does not advance past {}, stopping",
                            next, cursor.start_index
                        );
                        cursor.done = true;
                    } else {
                        cursor.start_index = next;
                        cursor.delay_pending = true;
                    }
                } else {
                    cursor.done = true;
                }
                Some((Ok(page), cursor))
            }
            Err(e) => {
                cursor.done = true;
                Some((Err(e), cursor))
            }
        }
    })
}
