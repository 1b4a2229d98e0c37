use tracing::info;

use crate::parse::parse_page_count;
use crate::request::{fetch_with_retry, page_count_url, Fetch, RetryPolicy};
use crate::{info_time, Result, ROWS_PER_PAGE};

/// Fetches the first listing page and reads how many pages the list has.
/// A page without the "Page 1 of N" text is fatal; it is not retried.
pub async fn resolve_page_count<F: Fetch + ?Sized>(
    fetcher: &F,
    user_id: &str,
    retry: &RetryPolicy,
) -> Result<usize> {
    let url = page_count_url(user_id);
    info!("Retrieving number of pages from {url}");
    let html = fetch_with_retry(fetcher, &url, retry).await?;
    info!("Parsing content");
    parse_page_count(&html, &url)
}

/// Clamps a requested start page into `1..=last_page`, telling the operator
/// when it had to.
pub fn clamp_start(start: i64, last_page: usize) -> usize {
    if start < 1 {
        info_time!("Start page cannot be less than 1. Setting start page to 1...");
        return 1;
    }
    let start = usize::try_from(start).unwrap_or(usize::MAX);
    if start > last_page {
        info_time!(
            "Start page {} is greater than found pages: {}. Setting start page to last page",
            start,
            last_page
        );
        return last_page.max(1);
    }
    start
}

/// Yields `(page, row_start_offset)` from the start page to the last page.
#[derive(Debug)]
pub struct PageWalker {
    next: usize,
    last: usize,
}

impl PageWalker {
    /// `start` is expected to be clamped already (see [`clamp_start`]).
    pub fn new(last_page: usize, start: usize) -> Self {
        Self {
            next: start.max(1),
            last: last_page,
        }
    }
}

impl Iterator for PageWalker {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }
        let page = self.next;
        self.next += 1;
        Some((page, row_start_offset(page)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.last + 1).saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for PageWalker {}

/// Server-side offset of the first row on a page.
pub fn row_start_offset(page: usize) -> usize {
    (page - 1) * ROWS_PER_PAGE + 1
}
