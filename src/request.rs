use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::{info_time, Error, Result};

const BASE_URL: &str = "http://www.imdb.com";

/// Anything that can turn a URL into a page body. The scraper only ever talks
/// to this, so tests can script failures and pages.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> core::result::Result<String, TransportError>;
}

/// Fetches over HTTP with the user's cookies attached to every request.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(cookies: &[(String, String)]) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if !cookies.is_empty() {
            let cookie_line = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            match header::HeaderValue::from_str(&cookie_line) {
                Ok(value) => {
                    headers.insert(header::COOKIE, value);
                }
                Err(e) => warn!("Ignoring cookies that can't be sent as a header: {e}"),
            }
        }

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> core::result::Result<String, TransportError> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.into(),
                status: status.as_u16(),
            });
        }
        Ok(res.text().await?)
    }
}

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delays between attempts: start at `initial_delay`, double, cap at
    /// `max_delay`, one fewer than `max_attempts`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.max(1) as usize - 1)
    }
}

/// Requests `url` until it succeeds or the policy runs out of attempts.
pub(crate) async fn fetch_with_retry<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let attempts = &AtomicU32::new(0);
    let max_attempts = policy.max_attempts.max(1);
    let attempt = move || async move {
        let n = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("GET {url} (attempt {n}/{max_attempts})");
        fetcher.fetch(url).await
    };

    attempt
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .notify(|err: &TransportError, delay: Duration| {
            info_time!("Failed to download {} (or private list): {}. Retrying...", url, err);
            warn!("Request for {url} failed: {err}. Retrying in {delay:?}");
        })
        .await
        .map_err(|last| Error::RetriesExhausted {
            url: url.into(),
            attempts: attempts.load(Ordering::Relaxed),
            last,
        })
}

/// First page of the compact ratings view, which also carries the page count.
pub fn page_count_url(user_id: &str) -> String {
    listing_url(user_id, 1)
}

/// Listing page starting at the given 1-based row offset.
pub fn listing_url(user_id: &str, start: usize) -> String {
    format!(
        "{BASE_URL}/user/ur{user_id}/ratings?start={start}&view=compact&sort=ratings_date:desc&defaults=1"
    )
}
