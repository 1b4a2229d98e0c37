use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Ratings URL doesn't contain a user id (ur followed by 8 digits): {0}")]
    InvalidUserUrl(String),

    #[error("Couldn't find the number of pages (or the list is private). URL: {0}")]
    PageCountMissing(String),
    #[error("Gave up on {url} after {attempts} attempts. Last error: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: TransportError,
    },
    #[error("Page {page} kept returning an unexpected number of rows (last: {received})")]
    RowCountExhausted { page: usize, received: usize },

    #[error("The selector you are trying to scrape for is missing. Selector: {0}")]
    ParseMissingSelector(String),
    #[error("Row is missing `{field}`: {context}")]
    MissingField { field: &'static str, context: String },

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Failure of a single fetch attempt. Always retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        TransportError::Request(value.to_string())
    }
}
