//! Downloads an IMDb user's ratings list into a CSV file, page by page.
//!
//! Pages are walked in order from the newest rating. With `--append` the run
//! stops at the first title the existing file already has, so re-runs only
//! pick up what was rated since.

pub mod config;
mod error;
pub mod logging;
mod macros;
pub mod merge;
pub mod pages;
pub mod parse;
pub mod process;
pub mod record;
pub mod request;
pub mod sink;

pub use error::{Error, Result, TransportError};

/// Ratings the site puts on one listing page.
pub const ROWS_PER_PAGE: usize = 250;
/// `tr.list_item` rows on a full page: the ratings plus the header row.
pub const EXPECTED_ROWS_PER_PAGE: usize = ROWS_PER_PAGE + 1;
