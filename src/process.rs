use chrono::Local;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::merge::{Decision, Merger};
use crate::pages::{clamp_start, resolve_page_count, PageWalker};
use crate::parse::{parse_listing, PageRows};
use crate::record::ExtractedRow;
use crate::request::{fetch_with_retry, listing_url, Fetch};
use crate::sink::CsvSink;
use crate::{info_time, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records written by this run.
    pub written: u64,
    pub num_pages: usize,
    /// Append mode hit a title the file already had.
    pub caught_up: bool,
    /// Wall-clock seconds.
    pub elapsed_secs: f64,
}

/// Downloads the ratings list page by page into `config.outfile`.
pub async fn process_ratings<F: Fetch + ?Sized>(
    config: &RunConfig,
    fetcher: &F,
) -> Result<RunSummary> {
    let start_time = Local::now();

    info_time!("Retrieving number of pages");
    let num_pages = resolve_page_count(fetcher, &config.user_id, &config.retry).await?;
    info_time!("Found {} pages", num_pages);
    let start = clamp_start(config.start, num_pages);

    let sink = CsvSink::new(&config.outfile);
    sink.ensure_header(&config.username).await?;
    let mut merger = if config.append {
        Merger::append(sink.load_history().await?)
    } else {
        Merger::fresh()
    };

    let mut caught_up = false;
    for (page, offset) in PageWalker::new(num_pages, start) {
        let page_time = Local::now();
        info_time!("Downloading page {} of {}", page, num_pages);
        let rows = fetch_page_rows(fetcher, config, page, offset, page == num_pages).await?;

        info_time!("Parsing page {}", page);
        caught_up = merge_rows(rows, &mut merger, &sink, config).await?;
        info_time!(page_time, "Processed page {}", page);
        if caught_up {
            break;
        }
    }

    let elapsed_secs = (Local::now() - start_time).num_milliseconds().max(0) as f64 / 1_000.0;
    let written = merger.written_count();
    info_time!("Downloaded {} ratings in {}", written, pretty_seconds(elapsed_secs));
    info!("Downloaded {written} ratings in {}", pretty_seconds(elapsed_secs));
    info_time!("Saved results in {}", config.outfile.display());

    Ok(RunSummary {
        written,
        num_pages,
        caught_up,
        elapsed_secs,
    })
}

/// Fetches a listing page until it has the expected number of rows (any
/// count is fine on the last page).
async fn fetch_page_rows<F: Fetch + ?Sized>(
    fetcher: &F,
    config: &RunConfig,
    page: usize,
    offset: usize,
    is_last_page: bool,
) -> Result<Vec<Result<ExtractedRow>>> {
    let url = listing_url(&config.user_id, offset);
    info!("Downloading page {page}: {url}");

    let mut received = 0;
    for attempt in 1..=config.max_page_attempts {
        let html = fetch_with_retry(fetcher, &url, &config.retry).await?;
        match parse_listing(html, is_last_page).await? {
            PageRows::Rows(rows) => return Ok(rows),
            PageRows::Retry { received: n } => {
                received = n;
                info_time!(
                    "Error: Received less data than expected ({} rows, received {}). Retrying...",
                    crate::EXPECTED_ROWS_PER_PAGE,
                    n
                );
                warn!(
                    "Page {page} returned {n} rows on attempt {attempt}/{}",
                    config.max_page_attempts
                );
            }
        }
    }
    Err(Error::RowCountExhausted { page, received })
}

/// Feeds one page through the merge. Returns `true` once a known title shows
/// up, which ends the run.
async fn merge_rows(
    rows: Vec<Result<ExtractedRow>>,
    merger: &mut Merger,
    sink: &CsvSink,
    config: &RunConfig,
) -> Result<bool> {
    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                info_time!("Error: {}", e);
                error!("Error while parsing: {e:?}");
                continue;
            }
        };

        match merger.decide(row) {
            Decision::Stop => {
                info_time!("Found the last new entry. Aborting...");
                info!("[{}] Reached an entry from the previous run", config.outfile.display());
                return Ok(true);
            }
            Decision::Write { record, duplicate } => {
                if duplicate {
                    info_time!("Found a duplicate entry: {:?}", record.to_csv_fields());
                    warn!(
                        "[{}] Found a duplicate entry: {:?}",
                        config.outfile.display(),
                        record.to_csv_fields()
                    );
                }
                sink.append(&record).await?;
                merger.commit(&record);
            }
        }
    }
    Ok(false)
}

/// Formats seconds as `Xh Ym Zs`.
pub fn pretty_seconds(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let (mins, secs) = (total / 60, total % 60);
    let (hrs, mins) = (mins / 60, mins % 60);
    format!("{hrs}h {mins}m {secs}s")
}
