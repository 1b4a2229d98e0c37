use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::record::{
    normalize_imdb_rating, normalize_num_votes, normalize_title_type, title_url, ExtractedRow,
};
use crate::{Error, Result, EXPECTED_ROWS_PER_PAGE};

/// Outcome of reading one listing page.
#[derive(Debug)]
pub enum PageRows {
    /// A non-last page came back short or long; fetch it again.
    Retry { received: usize },
    /// Header stripped. Each row is extracted independently so a malformed one
    /// can be skipped without losing the rest of the page.
    Rows(Vec<Result<ExtractedRow>>),
}

/// Parses a listing page off the async runtime.
pub(crate) async fn parse_listing(html: String, is_last_page: bool) -> Result<PageRows> {
    spawn_blocking(move || parse_listing_page(&html, is_last_page)).await?
}

/// Checks the row count and extracts every data row of a listing page.
pub fn parse_listing_page(html: &str, is_last_page: bool) -> Result<PageRows> {
    let doc = Html::parse_document(html);
    let sel = RowSelectors::new()?;

    let rows: Vec<ElementRef> = doc.select(&sel.row).collect();
    if rows.len() != EXPECTED_ROWS_PER_PAGE && !is_last_page {
        return Ok(PageRows::Retry {
            received: rows.len(),
        });
    }

    let extracted = rows
        .into_iter()
        .skip(1)
        .map(|tr| extract_row(tr, &sel))
        .collect();
    Ok(PageRows::Rows(extracted))
}

/// Reads `N` out of the "Page 1 of N" text of the first listing page.
pub fn parse_page_count(html: &str, url: &str) -> Result<usize> {
    let doc = Html::parse_document(html);
    let desc_selector = create_selector("div.desc")?;
    let page_re = create_regex(r"Page 1 of ([0-9]+)")?;

    let text = doc
        .select(&desc_selector)
        .next()
        .map(|desc| desc.text().collect::<String>())
        .ok_or_else(|| Error::PageCountMissing(url.into()))?;

    page_re
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::PageCountMissing(url.into()))
}

struct RowSelectors {
    row: Selector,
    title: Selector,
    link: Selector,
    anchor: Selector,
    title_type: Selector,
    rater: Selector,
    your_rating: Selector,
    imdb_rating: Selector,
    year: Selector,
    num_votes: Selector,
    imdb_id: Regex,
}

impl RowSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            row: create_selector("tr.list_item")?,
            title: create_selector("td.title")?,
            link: create_selector("a[href]")?,
            anchor: create_selector("a")?,
            title_type: create_selector("td.title_type")?,
            rater: create_selector("td.rater_ratings > a")?,
            your_rating: create_selector("td.your_ratings")?,
            imdb_rating: create_selector("td.user_rating")?,
            year: create_selector("td.year")?,
            num_votes: create_selector("td.num_votes")?,
            imdb_id: create_regex(r"tt[0-9]{7}")?,
        })
    }
}

fn extract_row(tr: ElementRef, sel: &RowSelectors) -> Result<ExtractedRow> {
    let missing = |field: &'static str| Error::MissingField {
        field,
        context: row_context(tr),
    };

    let title_td = tr.select(&sel.title).next().ok_or_else(|| missing("title"))?;
    let href = title_td
        .select(&sel.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| missing("title link"))?;
    let imdb_id = sel
        .imdb_id
        .find(href)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| missing("const"))?;

    let is_episode = title_td.value().classes().any(|c| c == "episode");
    let series_link = if is_episode {
        title_td.select(&sel.anchor).next()
    } else {
        None
    };
    let title = title_text(title_td, series_link);

    let title_type = cell_text(tr, &sel.title_type).ok_or_else(|| missing("title_type"))?;

    let user_rating = match tr.select(&sel.rater).next() {
        Some(a) => a.text().collect::<String>().trim().to_string(),
        None => cell_text(tr, &sel.your_rating).ok_or_else(|| missing("your_ratings"))?,
    };

    let imdb_rating = cell_text(tr, &sel.imdb_rating).ok_or_else(|| missing("user_rating"))?;
    let year = cell_text(tr, &sel.year).ok_or_else(|| missing("year"))?;
    let num_votes = cell_text(tr, &sel.num_votes).ok_or_else(|| missing("num_votes"))?;

    Ok(ExtractedRow {
        imdb_id,
        title,
        title_type: normalize_title_type(&title_type),
        user_rating,
        imdb_rating: normalize_imdb_rating(&imdb_rating),
        year,
        num_votes: normalize_num_votes(&num_votes),
        url: title_url(href),
    })
}

/// Text of the title cell. Episode cells hold the series link followed by the
/// episode name with nothing in between, so a space goes right after the
/// series link, however deep it sits in the cell.
fn title_text(title_td: ElementRef, series_link: Option<ElementRef>) -> String {
    let mut out = String::new();
    let mut inside = false;
    let mut spaced = series_link.is_none();
    for node in title_td.descendants() {
        if let Some(series) = series_link.filter(|_| !spaced) {
            let in_series =
                node.id() == series.id() || node.ancestors().any(|a| a.id() == series.id());
            if in_series {
                inside = true;
            } else if inside {
                out.push(' ');
                spaced = true;
            }
        }
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}

fn cell_text(tr: ElementRef, selector: &Selector) -> Option<String> {
    tr.select(selector)
        .next()
        .map(|td| td.text().collect::<String>().trim().to_string())
}

fn row_context(tr: ElementRef) -> String {
    let text: String = tr.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    text.chars().take(200).collect()
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

#[inline]
fn create_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|_| Error::ParseMissingSelector(pattern.into()))
}
