use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ratings_scrape::config::{username_from_path, RunConfig};
use ratings_scrape::process::process_ratings;
use ratings_scrape::request::{listing_url, page_count_url, Fetch, RetryPolicy};
use ratings_scrape::TransportError;

const USER: &str = "12345678";

/// Serves canned pages by URL; anything else is a 404.
struct FakeSite {
    pages: HashMap<String, String>,
    hits: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            hits: Mutex::new(Vec::new()),
        }
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self.hits.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: url.into(),
                status: 404,
            })
    }
}

fn row(id: &str, title: &str) -> String {
    format!(
        r#"<tr class="list_item">
            <td class="title"><a href="/title/{id}/">{title}</a></td>
            <td class="title_type">Feature</td>
            <td class="your_ratings">7</td>
            <td class="user_rating">6.8</td>
            <td class="year">2004</td>
            <td class="num_votes">12,345</td>
        </tr>"#
    )
}

fn page(ids: &[String]) -> String {
    let rows: Vec<String> = ids.iter().map(|id| row(id, &format!("Title {id}"))).collect();
    format!(
        r#"<html><body>
            <div class="desc">Page 1 of 3</div>
            <table><tr class="list_item"><th>Title</th></tr>{}</table>
        </body></html>"#,
        rows.join("\n")
    )
}

fn ids(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|n| format!("tt{n:07}")).collect()
}

/// Three pages: 250 + 250 + 120 ratings.
fn three_page_site(first_page: Vec<String>) -> FakeSite {
    let first = page(&first_page);
    let mut pages = HashMap::new();
    pages.insert(page_count_url(USER), first.clone());
    pages.insert(listing_url(USER, 1), first);
    pages.insert(listing_url(USER, 251), page(&ids(250..500)));
    pages.insert(listing_url(USER, 501), page(&ids(500..620)));
    FakeSite::new(pages)
}

/// Fresh run from page 1, three attempts per request and per page, no waiting.
fn run_config(outfile: std::path::PathBuf) -> RunConfig {
    RunConfig {
        user_id: USER.into(),
        username: username_from_path(&outfile),
        outfile,
        start: 1,
        append: false,
        retry: RetryPolicy::immediate(3),
        max_page_attempts: 3,
    }
}

fn read_rows(path: &std::path::Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().clone();
    let rows = reader.records().map(|r| r.unwrap()).collect();
    (header, rows)
}

#[tokio::test]
async fn downloads_every_page_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path().join("alice.csv"));
    let site = three_page_site(ids(0..250));

    let summary = process_ratings(&config, &site).await.unwrap();
    assert_eq!(summary.written, 620);
    assert_eq!(summary.num_pages, 3);
    assert!(!summary.caught_up);

    let (header, rows) = read_rows(&config.outfile);
    assert_eq!(&header[8], "alice rated");
    assert_eq!(rows.len(), 620);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row[0].parse::<usize>().unwrap(), i + 1);
        assert_eq!(&row[1], format!("tt{i:07}"));
    }
    assert_eq!(&rows[0][6], "Feature Film");
    assert_eq!(&rows[0][13], "12345");

    let text = std::fs::read_to_string(&config.outfile).unwrap();
    assert_eq!(text.matches("position,const").count(), 1);
}

#[tokio::test]
async fn append_run_only_adds_new_ratings() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = run_config(dir.path().join("bob.csv"));

    let site = three_page_site(ids(0..250));
    process_ratings(&config, &site).await.unwrap();

    // Two new ratings pushed everything else down by two.
    let mut first_page = vec!["tt9000001".to_string(), "tt9000002".to_string()];
    first_page.extend(ids(0..248));
    let site = three_page_site(first_page);
    config.append = true;

    let summary = process_ratings(&config, &site).await.unwrap();
    assert_eq!(summary.written, 2);
    assert!(summary.caught_up);
    assert!(!site.hits().contains(&listing_url(USER, 251)));

    let (_, rows) = read_rows(&config.outfile);
    assert_eq!(rows.len(), 622);
    assert_eq!(&rows[620][0], "621");
    assert_eq!(&rows[620][1], "tt9000001");
    assert_eq!(&rows[621][0], "622");
    assert_eq!(&rows[621][1], "tt9000002");

    let text = std::fs::read_to_string(&config.outfile).unwrap();
    assert_eq!(text.matches("position,const").count(), 1);
}

#[tokio::test]
async fn start_page_skips_earlier_pages() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = run_config(dir.path().join("carol.csv"));
    config.start = 3;
    let site = three_page_site(ids(0..250));

    let summary = process_ratings(&config, &site).await.unwrap();
    assert_eq!(summary.written, 120);
    assert_eq!(
        site.hits(),
        vec![page_count_url(USER), listing_url(USER, 501)]
    );

    let (_, rows) = read_rows(&config.outfile);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][1], "tt0000500");
}

#[tokio::test]
async fn private_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path().join("dave.csv"));
    let site = FakeSite::new(HashMap::new());

    let err = process_ratings(&config, &site).await.unwrap_err();
    assert!(matches!(
        err,
        ratings_scrape::Error::RetriesExhausted { attempts: 3, .. }
    ));
    assert!(!config.outfile.exists());
}
