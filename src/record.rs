//! One rated title and the CSV layout it is written in.

pub const TV_EPISODE: &str = "TV Episode";
pub const TV_SERIES: &str = "TV Series";

const TITLE_URL_PREFIX: &str = "http://www.imdb.com";

/// Fields scraped from one listing row. The position is assigned later, when
/// the merge decides the row gets written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    pub imdb_id: String,
    pub title: String,
    pub title_type: String,
    pub user_rating: String,
    pub imdb_rating: String,
    pub year: String,
    pub num_votes: String,
    pub url: String,
}

impl ExtractedRow {
    /// Titles of these types can share an id with other rows (episodes of the
    /// same show), so they never count as duplicates.
    pub fn may_share_id(&self) -> bool {
        is_shared_id_type(&self.title_type)
    }
}

pub fn is_shared_id_type(title_type: &str) -> bool {
    title_type == TV_EPISODE || title_type == TV_SERIES
}

/// A row as it lands in the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub position: u64,
    pub row: ExtractedRow,
}

impl RatingRecord {
    pub fn new(position: u64, row: ExtractedRow) -> Self {
        Self { position, row }
    }

    /// Fields in [`csv_header`] order. Columns the compact view doesn't carry
    /// are left empty.
    pub fn to_csv_fields(&self) -> [String; 16] {
        let r = &self.row;
        [
            self.position.to_string(),
            r.imdb_id.clone(),
            String::new(),
            String::new(),
            String::new(),
            r.title.clone(),
            r.title_type.clone(),
            String::new(),
            r.user_rating.clone(),
            r.imdb_rating.clone(),
            String::new(),
            r.year.clone(),
            String::new(),
            r.num_votes.clone(),
            String::new(),
            r.url.clone(),
        ]
    }
}

pub fn csv_header(username: &str) -> [String; 16] {
    [
        "position".into(),
        "const".into(),
        "created".into(),
        "modified".into(),
        "description".into(),
        "Title".into(),
        "Title type".into(),
        "Directors".into(),
        format!("{username} rated"),
        "IMDb Rating".into(),
        "Runtime (mins)".into(),
        "Year".into(),
        "Genres".into(),
        "Num. Votes".into(),
        "Release Date (month/day/year)".into(),
        "URL".into(),
    ]
}

/// Column indexes used when reading a previously written file back.
pub(crate) const COL_POSITION: usize = 0;
pub(crate) const COL_CONST: usize = 1;
pub(crate) const COL_TITLE_TYPE: usize = 6;

// ---- Normalization of raw cell text ----

pub fn normalize_imdb_rating(raw: &str) -> String {
    let raw = raw.trim();
    if raw == "0.0" {
        String::new()
    } else {
        raw.to_string()
    }
}

pub fn normalize_num_votes(raw: &str) -> String {
    let votes = raw.trim().replace(',', "");
    if votes == "-" {
        "0".to_string()
    } else {
        votes
    }
}

pub fn normalize_title_type(raw: &str) -> String {
    match raw.trim() {
        "Feature" => "Feature Film".to_string(),
        other => other.to_string(),
    }
}

pub fn title_url(href: &str) -> String {
    format!("{TITLE_URL_PREFIX}{href}")
}
