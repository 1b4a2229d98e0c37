use std::path::{Path, PathBuf};

use clap::Parser;
use regex::Regex;
use tracing::debug;

use crate::request::RetryPolicy;
use crate::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "ratings-scrape")]
#[command(about = "Download large IMDb rating lists", long_about = None)]
pub struct Args {
    /// URL to IMDb user ratings page
    pub ratings_url: String,
    /// Path to output CSV file
    pub outfile: PathBuf,
    /// Page number to start from
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub start: i64,
    /// Load cookies from file
    #[arg(long, default_value = "cookies.txt")]
    pub cookies: PathBuf,
    /// Append new entries and stop after all new entries were found
    #[arg(long)]
    pub append: bool,
    /// Attempts per request before giving up
    #[arg(long, default_value_t = 8)]
    pub retries: u32,
    /// Attempts per page when it comes back with the wrong number of rows
    #[arg(long, default_value_t = 10)]
    pub page_attempts: u32,
    /// Where the run log is appended
    #[arg(long, default_value = "out.log")]
    pub log_file: PathBuf,
}

/// Everything a run needs to know, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The 8 digits after `ur`.
    pub user_id: String,
    pub outfile: PathBuf,
    /// Output file name without extension; ends up in the header.
    pub username: String,
    /// As requested; clamped once the page count is known.
    pub start: i64,
    pub append: bool,
    pub retry: RetryPolicy,
    pub max_page_attempts: u32,
}

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            user_id: extract_user_id(&args.ratings_url)?,
            username: username_from_path(&args.outfile),
            outfile: args.outfile.clone(),
            start: args.start,
            append: args.append,
            retry: RetryPolicy {
                max_attempts: args.retries.max(1),
                ..RetryPolicy::default()
            },
            max_page_attempts: args.page_attempts.max(1),
        })
    }
}

/// Pulls the numeric user id out of anything containing `ur` + 8 digits.
pub fn extract_user_id(ratings_url: &str) -> Result<String> {
    let re = Regex::new(r"ur([0-9]{8})")
        .map_err(|_| Error::InvalidUserUrl(ratings_url.into()))?;
    re.captures(ratings_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidUserUrl(ratings_url.into()))
}

pub fn username_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loads a `k1=v1; k2=v2` cookie line. A missing file means no cookies.
pub async fn load_cookies(path: &Path) -> Result<Vec<(String, String)>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let cookies = parse_cookies(&text);
            debug!("Cookies: {:?}", cookies);
            Ok(cookies)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No cookie file at {}", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn parse_cookies(text: &str) -> Vec<(String, String)> {
    text.trim()
        .split("; ")
        .filter_map(|item| item.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
impl RunConfig {
    /// Scripted runs: three attempts per request and per page, no waiting.
    pub(crate) fn immediate(user_id: &str, outfile: impl Into<PathBuf>) -> Self {
        let outfile = outfile.into();
        Self {
            user_id: user_id.into(),
            username: username_from_path(&outfile),
            outfile,
            start: 1,
            append: false,
            retry: RetryPolicy::immediate(3),
            max_page_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_comes_from_url() {
        assert_eq!(
            extract_user_id("http://www.imdb.com/user/ur12345678/ratings").unwrap(),
            "12345678"
        );
        assert_eq!(extract_user_id("ur87654321").unwrap(), "87654321");
        assert!(matches!(
            extract_user_id("http://www.imdb.com/user/ur1234/ratings"),
            Err(Error::InvalidUserUrl(_))
        ));
    }

    #[test]
    fn username_is_file_stem() {
        assert_eq!(username_from_path(Path::new("out/alice.csv")), "alice");
        assert_eq!(username_from_path(Path::new("bob")), "bob");
    }

    #[test]
    fn cookie_line_is_split() {
        let cookies = parse_cookies("id=abc; session=x=y; broken; sid=42\n");
        assert_eq!(
            cookies,
            vec![
                ("id".to_string(), "abc".to_string()),
                ("session".to_string(), "x=y".to_string()),
                ("sid".to_string(), "42".to_string()),
            ]
        );
        assert!(parse_cookies("").is_empty());
    }

    #[tokio::test]
    async fn missing_cookie_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = load_cookies(&dir.path().join("nope.txt")).await.unwrap();
        assert!(cookies.is_empty());
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from([
            "ratings-scrape",
            "http://www.imdb.com/user/ur12345678/ratings",
            "alice.csv",
            "--append",
        ])
        .unwrap();
        assert_eq!(args.start, 1);
        assert_eq!(args.cookies, PathBuf::from("cookies.txt"));
        assert!(args.append);

        let config = RunConfig::from_args(&args).unwrap();
        assert_eq!(config.user_id, "12345678");
        assert_eq!(config.username, "alice");
        assert_eq!(config.retry.max_attempts, 8);
    }
}
