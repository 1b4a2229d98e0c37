use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

use crate::merge::History;
use crate::record::{csv_header, RatingRecord, COL_CONST, COL_POSITION};
use crate::Result;

/// The output CSV. Every write opens, appends and closes the file, so a run
/// that dies midway loses at most the record it was writing.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with its header row. Returns `false`, and leaves the
    /// file alone, when it already exists.
    pub async fn ensure_header(&self, username: &str) -> Result<bool> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(&encode_row(&csv_header(username))?).await?;
        file.flush().await?;
        debug!("Created {} with header", self.path.display());
        Ok(true)
    }

    pub async fn append(&self, record: &RatingRecord) -> Result<()> {
        let line = encode_row(&record.to_csv_fields())?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    /// Reads back everything an earlier run wrote. The header row is skipped.
    pub async fn load_history(&self) -> Result<History> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(History::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut history = History::default();
        for row in reader.records() {
            let row = row?;
            let Some(imdb_id) = row.get(COL_CONST) else {
                continue;
            };
            history.insert(imdb_id);
            if let Some(position) = row.get(COL_POSITION).and_then(|p| p.trim().parse().ok()) {
                history.last_position = position;
            }
        }
        debug!(
            "Loaded {} known ids from {}, last position {}",
            history.len(),
            self.path.display(),
            history.last_position
        );
        Ok(history)
    }
}

fn encode_row<I, T>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(fields)?;
        writer.flush()?;
    }
    Ok(buf)
}
