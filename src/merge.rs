//! Decides, record by record, what gets written and when a resumed run has
//! caught up with the file written by an earlier run.
//!
//! Ratings come back newest first, so in append mode the first title that is
//! already in the file marks the end of the new ones.

use std::collections::{HashMap, HashSet};

use crate::record::{is_shared_id_type, ExtractedRow, RatingRecord};

/// Ids seen so far, each with every title type it appeared under.
#[derive(Debug, Default, Clone)]
pub struct IdIndex {
    ids: HashMap<String, Vec<String>>,
}

impl IdIndex {
    pub fn insert(&mut self, imdb_id: &str, title_type: &str) {
        self.ids
            .entry(imdb_id.to_string())
            .or_default()
            .push(title_type.to_string());
    }

    pub fn contains(&self, imdb_id: &str) -> bool {
        self.ids.contains_key(imdb_id)
    }

    /// True if `row` repeats an id already indexed, unless either side is an
    /// episode or series (those legitimately share ids).
    pub fn is_duplicate(&self, row: &ExtractedRow) -> bool {
        match self.ids.get(&row.imdb_id) {
            Some(types) => !row.may_share_id() && !types.iter().any(|t| is_shared_id_type(t)),
            None => false,
        }
    }
}

/// What an earlier run left in the output file. Any id in here ends the run,
/// whatever its title type, so only the ids are kept.
#[derive(Debug, Default, Clone)]
pub struct History {
    pub(crate) known: HashSet<String>,
    pub last_position: u64,
}

impl History {
    pub fn insert(&mut self, imdb_id: &str) {
        self.known.insert(imdb_id.to_string());
    }

    pub fn contains(&self, imdb_id: &str) -> bool {
        self.known.contains(imdb_id)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// Write this record. `duplicate` flags an id already written this run.
    Write {
        record: RatingRecord,
        duplicate: bool,
    },
    /// The record is already in the file; stop the whole walk.
    Stop,
}

/// Run state for the merge. Fresh mode when there is no history.
#[derive(Debug, Default)]
pub struct Merger {
    history: Option<History>,
    written: IdIndex,
    written_count: u64,
}

impl Merger {
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn append(history: History) -> Self {
        Self {
            history: Some(history),
            ..Self::default()
        }
    }

    /// Position the next written record gets.
    pub fn next_position(&self) -> u64 {
        let base = self.history.as_ref().map_or(0, |h| h.last_position);
        base + self.written_count + 1
    }

    pub fn decide(&self, row: ExtractedRow) -> Decision {
        if let Some(history) = &self.history {
            if history.contains(&row.imdb_id) {
                return Decision::Stop;
            }
        }
        let duplicate = self.written.is_duplicate(&row);
        Decision::Write {
            record: RatingRecord::new(self.next_position(), row),
            duplicate,
        }
    }

    /// Records that `record` made it to the file.
    pub fn commit(&mut self, record: &RatingRecord) {
        self.written
            .insert(&record.row.imdb_id, &record.row.title_type);
        self.written_count += 1;
    }

    pub fn written_count(&self) -> u64 {
        self.written_count
    }
}
