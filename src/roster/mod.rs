//! Maps repository usernames to grading-platform student identifiers.
//!
//! The roster is built once per run, from a CSV file when one exists or from
//! a Google Sheet otherwise, and is read-only afterwards.

pub mod sheet;

use crate::error::{GraderError, Result, RosterLookupError};
use crate::types::grade::RosterEntry;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: HashMap<String, String>,
}

impl Roster {
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Result<Self> {
        let mut map = HashMap::new();
        for entry in entries {
            match map.get(&entry.username) {
                Some(existing) if existing != &entry.student_id => {
                    return Err(GraderError::Roster(format!(
                        "username {} is mapped to both {} and {}",
                        entry.username, existing, entry.student_id
                    )));
                }
                Some(_) => {}
                None => {
                    map.insert(entry.username, entry.student_id);
                }
            }
        }
        Ok(Self { entries: map })
    }

    /// Builds a roster from a header row plus data rows, picking the two
    /// named columns.
    pub fn from_table(
        header: &[String],
        rows: &[Vec<String>],
        username_column: &str,
        id_column: &str,
    ) -> Result<Self> {
        let username_idx = column_index(header, username_column)?;
        let id_idx = column_index(header, id_column)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (line, row) in rows.iter().enumerate() {
            let username = row.get(username_idx).map(|cell| cell.trim()).unwrap_or("");
            let student_id = row.get(id_idx).map(|cell| cell.trim()).unwrap_or("");
            if username.is_empty() || student_id.is_empty() {
                // header is row 1
                warn!(row = line + 2, "skipping roster row with an empty cell");
                continue;
            }
            entries.push(RosterEntry {
                username: username.to_string(),
                student_id: student_id.to_string(),
            });
        }
        Self::from_entries(entries)
    }

    pub fn from_csv_reader<R: Read>(reader: R, username_column: &str, id_column: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let header = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let rows = csv_reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;
        Self::from_table(&header, &rows, username_column, id_column)
    }

    /// Reads a local roster file. Problems with its content are reported as
    /// [`GraderError::RosterFile`], which nothing downstream retries.
    pub fn from_csv_path(path: &Path, username_column: &str, id_column: &str) -> Result<Self> {
        debug!(path = %path.display(), "reading roster file");
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, username_column, id_column).map_err(|err| match err {
            GraderError::Roster(message) => GraderError::RosterFile {
                path: path.display().to_string(),
                message,
            },
            GraderError::Csv(err) => GraderError::RosterFile {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            other => other,
        })
    }

    /// Case-sensitive exact lookup.
    pub fn lookup(&self, username: &str) -> std::result::Result<&str, RosterLookupError> {
        self.entries
            .get(username)
            .map(String::as_str)
            .ok_or_else(|| RosterLookupError {
                username: username.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn column_index(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|column| column.trim() == name)
        .ok_or_else(|| GraderError::Roster(format!("roster has no `{name}` column")))
}
