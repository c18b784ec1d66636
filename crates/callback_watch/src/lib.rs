// --- File: crates/callback_watch/src/lib.rs ---
//! The record source: a human-edited text file of missed calls.
//!
//! One record per line, `YYYY-MM-DD HH:MM | Caller Name`. Blank lines and
//! `#` comments are ignored; anything else that fails to parse is logged
//! and skipped, never fatal. A missing file is seeded with a short format
//! header so there is something to edit.

use callback_scheduler::model::CallRecord;
use chrono::{Duration, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const FILE_HEADER: &str = "# Add missed calls manually:\n\
# Format: YYYY-MM-DD HH:MM | Caller Name\n\
# Example: 2025-09-11 14:30 | János Kovács\n\n";

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("record file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record line {line_no}: {reason}")]
    ParseError { line_no: usize, reason: String },
}

/// Parse one record line. The caller decides whether a failure is fatal;
/// in the polling loop it never is.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<CallRecord, WatchError> {
    let (time_part, caller_part) = line.split_once('|').ok_or(WatchError::ParseError {
        line_no,
        reason: "missing '|' separator".to_string(),
    })?;

    let occurred_at = NaiveDateTime::parse_from_str(time_part.trim(), "%Y-%m-%d %H:%M")
        .map_err(|err| WatchError::ParseError {
            line_no,
            reason: format!("bad timestamp {:?}: {err}", time_part.trim()),
        })?;

    let caller = caller_part.trim();
    if caller.is_empty() {
        return Err(WatchError::ParseError {
            line_no,
            reason: "empty caller name".to_string(),
        });
    }

    Ok(CallRecord::new(caller, occurred_at))
}

/// The human-edited missed-call record file.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable record. Records older than `retention` at
    /// `now` stay eligible but are flagged as recovered from backlog.
    pub fn read_records(
        &self,
        now: NaiveDateTime,
        retention: Duration,
    ) -> Result<Vec<CallRecord>, WatchError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::write(&self.path, FILE_HEADER)?;
                warn!(path = %self.path.display(), "record file missing, seeded an empty one");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_record_line(line, index + 1) {
                Ok(mut record) => {
                    record.recovered = now - record.occurred_at > retention;
                    records.push(record);
                }
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "skipping malformed record line");
                }
            }
        }
        Ok(records)
    }
}
