// --- File: crates/callback_store/src/lib.rs ---
//! Durable record of processed missed calls.
//!
//! A flat JSON file mapping dedup keys to booking details, plus a
//! per-caller tally of missed calls and the time of the last write. The
//! file is loaded once at startup and rewritten after every successful
//! booking, so a crash loses at most the record being processed at that
//! moment. The `last_updated` stamp doubles as the offline-gap detector
//! for the wake-up backlog check.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// What got booked for one processed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedEntry {
    pub processed_at: DateTime<Utc>,
    pub scheduled_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    processed_calls: BTreeMap<String, ProcessedEntry>,
    #[serde(default)]
    missed_call_counts: BTreeMap<String, u32>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// The persisted processed-record set.
#[derive(Debug)]
pub struct ProcessedStore {
    path: PathBuf,
    data: StoreData,
}

impl ProcessedStore {
    /// Load the store, treating a missing file as an empty store (first
    /// run). A present-but-corrupt file is an error: silently starting
    /// over would re-book every call in the record file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no processed store yet, starting empty");
                StoreData::default()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(ProcessedStore { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this dedup key has already been turned into a booking.
    pub fn is_processed(&self, dedup_key: &str) -> bool {
        self.data.processed_calls.contains_key(dedup_key)
    }

    /// How many calls from this caller have been missed so far.
    pub fn missed_count(&self, caller: &str) -> u32 {
        self.data
            .missed_call_counts
            .get(caller)
            .copied()
            .unwrap_or(0)
    }

    /// Record a successful booking and persist immediately. Increments
    /// the caller's missed-call tally and refreshes `last_updated`.
    pub fn record_booking(
        &mut self,
        dedup_key: &str,
        caller: &str,
        scheduled_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.data.processed_calls.insert(
            dedup_key.to_string(),
            ProcessedEntry {
                processed_at: now,
                scheduled_start,
            },
        );
        *self
            .data
            .missed_call_counts
            .entry(caller.to_string())
            .or_insert(0) += 1;
        self.data.last_updated = Some(now);
        self.persist()
    }

    /// Refresh `last_updated` without adding an entry, e.g. at the end
    /// of an empty poll, so sleep gaps are measured from real activity.
    pub fn touch(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.data.last_updated = Some(now);
        self.persist()
    }

    /// Write the store to disk.
    pub fn persist(&self) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn total_processed(&self) -> usize {
        self.data.processed_calls.len()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.data.last_updated
    }

    /// The offline gap, if the store has been quiet for longer than
    /// `threshold`. A store with no `last_updated` (first run) has no
    /// gap to report.
    pub fn offline_gap(&self, now: DateTime<Utc>, threshold: Duration) -> Option<Duration> {
        let last = self.data.last_updated?;
        let gap = now - last;
        (gap > threshold).then_some(gap)
    }

    /// Per-caller missed-call tallies, for the summary printout.
    pub fn missed_call_counts(&self) -> &BTreeMap<String, u32> {
        &self.data.missed_call_counts
    }

    /// Processed entries keyed by dedup key.
    pub fn entries(&self) -> &BTreeMap<String, ProcessedEntry> {
        &self.data.processed_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "callback_store_test_{}_{}.json",
            std::process::id(),
            n
        ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 12, 16, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = ProcessedStore::load(scratch_path()).unwrap();
        assert_eq!(store.total_processed(), 0);
        assert!(store.last_updated().is_none());
    }

    #[test]
    fn bookings_survive_a_reload() {
        let path = scratch_path();
        let mut store = ProcessedStore::load(&path).unwrap();
        store
            .record_booking("2025-09-12 14:30|John Smith", "John Smith", now(), now())
            .unwrap();

        let reloaded = ProcessedStore::load(&path).unwrap();
        assert!(reloaded.is_processed("2025-09-12 14:30|John Smith"));
        assert_eq!(reloaded.missed_count("John Smith"), 1);
        assert_eq!(reloaded.last_updated(), Some(now()));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn repeat_callers_are_tallied() {
        let path = scratch_path();
        let mut store = ProcessedStore::load(&path).unwrap();
        store
            .record_booking("2025-09-12 14:30|Kovács János", "Kovács János", now(), now())
            .unwrap();
        store
            .record_booking("2025-09-12 15:10|Kovács János", "Kovács János", now(), now())
            .unwrap();

        assert_eq!(store.missed_count("Kovács János"), 2);
        assert_eq!(store.total_processed(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn corrupt_store_is_an_error_not_a_reset() {
        let path = scratch_path();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ProcessedStore::load(&path),
            Err(StoreError::Serde(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn offline_gap_requires_a_previous_run() {
        let path = scratch_path();
        let mut store = ProcessedStore::load(&path).unwrap();
        assert_eq!(store.offline_gap(now(), Duration::hours(2)), None);

        store.touch(now()).unwrap();
        assert_eq!(
            store.offline_gap(now() + Duration::hours(3), Duration::hours(2)),
            Some(Duration::hours(3))
        );
        assert_eq!(
            store.offline_gap(now() + Duration::minutes(30), Duration::hours(2)),
            None
        );

        std::fs::remove_file(&path).ok();
    }
}
