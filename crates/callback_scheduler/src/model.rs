// --- File: crates/callback_scheduler/src/model.rs ---
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One manually-recorded missed call. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Free-text caller name, never empty.
    pub caller: String,
    /// When the call was missed, in the scheduling timezone.
    pub occurred_at: NaiveDateTime,
    /// True when the record was picked up from an offline backlog.
    #[serde(default)]
    pub recovered: bool,
}

impl CallRecord {
    pub fn new(caller: impl Into<String>, occurred_at: NaiveDateTime) -> Self {
        CallRecord {
            caller: caller.into(),
            occurred_at,
            recovered: false,
        }
    }

    /// Stable identity used to prevent double-booking. Same shape as the
    /// record file line, so store entries stay human-readable.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.occurred_at.format("%Y-%m-%d %H:%M"), self.caller)
    }

    /// The allocation day: the calendar date the call was missed on.
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date()
    }
}

/// An existing calendar commitment. Both instants are UTC; conversion
/// out of the calendar backend happens before construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        BusyInterval { start, end }
    }

    /// Half-open overlap test: touching endpoints do not conflict, so
    /// back-to-back bookings are allowed.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

impl From<(DateTime<Utc>, DateTime<Utc>)> for BusyInterval {
    fn from((start, end): (DateTime<Utc>, DateTime<Utc>)) -> Self {
        BusyInterval::new(start, end)
    }
}

/// An allocated follow-up interval, ready to be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSlot {
    pub caller: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Behavior when every slot before the cutoff is taken.
///
/// The observed fallback in the system this replaces was a silent clamp
/// to the cutoff, which can double-book the evening's last slot. Here the
/// choice is explicit and defaults to failing the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    #[default]
    Fail,
    ClampAndWarn,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fail" => Ok(OverflowPolicy::Fail),
            "clamp-and-warn" => Ok(OverflowPolicy::ClampAndWarn),
            other => Err(format!(
                "unknown overflow policy {other:?} (want \"fail\" or \"clamp-and-warn\")"
            )),
        }
    }
}
