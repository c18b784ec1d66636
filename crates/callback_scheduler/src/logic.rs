// --- File: crates/callback_scheduler/src/logic.rs ---
use crate::model::{BusyInterval, CallRecord, OverflowPolicy, ScheduledSlot};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::{debug, warn};

// --- Error Handling ---
use thiserror::Error;
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("no free {slot_minutes}-minute slot before {cutoff} on {day}")]
    NoSlotAvailable {
        day: NaiveDate,
        cutoff: NaiveTime,
        slot_minutes: i64,
    },
    #[error("local time {0} is ambiguous or nonexistent in {1}")]
    TimezoneConversion(NaiveDateTime, Tz),
    #[error("cutoff time ({cutoff}) must be after base time ({base})")]
    InvalidWindow { base: NaiveTime, cutoff: NaiveTime },
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Resolved scheduling window parameters.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// The timezone all scheduling arithmetic happens in.
    pub timezone: Tz,
    /// Earliest candidate start, e.g. 18:00.
    pub base_time: NaiveTime,
    /// No slot may start at or after this time, e.g. 22:00.
    pub cutoff_time: NaiveTime,
    /// Length of one follow-up slot.
    pub slot_length: Duration,
    /// What happens when the evening is fully booked.
    pub overflow: OverflowPolicy,
}

impl SchedulingConfig {
    /// The UTC instants bounding the allocation window on `day`. Used to
    /// fetch busy intervals for exactly the window the allocator scans.
    pub fn window_utc(
        &self,
        day: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), SchedulerError> {
        let start = resolve_local(self.timezone, day.and_time(self.base_time))?;
        let end = resolve_local(self.timezone, day.and_time(self.cutoff_time))?;
        // The last candidate starts just before the cutoff, so its slot
        // can reach past it by one slot length.
        Ok((
            start.with_timezone(&Utc),
            end.with_timezone(&Utc) + self.slot_length,
        ))
    }
}

impl TryFrom<&callback_config::SchedulerConfig> for SchedulingConfig {
    type Error = SchedulerError;

    fn try_from(config: &callback_config::SchedulerConfig) -> Result<Self, Self::Error> {
        let timezone = Tz::from_str(&config.timezone)
            .map_err(|_| SchedulerError::Configuration(format!(
                "unknown timezone: {:?}",
                config.timezone
            )))?;
        let base_time = callback_config::parse_time_of_day(&config.base_time)
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;
        let cutoff_time = callback_config::parse_time_of_day(&config.cutoff_time)
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;
        if cutoff_time <= base_time {
            return Err(SchedulerError::InvalidWindow {
                base: base_time,
                cutoff: cutoff_time,
            });
        }
        if config.slot_minutes <= 0 {
            return Err(SchedulerError::Configuration(format!(
                "slot_minutes must be positive, got {}",
                config.slot_minutes
            )));
        }
        let overflow = OverflowPolicy::from_str(&config.overflow)
            .map_err(SchedulerError::Configuration)?;
        Ok(SchedulingConfig {
            timezone,
            base_time,
            cutoff_time,
            slot_length: Duration::minutes(config.slot_minutes),
            overflow,
        })
    }
}

/// Resolve a wall-clock time in `tz` to an instant, refusing to guess
/// across DST transitions.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, SchedulerError> {
    tz.from_local_datetime(&naive)
        .single()
        .ok_or(SchedulerError::TimezoneConversion(naive, tz))
}

// --- Allocation Logic ---

/// Finds the earliest free slot on `day`, at or after the base time.
///
/// Candidates are generated at `base_time + k * slot_length` and checked
/// against `busy` with the half-open overlap test; the first conflict-free
/// candidate wins. `busy` may arrive unsorted, the scan copies and sorts
/// it. Pure: same inputs, same answer.
pub fn find_slot(
    busy: &[BusyInterval],
    day: NaiveDate,
    config: &SchedulingConfig,
) -> Result<DateTime<Tz>, SchedulerError> {
    if config.cutoff_time <= config.base_time {
        return Err(SchedulerError::InvalidWindow {
            base: config.base_time,
            cutoff: config.cutoff_time,
        });
    }

    let mut sorted = busy.to_vec();
    sorted.sort_by_key(|interval| interval.start);

    let cutoff = day.and_time(config.cutoff_time);
    let mut candidate = day.and_time(config.base_time);
    while candidate < cutoff {
        let start_local = resolve_local(config.timezone, candidate)?;
        let start = start_local.with_timezone(&Utc);
        let end = start + config.slot_length;

        match sorted.iter().find(|interval| interval.overlaps(start, end)) {
            None => {
                debug!(slot = %start_local, "found free slot");
                return Ok(start_local);
            }
            Some(interval) => {
                debug!(slot = %start_local, busy_until = %interval.end, "slot taken");
            }
        }
        candidate += config.slot_length;
    }

    match config.overflow {
        OverflowPolicy::Fail => Err(SchedulerError::NoSlotAvailable {
            day,
            cutoff: config.cutoff_time,
            slot_minutes: config.slot_length.num_minutes(),
        }),
        OverflowPolicy::ClampAndWarn => {
            let clamped = resolve_local(config.timezone, cutoff)?;
            warn!(
                day = %day,
                slot = %clamped,
                "evening fully booked, clamping follow-up to the cutoff; it may overlap"
            );
            Ok(clamped)
        }
    }
}

/// Allocates slots for a whole batch of records.
///
/// Records are processed in ascending order of the original call time, so
/// earlier calls claim earlier slots, and every accepted slot joins the
/// busy set before the next record is placed: three missed calls on an
/// empty evening pack into 18:00, 18:15, 18:30. Per-record failures are
/// kept alongside the record instead of aborting the batch.
pub fn allocate_batch(
    records: &[CallRecord],
    busy: &[BusyInterval],
    config: &SchedulingConfig,
) -> Vec<(CallRecord, Result<ScheduledSlot, SchedulerError>)> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));

    let mut working = busy.to_vec();
    ordered
        .into_iter()
        .map(|record| {
            let result = find_slot(&working, record.day(), config).map(|start| {
                let end = start + config.slot_length;
                working.push(BusyInterval::new(
                    start.with_timezone(&Utc),
                    end.with_timezone(&Utc),
                ));
                ScheduledSlot {
                    caller: record.caller.clone(),
                    start,
                    end,
                }
            });
            (record, result)
        })
        .collect()
}
