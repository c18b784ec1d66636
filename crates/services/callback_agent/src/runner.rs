// --- File: crates/services/callback_agent/src/runner.rs ---
//! The polling main loop and its batch-processing step.
//!
//! One poll is one idempotent batch: read the record file, drop keys the
//! store already processed, allocate slots in call order, book each slot,
//! notify, persist. Per-record failures leave that record for the next
//! poll; a calendar-service failure (after its bounded retries) aborts
//! the rest of the batch but never the process.

use crate::followup;
use callback_common::services::{CalendarService, FollowUpEvent, NotificationSink};
use callback_scheduler::logic::{allocate_batch, SchedulerError, SchedulingConfig};
use callback_scheduler::model::{BusyInterval, CallRecord};
use callback_store::{ProcessedStore, StoreError};
use callback_watch::{RecordFile, WatchError};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("calendar service error: {0}")]
    Calendar(String),
}

/// What one batch did. `aborted` is set when a calendar failure cut the
/// batch short; the remaining records are retried next poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub booked: usize,
    pub failed: usize,
    pub already_processed: usize,
    pub aborted: bool,
}

/// Tunables the runner needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub calendar_id: String,
    pub retention: chrono::Duration,
    pub offline_gap: chrono::Duration,
    pub request_timeout: StdDuration,
    pub max_retries: u32,
}

/// The main loop: collaborators injected at the trait seams so tests can
/// run against an in-memory calendar and a capturing sink.
pub struct Runner<C, N> {
    calendar: C,
    sink: N,
    records: RecordFile,
    store: ProcessedStore,
    scheduling: SchedulingConfig,
    options: RunnerOptions,
}

impl<C: CalendarService, N: NotificationSink> Runner<C, N> {
    pub fn new(
        calendar: C,
        sink: N,
        records: RecordFile,
        store: ProcessedStore,
        scheduling: SchedulingConfig,
        options: RunnerOptions,
    ) -> Self {
        Runner {
            calendar,
            sink,
            records,
            store,
            scheduling,
            options,
        }
    }

    pub fn store(&self) -> &ProcessedStore {
        &self.store
    }

    /// Process everything currently pending. Idempotent: a second call
    /// with nothing new in the record file books nothing.
    pub async fn process_pending(&mut self) -> Result<BatchReport, RunnerError> {
        let now_utc = Utc::now();
        let now_local = now_utc
            .with_timezone(&self.scheduling.timezone)
            .naive_local();

        let wake_up_backlog = match self.store.offline_gap(now_utc, self.options.offline_gap) {
            Some(gap) => {
                info!(
                    hours_offline = gap.num_hours(),
                    "offline gap detected, treating pending records as backlog"
                );
                true
            }
            None => false,
        };

        let mut report = BatchReport::default();
        let all_records = self
            .records
            .read_records(now_local, self.options.retention)?;
        let mut pending: Vec<CallRecord> = Vec::new();
        for mut record in all_records {
            if self.store.is_processed(&record.dedup_key()) {
                report.already_processed += 1;
                continue;
            }
            record.recovered |= wake_up_backlog;
            pending.push(record);
        }

        if pending.is_empty() {
            self.store.touch(now_utc)?;
            return Ok(report);
        }
        info!(count = pending.len(), "processing new missed calls");

        // One fresh busy snapshot per allocation day, never cached.
        let days: BTreeSet<NaiveDate> = pending.iter().map(|record| record.day()).collect();
        let mut busy: Vec<BusyInterval> = Vec::new();
        for day in days {
            let (window_start, window_end) = self.scheduling.window_utc(day)?;
            let intervals = self.list_busy_bounded(window_start, window_end).await?;
            busy.extend(intervals.into_iter().map(BusyInterval::from));
        }

        for (record, allocation) in allocate_batch(&pending, &busy, &self.scheduling) {
            let slot = match allocation {
                Ok(slot) => slot,
                Err(err) => {
                    warn!(
                        caller = %record.caller,
                        %err,
                        "no slot allocated, record stays pending"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let missed_count = self.store.missed_count(&record.caller) + 1;
            let event = followup::build_event(&record, &slot, missed_count);
            match self.create_event_bounded(event).await {
                Ok(()) => {}
                Err(err) => {
                    error!(%err, "calendar unavailable, aborting this batch");
                    report.aborted = true;
                    break;
                }
            }

            // Fire-and-forget: a lost notification never unwinds a booking.
            let notice = followup::build_notice(&record, &slot, missed_count);
            if let Err(err) = self.sink.notify(notice).await {
                warn!(caller = %record.caller, %err, "desktop notification failed");
            }

            self.store.record_booking(
                &record.dedup_key(),
                &record.caller,
                slot.start.with_timezone(&Utc),
                now_utc,
            )?;
            info!(
                caller = %record.caller,
                scheduled = %slot.start,
                missed_count,
                "callback booked"
            );
            report.booked += 1;
        }

        self.store.touch(Utc::now())?;
        Ok(report)
    }

    /// Poll forever. Ctrl-C persists the store and exits cleanly.
    pub async fn run_loop(&mut self, poll_interval: StdDuration) -> Result<(), RunnerError> {
        info!(
            every_secs = poll_interval.as_secs(),
            records = %self.records.path().display(),
            "missed-call tracker started"
        );
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.process_pending().await {
                        Ok(report) if report.booked > 0 => {
                            info!(booked = report.booked, failed = report.failed, "batch done");
                        }
                        Ok(_) => {}
                        Err(err) => error!(%err, "batch failed, retrying next poll"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    self.store.persist()?;
                    return Ok(());
                }
            }
        }
    }

    async fn list_busy_bounded(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, RunnerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let call = self
                .calendar
                .list_busy(&self.options.calendar_id, start, end);
            match tokio::time::timeout(self.options.request_timeout, call).await {
                Ok(Ok(intervals)) => return Ok(intervals),
                Ok(Err(err)) if attempt <= self.options.max_retries => {
                    warn!(attempt, %err, "list_busy failed, retrying");
                }
                Ok(Err(err)) => return Err(RunnerError::Calendar(err.to_string())),
                Err(_) if attempt <= self.options.max_retries => {
                    warn!(attempt, "list_busy timed out, retrying");
                }
                Err(_) => {
                    return Err(RunnerError::Calendar(format!(
                        "list_busy timed out after {} attempts",
                        attempt
                    )))
                }
            }
        }
    }

    async fn create_event_bounded(&self, event: FollowUpEvent) -> Result<(), RunnerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let call = self
                .calendar
                .create_event(&self.options.calendar_id, event.clone());
            match tokio::time::timeout(self.options.request_timeout, call).await {
                Ok(Ok(created)) => {
                    info!(event_id = ?created.event_id, summary = %event.summary, "event created");
                    return Ok(());
                }
                Ok(Err(err)) if attempt <= self.options.max_retries => {
                    warn!(attempt, %err, "create_event failed, retrying");
                }
                Ok(Err(err)) => return Err(RunnerError::Calendar(err.to_string())),
                Err(_) if attempt <= self.options.max_retries => {
                    warn!(attempt, "create_event timed out, retrying");
                }
                Err(_) => {
                    return Err(RunnerError::Calendar(format!(
                        "create_event timed out after {} attempts",
                        attempt
                    )))
                }
            }
        }
    }
}
