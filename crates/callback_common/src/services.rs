// --- File: crates/callback_common/src/services.rs ---
//! Service abstractions for external collaborators.
//!
//! This module provides trait definitions for the external services the
//! agent talks to. These traits allow for dependency injection and easier
//! testing by decoupling the batch-processing logic from the concrete
//! Google Calendar client and the desktop notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A trait for calendar service operations.
///
/// Busy intervals are reported as `(start, end)` pairs in UTC; callers
/// convert them into the scheduling timezone before comparison.
pub trait CalendarService: Send + Sync {
    /// Error type returned by calendar service operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// List busy intervals within a specified time range.
    #[allow(clippy::type_complexity)]
    fn list_busy(
        &self,
        calendar_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<(DateTime<Utc>, DateTime<Utc>)>, Self::Error>;

    /// Create a follow-up event and return its id.
    fn create_event(
        &self,
        calendar_id: &str,
        event: FollowUpEvent,
    ) -> BoxFuture<'_, CreatedEvent, Self::Error>;
}

/// A trait for the notification sink.
///
/// Delivery is fire-and-forget: a failed notification must never roll
/// back or block the booking it describes.
pub trait NotificationSink: Send + Sync {
    /// Error type returned by notification operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Announce a scheduled follow-up on the desktop.
    fn notify(&self, notice: FollowUpNotice) -> BoxFuture<'_, (), Self::Error>;
}

/// A follow-up event to be written to the calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpEvent {
    /// The start time of the event, RFC 3339.
    pub start_time: String,
    /// The end time of the event, RFC 3339.
    pub end_time: String,
    /// The summary or title of the event.
    pub summary: String,
    /// An optional description of the event.
    pub description: Option<String>,
    /// Popup reminder offset in minutes before the event, if any.
    pub popup_reminder_minutes: Option<i64>,
}

/// Represents the result of an event-creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    /// The ID of the event.
    pub event_id: Option<String>,
    /// The status of the event.
    pub status: String,
}

/// The payload handed to the notification sink after a booking.
#[derive(Debug, Clone)]
pub struct FollowUpNotice {
    /// Who called.
    pub caller: String,
    /// When the call was missed, formatted for display (HH:MM).
    pub missed_at: String,
    /// How many calls from this caller have been missed so far.
    pub missed_count: u32,
    /// When the callback is scheduled, formatted for display (HH:MM).
    pub scheduled_at: String,
    /// True when the record was recovered from an offline backlog.
    pub recovered: bool,
}
