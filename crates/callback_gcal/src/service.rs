// --- File: crates/callback_gcal/src/service.rs ---
//! Google Calendar implementation of the CalendarService trait.

use chrono::{DateTime, Utc};
use callback_common::services::{
    BoxFuture, CalendarService, CreatedEvent, FollowUpEvent,
};
use google_calendar3::api::{
    Event, EventDateTime, EventReminder, EventReminders, FreeBusyRequest, FreeBusyRequestItem,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::HubType;

/// Errors that can occur when talking to Google Calendar.
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("Google API Error: {0}")]
    ApiError(#[from] google_calendar3::Error),
    #[error("Failed to parse time: {0}")]
    TimeParseError(String),
    #[error("Booking conflict")]
    Conflict,
    #[error("Authentication failure: {0}")]
    Auth(String),
}

/// Google Calendar service implementation.
pub struct GoogleCalendarService {
    calendar_hub: Arc<HubType>,
}

impl GoogleCalendarService {
    /// Create a new Google Calendar service around an authenticated hub.
    pub fn new(calendar_hub: Arc<HubType>) -> Self {
        Self { calendar_hub }
    }
}

impl CalendarService for GoogleCalendarService {
    type Error = GcalError;

    /// Retrieves busy intervals for a calendar within a given time range.
    ///
    /// Queries the freebusy endpoint, which collapses the calendar's
    /// events into opaque busy periods. Periods with a missing start or
    /// end are logged and skipped rather than guessed at. The result is
    /// sorted chronologically by start time, but callers must not rely
    /// on that: the allocator re-sorts defensively.
    ///
    /// # Errors
    ///
    /// Returns a `GcalError::ApiError` if the API call fails or the
    /// response cannot be parsed.
    fn list_busy(
        &self,
        calendar_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<(DateTime<Utc>, DateTime<Utc>)>, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let req = FreeBusyRequest {
                time_min: Some(start_time),
                time_max: Some(end_time),
                time_zone: Some("UTC".to_string()),
                items: Some(vec![FreeBusyRequestItem {
                    id: Some(calendar_id.to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            };

            let (_response, freebusy_response) = calendar_hub.freebusy().query(req).doit().await?;

            let mut busy_periods = Vec::new();

            if let Some(calendars) = freebusy_response.calendars {
                if let Some(cal_info) = calendars.get(&calendar_id) {
                    if let Some(busy_times) = &cal_info.busy {
                        for period in busy_times {
                            if let (Some(start_dt), Some(end_dt)) = (period.start, period.end) {
                                busy_periods.push((start_dt, end_dt));
                            } else {
                                warn!(
                                    "skipping busy period with missing start/end: {:?}",
                                    period
                                );
                            }
                        }
                    }
                }
            }
            // Sort busy periods for easier processing
            busy_periods.sort_by_key(|k| k.0);
            Ok(busy_periods)
        })
    }

    /// Creates the follow-up event.
    ///
    /// Validates that the times parse and that the end is after the
    /// start, then re-checks the target interval against the freebusy
    /// data so a booking that raced a freshly-created event surfaces as
    /// `GcalError::Conflict` instead of a silent double-booking. The
    /// popup reminder override is attached when requested.
    fn create_event(
        &self,
        calendar_id: &str,
        event: FollowUpEvent,
    ) -> BoxFuture<'_, CreatedEvent, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();
        let this = self;

        Box::pin(async move {
            let start_dt = DateTime::parse_from_rfc3339(&event.start_time)
                .map_err(|e| GcalError::TimeParseError(format!("Invalid start_time: {}", e)))?
                .with_timezone(&Utc);
            let end_dt = DateTime::parse_from_rfc3339(&event.end_time)
                .map_err(|e| GcalError::TimeParseError(format!("Invalid end_time: {}", e)))?
                .with_timezone(&Utc);

            if end_dt <= start_dt {
                return Err(GcalError::TimeParseError(
                    "End time must be after start time".to_string(),
                ));
            }

            // Check for conflicts with existing events
            let busy_times = this.list_busy(&calendar_id, start_dt, end_dt).await?;
            for (busy_start, busy_end) in &busy_times {
                // Overlap test: (StartA < EndB) and (EndA > StartB)
                if start_dt < *busy_end && end_dt > *busy_start {
                    return Err(GcalError::Conflict);
                }
            }

            let reminders = event.popup_reminder_minutes.map(|minutes| EventReminders {
                use_default: Some(false),
                overrides: Some(vec![EventReminder {
                    method: Some("popup".to_string()),
                    minutes: Some(minutes as i32),
                }]),
            });

            let new_event = Event {
                summary: Some(event.summary),
                description: event.description,
                start: Some(EventDateTime {
                    date_time: Some(start_dt),
                    time_zone: Some("UTC".to_string()),
                    ..Default::default()
                }),
                end: Some(EventDateTime {
                    date_time: Some(end_dt),
                    time_zone: Some("UTC".to_string()),
                    ..Default::default()
                }),
                reminders,
                ..Default::default()
            };

            let (_response, created_event) = calendar_hub
                .events()
                .insert(new_event, &calendar_id)
                .doit()
                .await?;

            info!(
                event_id = ?created_event.id,
                start = %start_dt,
                "follow-up event created"
            );

            Ok(CreatedEvent {
                event_id: created_event.id,
                status: created_event
                    .status
                    .unwrap_or_else(|| "confirmed".to_string()),
            })
        })
    }
}

/// Mock implementation of CalendarService for testing.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock calendar service backed by an in-memory event list.
    pub struct MockCalendarService {
        events: Mutex<HashMap<String, Vec<(String, FollowUpEvent)>>>,
    }

    impl MockCalendarService {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(HashMap::new()),
            }
        }
    }

    impl CalendarService for MockCalendarService {
        type Error = GcalError;

        fn list_busy(
            &self,
            calendar_id: &str,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
        ) -> BoxFuture<'_, Vec<(DateTime<Utc>, DateTime<Utc>)>, Self::Error> {
            let calendar_id = calendar_id.to_string();

            Box::pin(async move {
                let events = self.events.lock().unwrap();
                let calendar_events = events.get(&calendar_id).cloned().unwrap_or_default();

                let mut busy_times = Vec::new();
                for (_, event) in calendar_events {
                    let event_start = DateTime::parse_from_rfc3339(&event.start_time)
                        .map_err(|e| GcalError::TimeParseError(e.to_string()))?
                        .with_timezone(&Utc);
                    let event_end = DateTime::parse_from_rfc3339(&event.end_time)
                        .map_err(|e| GcalError::TimeParseError(e.to_string()))?
                        .with_timezone(&Utc);

                    if event_start < end_time && event_end > start_time {
                        busy_times.push((event_start, event_end));
                    }
                }

                busy_times.sort_by_key(|k| k.0);
                Ok(busy_times)
            })
        }

        fn create_event(
            &self,
            calendar_id: &str,
            event: FollowUpEvent,
        ) -> BoxFuture<'_, CreatedEvent, Self::Error> {
            let calendar_id = calendar_id.to_string();

            Box::pin(async move {
                let start_dt = DateTime::parse_from_rfc3339(&event.start_time)
                    .map_err(|e| GcalError::TimeParseError(format!("Invalid start_time: {}", e)))?
                    .with_timezone(&Utc);
                let end_dt = DateTime::parse_from_rfc3339(&event.end_time)
                    .map_err(|e| GcalError::TimeParseError(format!("Invalid end_time: {}", e)))?
                    .with_timezone(&Utc);

                if end_dt <= start_dt {
                    return Err(GcalError::TimeParseError(
                        "End time must be after start time".to_string(),
                    ));
                }

                let busy_times = self.list_busy(&calendar_id, start_dt, end_dt).await?;
                for (busy_start, busy_end) in &busy_times {
                    if start_dt < *busy_end && end_dt > *busy_start {
                        return Err(GcalError::Conflict);
                    }
                }

                let event_id = format!("mock-event-{}", uuid::Uuid::new_v4());

                let mut events = self.events.lock().unwrap();
                events
                    .entry(calendar_id)
                    .or_insert_with(Vec::new)
                    .push((event_id.clone(), event));

                Ok(CreatedEvent {
                    event_id: Some(event_id),
                    status: "confirmed".to_string(),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockCalendarService;
    use super::*;
    use chrono::TimeZone;

    fn follow_up(start: DateTime<Utc>, minutes: i64, summary: &str) -> FollowUpEvent {
        FollowUpEvent {
            start_time: start.to_rfc3339(),
            end_time: (start + chrono::Duration::minutes(minutes)).to_rfc3339(),
            summary: summary.to_string(),
            description: None,
            popup_reminder_minutes: Some(0),
        }
    }

    #[tokio::test]
    async fn created_events_show_up_as_busy() {
        let service = MockCalendarService::new();
        let start = Utc.with_ymd_and_hms(2025, 9, 12, 16, 0, 0).unwrap();

        let created = service
            .create_event("primary", follow_up(start, 15, "📞 Call back: John Smith"))
            .await
            .unwrap();
        assert!(created.event_id.is_some());

        let busy = service
            .list_busy(
                "primary",
                start - chrono::Duration::hours(1),
                start + chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(busy, vec![(start, start + chrono::Duration::minutes(15))]);
    }

    #[tokio::test]
    async fn double_booking_the_same_interval_conflicts() {
        let service = MockCalendarService::new();
        let start = Utc.with_ymd_and_hms(2025, 9, 12, 16, 0, 0).unwrap();

        service
            .create_event("primary", follow_up(start, 15, "first"))
            .await
            .unwrap();
        let second = service
            .create_event("primary", follow_up(start, 15, "second"))
            .await;
        assert!(matches!(second, Err(GcalError::Conflict)));
    }

    #[tokio::test]
    async fn back_to_back_events_do_not_conflict() {
        let service = MockCalendarService::new();
        let start = Utc.with_ymd_and_hms(2025, 9, 12, 16, 0, 0).unwrap();

        service
            .create_event("primary", follow_up(start, 15, "first"))
            .await
            .unwrap();
        let adjacent = service
            .create_event(
                "primary",
                follow_up(start + chrono::Duration::minutes(15), 15, "second"),
            )
            .await;
        assert!(adjacent.is_ok());
    }

    #[tokio::test]
    async fn garbage_timestamps_are_parse_errors() {
        let service = MockCalendarService::new();
        let result = service
            .create_event(
                "primary",
                FollowUpEvent {
                    start_time: "six pm".to_string(),
                    end_time: "quarter past".to_string(),
                    summary: "broken".to_string(),
                    description: None,
                    popup_reminder_minutes: None,
                },
            )
            .await;
        assert!(matches!(result, Err(GcalError::TimeParseError(_))));
    }
}
