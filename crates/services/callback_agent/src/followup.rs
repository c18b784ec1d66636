// --- File: crates/services/callback_agent/src/followup.rs ---
//! Follow-up event and notice construction.
//!
//! Titles escalate once a caller has more than one missed call on
//! record; the description carries everything needed to return the call
//! without opening the agent.

use callback_common::services::{FollowUpEvent, FollowUpNotice};
use callback_scheduler::model::{CallRecord, ScheduledSlot};

/// The calendar event for one allocated slot.
pub fn build_event(record: &CallRecord, slot: &ScheduledSlot, missed_count: u32) -> FollowUpEvent {
    let missed_at = record.occurred_at.format("%H:%M");
    let (summary, description) = if missed_count > 1 {
        (
            format!(
                "📞 URGENT - Call back: {} ({}x)",
                record.caller, missed_count
            ),
            format!(
                "MULTIPLE missed calls - follow-up required!\n\n\
                 Caller: {}\n\
                 Last missed call: {}\n\
                 Number of missed calls: {}\n\
                 ⚠️ Multiple attempts - might be important!",
                record.caller, missed_at, missed_count
            ),
        )
    } else {
        (
            format!("📞 Call back: {}", record.caller),
            format!(
                "Follow-up for missed call\n\n\
                 Caller: {}\n\
                 Missed call time: {}\n\
                 Number of missed calls: {}",
                record.caller, missed_at, missed_count
            ),
        )
    };

    FollowUpEvent {
        start_time: slot.start.to_rfc3339(),
        end_time: slot.end.to_rfc3339(),
        summary,
        description: Some(description),
        popup_reminder_minutes: Some(0),
    }
}

/// The desktop notice for one booked slot.
pub fn build_notice(record: &CallRecord, slot: &ScheduledSlot, missed_count: u32) -> FollowUpNotice {
    FollowUpNotice {
        caller: record.caller.clone(),
        missed_at: record.occurred_at.format("%H:%M").to_string(),
        missed_count,
        scheduled_at: slot.start.format("%H:%M").to_string(),
        recovered: record.recovered,
    }
}
