// --- File: crates/services/callback_agent/src/summary.rs ---
//! The `summary` subcommand: what has been processed so far.

use callback_store::ProcessedStore;
use std::fmt::Write;

/// Render the processed-records summary, the same shape the tracker's
/// predecessors printed.
pub fn render_summary(store: &ProcessedStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📞 MISSED CALLS TRACKER");
    let _ = writeln!(out, "{}", "=".repeat(40));

    let counts = store.missed_call_counts();
    if !counts.is_empty() {
        let _ = writeln!(out, "\n📊 Missed call counts by contact:");
        for (caller, count) in counts {
            let _ = writeln!(out, "   {}: {} missed calls", caller, count);
        }
    }

    let _ = writeln!(out, "\n📈 Total processed calls: {}", store.total_processed());

    if let Some(last_updated) = store.last_updated() {
        let _ = writeln!(out, "Last updated: {}", last_updated.to_rfc3339());
    }

    out
}

pub fn print_summary(store: &ProcessedStore) {
    print!("{}", render_summary(store));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_store() -> ProcessedStore {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "callback_summary_test_{}_{}.json",
            std::process::id(),
            n
        ));
        ProcessedStore::load(path).unwrap()
    }

    #[test]
    fn empty_store_renders_a_zero_total() {
        let store = scratch_store();
        let text = render_summary(&store);
        assert!(text.contains("Total processed calls: 0"));
        assert!(!text.contains("Missed call counts"));
    }

    #[test]
    fn tallies_and_last_updated_are_listed() {
        let mut store = scratch_store();
        let now = Utc.with_ymd_and_hms(2025, 9, 12, 16, 0, 0).unwrap();
        store
            .record_booking("2025-09-12 14:30|John Smith", "John Smith", now, now)
            .unwrap();
        store
            .record_booking("2025-09-12 15:00|John Smith", "John Smith", now, now)
            .unwrap();

        let text = render_summary(&store);
        assert!(text.contains("John Smith: 2 missed calls"));
        assert!(text.contains("Total processed calls: 2"));
        assert!(text.contains("Last updated: 2025-09-12T16:00:00+00:00"));

        std::fs::remove_file(store.path()).ok();
    }
}
