#[cfg(test)]
mod tests {
    use crate::logic::{find_slot, SchedulerError, SchedulingConfig};
    use crate::model::{BusyInterval, OverflowPolicy};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn scheduling_config() -> SchedulingConfig {
        SchedulingConfig {
            timezone: Tz::Europe__Budapest,
            base_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            cutoff_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            slot_length: Duration::minutes(15),
            overflow: OverflowPolicy::Fail,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 12).unwrap()
    }

    // Busy intervals described as minute offsets from the 18:00 base, so
    // generated cases always land inside (or just around) the window.
    fn busy_from_offsets(offsets: &[(i64, i64)]) -> Vec<BusyInterval> {
        let tz = Tz::Europe__Budapest;
        let base = tz.with_ymd_and_hms(2025, 9, 12, 18, 0, 0).unwrap();
        offsets
            .iter()
            .map(|&(start_offset, length)| {
                let start = base + Duration::minutes(start_offset);
                let end = start + Duration::minutes(length.max(1));
                BusyInterval::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
            })
            .collect()
    }

    proptest! {
        // Any returned slot is on the candidate grid, inside the window.
        #[test]
        fn slot_is_grid_aligned_within_window(
            offsets in prop::collection::vec((-30i64..270, 1i64..90), 0..8)
        ) {
            let config = scheduling_config();
            let busy = busy_from_offsets(&offsets);

            if let Ok(slot) = find_slot(&busy, day(), &config) {
                let time = slot.time();
                prop_assert!(time >= config.base_time, "slot before base: {time}");
                prop_assert!(time < config.cutoff_time, "slot at/after cutoff: {time}");

                let offset = time.signed_duration_since(config.base_time);
                prop_assert_eq!(
                    offset.num_minutes() % config.slot_length.num_minutes(),
                    0,
                    "slot off the candidate grid: {}", time
                );
            }
        }

        // The returned slot never overlaps any busy interval.
        #[test]
        fn slot_never_overlaps_busy(
            offsets in prop::collection::vec((-30i64..270, 1i64..90), 1..8)
        ) {
            let config = scheduling_config();
            let busy = busy_from_offsets(&offsets);

            if let Ok(slot) = find_slot(&busy, day(), &config) {
                let start = slot.with_timezone(&Utc);
                let end = start + config.slot_length;
                for interval in &busy {
                    prop_assert!(
                        !interval.overlaps(start, end),
                        "slot {} overlaps busy {:?}", slot, interval
                    );
                }
            }
        }

        // Pure function: same inputs, same answer; order of busy input
        // makes no difference.
        #[test]
        fn find_slot_is_deterministic_and_order_insensitive(
            offsets in prop::collection::vec((-30i64..270, 1i64..90), 0..8)
        ) {
            let config = scheduling_config();
            let busy = busy_from_offsets(&offsets);
            let mut reversed = busy.clone();
            reversed.reverse();

            let first = find_slot(&busy, day(), &config);
            let second = find_slot(&busy, day(), &config);
            let shuffled = find_slot(&reversed, day(), &config);

            match (first, second, shuffled) {
                (Ok(a), Ok(b), Ok(c)) => {
                    prop_assert_eq!(a, b);
                    prop_assert_eq!(b, c);
                }
                (Err(SchedulerError::NoSlotAvailable { .. }),
                 Err(SchedulerError::NoSlotAvailable { .. }),
                 Err(SchedulerError::NoSlotAvailable { .. })) => {}
                other => prop_assert!(false, "inconsistent outcomes: {:?}", other),
            }
        }

        // An empty calendar always yields the base time, whatever the
        // (valid) window looks like.
        #[test]
        fn empty_calendar_yields_base_time(
            base_hour in 6u32..20,
            window_slots in 1i64..16,
        ) {
            let base_time = NaiveTime::from_hms_opt(base_hour, 0, 0).unwrap();
            let config = SchedulingConfig {
                base_time,
                cutoff_time: base_time + Duration::minutes(window_slots * 15),
                ..scheduling_config()
            };

            let slot = find_slot(&[], day(), &config).unwrap();
            prop_assert_eq!(slot.time(), config.base_time);
        }
    }
}
