use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::config::SchedulerConfig;
use crate::models::slot::CandidateSlot;
use crate::services::calendar::CalendarModel;
use crate::services::complexity::{self, ComplexityTier};
use crate::services::schedule_utils;

/// Everything the finder needs to know about one slot request.
#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub duration_hours: f64,
    pub complexity: u8,
    pub deadline: DateTime<Tz>,
    /// Earliest admissible start, derived from dependency end times.
    pub earliest_start: Option<DateTime<Tz>>,
    /// Allowed local start hours, when the customer specified any.
    pub preferred_start_hours: Option<Vec<u32>>,
}

/// Greedy earliest-feasible slot search over a bounded day horizon.
/// Not globally optimal by design: the first admissible slot wins.
#[derive(Debug, Clone)]
pub struct SlotFinder {
    calendar: CalendarModel,
    config: SchedulerConfig,
}

impl SlotFinder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            calendar: CalendarModel::new(config.clone()),
            config,
        }
    }

    /// Scans calendar days from `now` against the given busy intervals and
    /// returns the first slot passing every admission rule, or
    /// `NoSlotAvailable` once the horizon is exhausted.
    pub fn find_slot(
        &self,
        request: &SlotRequest,
        busy: &[(DateTime<Tz>, DateTime<Tz>)],
        now: DateTime<Tz>,
    ) -> AppResult<CandidateSlot> {
        if request.duration_hours <= 0.0 {
            return Err(AppError::validation("slot duration must be positive"));
        }

        let duration = schedule_utils::hours_to_duration(request.duration_hours);
        let horizon = self.config.search_horizon_days;

        for day_offset in 0..horizon {
            let day = (now + Duration::days(day_offset)).date_naive();
            if day > request.deadline.date_naive() {
                break;
            }

            for interval in self.calendar.free_intervals(day, busy) {
                let mut start = interval.start;
                // Never hand out a slot in the past.
                if day_offset == 0 && start < now {
                    start = now;
                }
                if let Some(earliest) = request.earliest_start {
                    if start < earliest {
                        start = earliest;
                    }
                }
                if let Some(hours) = &request.preferred_start_hours {
                    // A free interval rarely begins on a preferred hour;
                    // advance to the earliest one it still contains.
                    match next_preferred_start(start, hours) {
                        Some(aligned) => start = aligned,
                        None => continue,
                    }
                }

                let end = start + duration;
                if end > interval.end {
                    continue;
                }
                if !self.admits(request, start, end) {
                    continue;
                }

                debug!(
                    target: "scheduler::slots",
                    start = %start,
                    end = %end,
                    day_offset,
                    "slot found"
                );
                return Ok(CandidateSlot {
                    start,
                    end,
                    available_hours: schedule_utils::duration_hours(start, interval.end),
                });
            }
        }

        Err(AppError::no_slot_available(horizon))
    }

    /// Admission rules, checked in order: deadline, complex-tier start-hour
    /// cutoff, customer-preferred start hours.
    fn admits(&self, request: &SlotRequest, start: DateTime<Tz>, end: DateTime<Tz>) -> bool {
        if end > request.deadline {
            return false;
        }

        if complexity::tier(request.complexity) == ComplexityTier::Complex
            && start.hour() > self.config.complex_start_cutoff_hour
        {
            return false;
        }

        if let Some(hours) = &request.preferred_start_hours {
            if !hours.contains(&start.hour()) {
                return false;
            }
        }

        true
    }
}

/// The earliest instant at or after `start`, on the same local day, whose
/// hour is in the preferred set. Sub-hour offsets are kept when `start`
/// already qualifies; otherwise the candidate snaps to the top of the hour.
fn next_preferred_start(start: DateTime<Tz>, hours: &[u32]) -> Option<DateTime<Tz>> {
    if hours.contains(&start.hour()) {
        return Some(start);
    }
    let next_hour = hours
        .iter()
        .copied()
        .filter(|&hour| hour > start.hour())
        .min()?;
    start
        .with_hour(next_hour)
        .and_then(|dt| dt.with_minute(0))
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use chrono_tz::UTC;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            timezone: UTC,
            workday_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            workday_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            buffer_minutes: 30,
            ..SchedulerConfig::default()
        }
    }

    // 2025-06-02 is a Monday.
    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap() + Duration::days(offset)
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Tz> {
        schedule_utils::local_datetime(UTC, date, NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
            .unwrap()
    }

    fn request(duration_hours: f64, complexity: u8, deadline: DateTime<Tz>) -> SlotRequest {
        SlotRequest {
            duration_hours,
            complexity,
            deadline,
            earliest_start: None,
            preferred_start_hours: None,
        }
    }

    #[test]
    fn first_gap_after_buffer_wins() {
        // Working 08:00-17:00, buffer 30 min, one task 09:00-11:00:
        // a 2-hour simple request lands at 11:30-13:30 on the same day.
        let finder = SlotFinder::new(config());
        let busy = vec![(at(day(0), 9, 0), at(day(0), 11, 0))];
        let now = at(day(0), 8, 0);

        let slot = finder
            .find_slot(&request(2.0, 2, at(day(3), 17, 0)), &busy, now)
            .unwrap();

        assert_eq!(slot.start, at(day(0), 11, 30));
        assert_eq!(slot.end, at(day(0), 13, 30));
    }

    #[test]
    fn slot_duration_always_matches_the_request() {
        let finder = SlotFinder::new(config());
        let now = at(day(0), 8, 0);
        for hours in [0.5, 1.0, 3.5, 8.0] {
            let slot = finder
                .find_slot(&request(hours, 2, at(day(10), 17, 0)), &[], now)
                .unwrap();
            assert_eq!(
                slot.end - slot.start,
                schedule_utils::hours_to_duration(hours)
            );
        }
    }

    #[test]
    fn deadline_is_never_violated() {
        let finder = SlotFinder::new(config());
        let busy = vec![(at(day(0), 8, 0), at(day(0), 16, 0))];
        // Only 16:30-17:00 remains on day 0 and the deadline ends there.
        let result = finder.find_slot(&request(2.0, 2, at(day(0), 17, 0)), &busy, at(day(0), 8, 0));
        assert!(matches!(result, Err(AppError::NoSlotAvailable { .. })));
    }

    #[test]
    fn complex_work_is_kept_out_of_the_late_afternoon() {
        let finder = SlotFinder::new(config());
        // Day 0 is fully blocked until 15:00; a complex task cannot start
        // at 15:30, so it rolls over to the next morning.
        let busy = vec![(at(day(0), 8, 0), at(day(0), 15, 0))];
        let now = at(day(0), 8, 0);

        let slot = finder
            .find_slot(&request(1.0, 8, at(day(5), 17, 0)), &busy, now)
            .unwrap();
        assert_eq!(slot.start, at(day(1), 8, 0));

        // The same request at simple complexity takes the afternoon gap.
        let slot = finder
            .find_slot(&request(1.0, 2, at(day(5), 17, 0)), &busy, now)
            .unwrap();
        assert_eq!(slot.start, at(day(0), 15, 30));
    }

    #[test]
    fn preferred_start_hours_are_honored() {
        let finder = SlotFinder::new(config());
        let mut req = request(1.0, 2, at(day(5), 17, 0));
        req.preferred_start_hours = Some(vec![13]);
        let now = at(day(0), 8, 0);

        let slot = finder.find_slot(&req, &[], now).unwrap();
        assert_eq!(slot.start, at(day(0), 13, 0));
    }

    #[test]
    fn preferred_hour_is_reached_inside_an_open_interval() {
        // Empty calendar: no busy boundary falls on the preferred hour, so
        // the candidate start must advance to it within the free interval.
        let finder = SlotFinder::new(config());
        let mut req = request(2.0, 2, at(day(5), 17, 0));
        req.preferred_start_hours = Some(vec![9, 14]);
        let now = at(day(0), 8, 0);

        let slot = finder.find_slot(&req, &[], now).unwrap();
        assert_eq!(slot.start, at(day(0), 9, 0));
        assert_eq!(slot.end, at(day(0), 11, 0));
    }

    #[test]
    fn preferred_hour_already_past_rolls_to_the_next_day() {
        let finder = SlotFinder::new(config());
        let mut req = request(1.0, 2, at(day(5), 17, 0));
        req.preferred_start_hours = Some(vec![9]);
        // 10:15 is past the only preferred hour for today.
        let now = at(day(0), 10, 15);

        let slot = finder.find_slot(&req, &[], now).unwrap();
        assert_eq!(slot.start, at(day(1), 9, 0));
    }

    #[test]
    fn mid_hour_start_keeps_its_offset_when_the_hour_qualifies() {
        let finder = SlotFinder::new(config());
        let mut req = request(1.0, 2, at(day(5), 17, 0));
        req.preferred_start_hours = Some(vec![13]);
        let now = at(day(0), 13, 20);

        let slot = finder.find_slot(&req, &[], now).unwrap();
        assert_eq!(slot.start, now);
    }

    #[test]
    fn preferred_hour_with_no_room_left_is_rejected() {
        let finder = SlotFinder::new(config());
        let mut req = request(2.0, 2, at(day(0), 17, 0));
        req.preferred_start_hours = Some(vec![16]);
        let now = at(day(0), 8, 0);

        // 16:00 + 2h runs past the 17:00 window edge and the deadline ends
        // the search at day 0.
        let result = finder.find_slot(&req, &[], now);
        assert!(matches!(result, Err(AppError::NoSlotAvailable { .. })));
    }

    #[test]
    fn dependencies_push_the_start_forward() {
        let finder = SlotFinder::new(config());
        let mut req = request(2.0, 2, at(day(5), 17, 0));
        req.earliest_start = Some(at(day(0), 12, 0));
        let now = at(day(0), 8, 0);

        let slot = finder.find_slot(&req, &[], now).unwrap();
        assert_eq!(slot.start, at(day(0), 12, 0));
    }

    #[test]
    fn slots_never_start_in_the_past() {
        let finder = SlotFinder::new(config());
        let now = at(day(0), 10, 15);
        let slot = finder
            .find_slot(&request(1.0, 2, at(day(3), 17, 0)), &[], now)
            .unwrap();
        assert_eq!(slot.start, now);
    }

    #[test]
    fn weekend_days_are_skipped() {
        let finder = SlotFinder::new(config());
        // 2025-06-06 is a Friday; now late Friday pushes work to Monday.
        let friday = day(4);
        let now = at(friday, 16, 45);
        let slot = finder
            .find_slot(&request(2.0, 2, at(day(10), 17, 0)), &[], now)
            .unwrap();
        assert_eq!(slot.start, at(day(7), 8, 0));
    }

    #[test]
    fn full_horizon_exhaustion_returns_no_slot() {
        let mut cfg = config();
        cfg.search_horizon_days = 5;
        let finder = SlotFinder::new(cfg);

        // Every day in the horizon is fully booked.
        let busy: Vec<_> = (0..7)
            .map(|offset| (at(day(offset), 8, 0), at(day(offset), 17, 0)))
            .collect();

        let result = finder.find_slot(
            &request(2.0, 2, at(day(30), 17, 0)),
            &busy,
            at(day(0), 8, 0),
        );
        assert!(matches!(
            result,
            Err(AppError::NoSlotAvailable { horizon_days: 5 })
        ));
    }

    #[test]
    fn slot_start_stays_inside_the_working_window() {
        let finder = SlotFinder::new(config());
        let now = at(day(0), 5, 0);
        let slot = finder
            .find_slot(&request(2.0, 2, at(day(3), 17, 0)), &[], now)
            .unwrap();
        assert_eq!(slot.start, at(day(0), 8, 0));
        assert!(slot.end <= at(day(0), 17, 0));
    }
}
