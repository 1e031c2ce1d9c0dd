use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::config::SchedulerConfig;
use crate::services::schedule_utils;

/// A free stretch of working time on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Converts the working-hours configuration into concrete per-day free
/// intervals, subtracting already-scheduled work padded by the buffer.
#[derive(Debug, Clone)]
pub struct CalendarModel {
    config: SchedulerConfig,
}

impl CalendarModel {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.config.is_working_day(date.weekday())
    }

    /// The working window for a date, or `None` on non-working days and on
    /// days where the wall-clock window cannot be resolved (DST gap).
    pub fn day_window(&self, date: NaiveDate) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        if !self.is_working_day(date) {
            return None;
        }

        let tz = self.config.timezone;
        let start = schedule_utils::local_datetime(tz, date, self.config.workday_start);
        let end = schedule_utils::local_datetime(tz, date, self.config.workday_end);
        match (start, end) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => {
                warn!(target: "scheduler::calendar", %date, "working window unresolvable, skipping day");
                None
            }
        }
    }

    /// Free sub-intervals of the date's working window, in chronological
    /// order. Each busy interval is padded by the buffer on both sides
    /// before subtraction. Intervals shorter than a requested duration are
    /// the caller's problem to discard.
    pub fn free_intervals(
        &self,
        date: NaiveDate,
        busy: &[(DateTime<Tz>, DateTime<Tz>)],
    ) -> Vec<FreeInterval> {
        let Some((window_start, window_end)) = self.day_window(date) else {
            return Vec::new();
        };

        let buffer = self.config.buffer();
        let mut padded: Vec<(DateTime<Tz>, DateTime<Tz>)> = busy
            .iter()
            .filter(|(start, end)| start < end)
            .map(|(start, end)| (*start - buffer, *end + buffer))
            .filter(|(start, end)| *start < window_end && *end > window_start)
            .collect();
        padded.sort_by_key(|(start, _)| *start);

        let mut intervals = Vec::new();
        let mut cursor = window_start;
        for (busy_start, busy_end) in padded {
            if busy_start > cursor {
                intervals.push(FreeInterval {
                    start: cursor,
                    end: busy_start,
                });
            }
            if busy_end > cursor {
                cursor = busy_end;
            }
        }

        if cursor < window_end {
            intervals.push(FreeInterval {
                start: cursor,
                end: window_end,
            });
        }

        intervals
    }
}
