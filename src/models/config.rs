use chrono::{Duration, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Process-wide calendar configuration. Loaded once at scheduler
/// construction and never mutated afterwards.
///
/// The policy knobs (`complex_start_cutoff_hour`, `reschedule_window_days`)
/// are workshop heuristics with no deeper rationale; they are configuration
/// rather than constants so a deployment can tune them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    pub timezone: Tz,
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
    pub working_days: Vec<Weekday>,
    pub max_daily_hours: f64,
    pub buffer_minutes: i64,
    /// Complex-tier tasks may not start after this local hour.
    pub complex_start_cutoff_hour: u32,
    /// Deadline window used when the conflict resolver re-slots a task.
    pub reschedule_window_days: i64,
    pub search_horizon_days: i64,
    /// Local hour at which the daily workload assessment fires.
    pub daily_assessment_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            workday_start: NaiveTime::from_hms_opt(8, 0, 0).expect("08:00 must be valid"),
            workday_end: NaiveTime::from_hms_opt(17, 0, 0).expect("17:00 must be valid"),
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            max_daily_hours: 8.0,
            buffer_minutes: 30,
            complex_start_cutoff_hour: 14,
            reschedule_window_days: 7,
            search_horizon_days: 30,
            daily_assessment_hour: 6,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.workday_end <= self.workday_start {
            return Err(AppError::configuration(
                "workday end must be after workday start",
            ));
        }
        if self.working_days.is_empty() {
            return Err(AppError::configuration("working days must not be empty"));
        }
        if self.max_daily_hours <= 0.0 {
            return Err(AppError::configuration("max daily hours must be positive"));
        }
        if self.buffer_minutes < 0 {
            return Err(AppError::configuration("buffer minutes must not be negative"));
        }
        if self.search_horizon_days <= 0 || self.reschedule_window_days <= 0 {
            return Err(AppError::configuration(
                "search horizon and reschedule window must be positive",
            ));
        }
        if self.complex_start_cutoff_hour > 23 || self.daily_assessment_hour > 23 {
            return Err(AppError::configuration("hour settings must be within 0-23"));
        }
        Ok(())
    }

    pub fn is_working_day(&self, weekday: Weekday) -> bool {
        self.working_days.contains(&weekday)
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }
}
