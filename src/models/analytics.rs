use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day schedule aggregate over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAnalyticsRow {
    pub date: NaiveDate,
    pub scheduled_tasks: i64,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub avg_complexity: f64,
    pub completed_tasks: i64,
    pub delayed_tasks: i64,
}
