use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Categorical workload recommendation, most urgent first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadRecommendation {
    Overloaded,
    High,
    ComplexHeavy,
    Light,
    Optimal,
}

impl WorkloadRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadRecommendation::Overloaded => "overloaded",
            WorkloadRecommendation::High => "high",
            WorkloadRecommendation::ComplexHeavy => "complex_heavy",
            WorkloadRecommendation::Light => "light",
            WorkloadRecommendation::Optimal => "optimal",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            WorkloadRecommendation::Overloaded => "Consider rescheduling non-urgent tasks",
            WorkloadRecommendation::High => "Monitor for delays",
            WorkloadRecommendation::ComplexHeavy => "Space out complex tasks",
            WorkloadRecommendation::Light => "Good opportunity for catch-up or maintenance",
            WorkloadRecommendation::Optimal => "Well balanced workload",
        }
    }
}

impl fmt::Display for WorkloadRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkloadRecommendation {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "overloaded" => Ok(WorkloadRecommendation::Overloaded),
            "high" => Ok(WorkloadRecommendation::High),
            "complex_heavy" => Ok(WorkloadRecommendation::ComplexHeavy),
            "light" => Ok(WorkloadRecommendation::Light),
            "optimal" => Ok(WorkloadRecommendation::Optimal),
            other => Err(format!("unsupported workload recommendation: {other}")),
        }
    }
}

/// Daily snapshot of scheduled workload. One immutable row per date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyWorkloadAssessment {
    pub date: NaiveDate,
    pub total_tasks: i64,
    pub total_hours: f64,
    pub complex_tasks: i64,
    /// Scheduled hours as a percentage of `max_daily_hours`.
    pub utilization: f64,
    pub recommendation: WorkloadRecommendation,
    pub created_at: String,
}
