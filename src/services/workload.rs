use chrono::DateTime;
use chrono_tz::Tz;
use tracing::info;

use crate::db::repositories::task_repository::TaskRepository;
use crate::db::repositories::workload_repository::WorkloadRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::config::SchedulerConfig;
use crate::models::workload::{DailyWorkloadAssessment, WorkloadRecommendation};
use crate::services::complexity::COMPLEX_THRESHOLD;
use crate::services::schedule_utils;

/// Computes the daily workload snapshot and its categorical
/// recommendation. Assessments are an append-only log keyed by date.
pub struct WorkloadAssessor {
    db: DbPool,
    config: SchedulerConfig,
}

impl WorkloadAssessor {
    pub fn new(db: DbPool, config: SchedulerConfig) -> Self {
        Self { db, config }
    }

    /// Assesses the local day containing `now`. The first assessment of a
    /// date wins; later calls return the stored row unchanged.
    pub fn assess(&self, now: DateTime<Tz>) -> AppResult<DailyWorkloadAssessment> {
        let date = now.date_naive();
        let conn = self.db.get_connection()?;

        if let Some(existing) = WorkloadRepository::find_by_date(&conn, date)? {
            return Ok(existing);
        }

        let date_key = schedule_utils::local_date_key(now);
        let tasks = TaskRepository::list_scheduled_for_day(&conn, &date_key)?;

        let total_tasks = tasks.len() as i64;
        let total_hours: f64 = tasks.iter().map(|task| task.estimated_hours).sum();
        let complex_tasks = tasks
            .iter()
            .filter(|task| task.complexity >= COMPLEX_THRESHOLD)
            .count() as i64;

        let max_daily = self.config.max_daily_hours;
        let assessment = DailyWorkloadAssessment {
            date,
            total_tasks,
            total_hours,
            complex_tasks,
            utilization: (total_hours / max_daily) * 100.0,
            recommendation: recommend(total_hours, complex_tasks, max_daily),
            created_at: schedule_utils::format_datetime(now),
        };

        WorkloadRepository::insert_if_absent(&conn, &assessment)?;
        info!(
            target: "scheduler::workload",
            date = %date_key,
            total_tasks,
            total_hours,
            complex_tasks,
            recommendation = %assessment.recommendation,
            "daily workload assessed"
        );

        Ok(assessment)
    }
}

/// Fixed-threshold classification, evaluated in priority order relative to
/// the configured maximum productive hours.
pub fn recommend(total_hours: f64, complex_tasks: i64, max_daily_hours: f64) -> WorkloadRecommendation {
    if total_hours > max_daily_hours * 1.2 {
        WorkloadRecommendation::Overloaded
    } else if total_hours > max_daily_hours {
        WorkloadRecommendation::High
    } else if complex_tasks > 2 {
        WorkloadRecommendation::ComplexHeavy
    } else if total_hours < max_daily_hours * 0.6 {
        WorkloadRecommendation::Light
    } else {
        WorkloadRecommendation::Optimal
    }
}
