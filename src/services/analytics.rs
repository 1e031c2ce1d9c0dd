use chrono::NaiveDate;
use tracing::debug;

use crate::db::repositories::analytics_repository::AnalyticsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analytics::ScheduleAnalyticsRow;

/// Read-only schedule analytics over an inclusive date range. Safe to run
/// concurrently with writers; each call reads one consistent connection.
pub struct AnalyticsService {
    db: DbPool,
}

impl AnalyticsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<ScheduleAnalyticsRow>> {
        if start_date > end_date {
            return Err(AppError::validation(
                "analytics range start must not be after its end",
            ));
        }

        let conn = self.db.get_connection()?;
        let rows = AnalyticsRepository::aggregate_range(&conn, start_date, end_date)?;
        debug!(
            target: "scheduler::analytics",
            %start_date,
            %end_date,
            days = rows.len(),
            "analytics range computed"
        );
        Ok(rows)
    }
}
