use chrono::NaiveDate;
use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::analytics::ScheduleAnalyticsRow;

pub struct AnalyticsRepository;

impl AnalyticsRepository {
    /// Per-day aggregates over the inclusive local date range. Timestamps
    /// are local RFC 3339 strings, so the first 10 characters are the
    /// local calendar date.
    pub fn aggregate_range(
        conn: &Connection,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<ScheduleAnalyticsRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    substr(start_at, 1, 10) AS day,
                    COUNT(*) AS scheduled_tasks,
                    COALESCE(SUM(estimated_hours), 0.0) AS estimated_hours,
                    COALESCE(SUM(actual_hours), 0.0) AS actual_hours,
                    COALESCE(AVG(complexity), 0.0) AS avg_complexity,
                    COUNT(CASE WHEN status = 'completed' THEN 1 END) AS completed_tasks,
                    COUNT(CASE WHEN status = 'delayed' THEN 1 END) AS delayed_tasks
                FROM scheduled_tasks
                WHERE substr(start_at, 1, 10) BETWEEN :start AND :end
                GROUP BY day
                ORDER BY day DESC
            "#,
        )?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":start": start_date.format("%Y-%m-%d").to_string(),
                    ":end": end_date.format("%Y-%m-%d").to_string(),
                },
                row_to_analytics,
            )?
            .map(|row| row.map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }
}

fn row_to_analytics(row: &Row<'_>) -> Result<ScheduleAnalyticsRow, rusqlite::Error> {
    let day: String = row.get("day")?;
    let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "day".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(ScheduleAnalyticsRow {
        date,
        scheduled_tasks: row.get("scheduled_tasks")?,
        estimated_hours: row.get("estimated_hours")?,
        actual_hours: row.get("actual_hours")?,
        avg_complexity: row.get("avg_complexity")?,
        completed_tasks: row.get("completed_tasks")?,
        delayed_tasks: row.get("delayed_tasks")?,
    })
}
