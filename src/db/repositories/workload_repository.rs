use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::workload::{DailyWorkloadAssessment, WorkloadRecommendation};

#[derive(Debug, Clone)]
pub struct WorkloadAssessmentRow {
    pub date: String,
    pub total_tasks: i64,
    pub total_hours: f64,
    pub complex_tasks: i64,
    pub utilization: f64,
    pub recommendation: String,
    pub created_at: String,
}

impl WorkloadAssessmentRow {
    pub fn from_record(record: &DailyWorkloadAssessment) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d").to_string(),
            total_tasks: record.total_tasks,
            total_hours: record.total_hours,
            complex_tasks: record.complex_tasks,
            utilization: record.utilization,
            recommendation: record.recommendation.as_str().to_string(),
            created_at: record.created_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<DailyWorkloadAssessment> {
        Ok(DailyWorkloadAssessment {
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .map_err(|err| AppError::validation(format!("invalid assessment date: {err}")))?,
            total_tasks: self.total_tasks,
            total_hours: self.total_hours,
            complex_tasks: self.complex_tasks,
            utilization: self.utilization,
            recommendation: WorkloadRecommendation::try_from(self.recommendation.as_str())
                .map_err(AppError::validation)?,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for WorkloadAssessmentRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            date: row.get("date")?,
            total_tasks: row.get("total_tasks")?,
            total_hours: row.get("total_hours")?,
            complex_tasks: row.get("complex_tasks")?,
            utilization: row.get("utilization")?,
            recommendation: row.get("recommendation")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct WorkloadRepository;

impl WorkloadRepository {
    /// Appends the assessment for its date. The log is append-only: an
    /// existing row for the same date is left untouched and `false` is
    /// returned.
    pub fn insert_if_absent(
        conn: &Connection,
        record: &DailyWorkloadAssessment,
    ) -> AppResult<bool> {
        let row = WorkloadAssessmentRow::from_record(record);

        let inserted = conn.execute(
            r#"
                INSERT INTO daily_workload_assessments (
                    date,
                    total_tasks,
                    total_hours,
                    complex_tasks,
                    utilization,
                    recommendation,
                    created_at
                ) VALUES (
                    :date,
                    :total_tasks,
                    :total_hours,
                    :complex_tasks,
                    :utilization,
                    :recommendation,
                    :created_at
                )
                ON CONFLICT(date) DO NOTHING
            "#,
            named_params! {
                ":date": &row.date,
                ":total_tasks": &row.total_tasks,
                ":total_hours": &row.total_hours,
                ":complex_tasks": &row.complex_tasks,
                ":utilization": &row.utilization,
                ":recommendation": &row.recommendation,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(inserted > 0)
    }

    pub fn find_by_date(
        conn: &Connection,
        date: NaiveDate,
    ) -> AppResult<Option<DailyWorkloadAssessment>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    date,
                    total_tasks,
                    total_hours,
                    complex_tasks,
                    utilization,
                    recommendation,
                    created_at
                FROM daily_workload_assessments
                WHERE date = :date
            "#,
        )?;

        let row = stmt
            .query_row(
                named_params! {":date": date.format("%Y-%m-%d").to_string()},
                |row| WorkloadAssessmentRow::try_from(row),
            )
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn list_recent(
        conn: &Connection,
        limit: usize,
    ) -> AppResult<Vec<DailyWorkloadAssessment>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    date,
                    total_tasks,
                    total_hours,
                    complex_tasks,
                    utilization,
                    recommendation,
                    created_at
                FROM daily_workload_assessments
                ORDER BY date DESC
                LIMIT :limit
            "#,
        )?;

        let rows = stmt
            .query_map(named_params! {":limit": limit as i64}, |row| {
                WorkloadAssessmentRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }
}
