use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::{ScheduledTask, TaskStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        order_id,
        start_at,
        end_at,
        complexity,
        estimated_hours,
        actual_hours,
        status,
        priority,
        deadline,
        dependencies,
        created_at,
        updated_at
    FROM scheduled_tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub order_id: String,
    pub start_at: String,
    pub end_at: String,
    pub complexity: i64,
    pub estimated_hours: f64,
    pub actual_hours: Option<f64>,
    pub status: String,
    pub priority: i64,
    pub deadline: Option<String>,
    pub dependencies: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &ScheduledTask) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            order_id: record.order_id.clone(),
            start_at: record.start_at.clone(),
            end_at: record.end_at.clone(),
            complexity: record.complexity as i64,
            estimated_hours: record.estimated_hours,
            actual_hours: record.actual_hours,
            status: record.status.as_str().to_string(),
            priority: record.priority,
            deadline: record.deadline.clone(),
            dependencies: serde_json::to_string(&record.dependencies)?,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<ScheduledTask> {
        Ok(ScheduledTask {
            id: self.id,
            order_id: self.order_id,
            start_at: self.start_at,
            end_at: self.end_at,
            complexity: self.complexity.clamp(0, 10) as u8,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            status: TaskStatus::try_from(self.status.as_str()).map_err(AppError::validation)?,
            priority: self.priority,
            deadline: self.deadline,
            dependencies: serde_json::from_str(&self.dependencies)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            order_id: row.get("order_id")?,
            start_at: row.get("start_at")?,
            end_at: row.get("end_at")?,
            complexity: row.get("complexity")?,
            estimated_hours: row.get("estimated_hours")?,
            actual_hours: row.get("actual_hours")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            deadline: row.get("deadline")?,
            dependencies: row.get("dependencies")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, record: &ScheduledTask) -> AppResult<()> {
        let row = TaskRow::from_record(record)?;

        conn.execute(
            r#"
                INSERT INTO scheduled_tasks (
                    id,
                    order_id,
                    start_at,
                    end_at,
                    complexity,
                    estimated_hours,
                    actual_hours,
                    status,
                    priority,
                    deadline,
                    dependencies,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :order_id,
                    :start_at,
                    :end_at,
                    :complexity,
                    :estimated_hours,
                    :actual_hours,
                    :status,
                    :priority,
                    :deadline,
                    :dependencies,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":order_id": &row.order_id,
                ":start_at": &row.start_at,
                ":end_at": &row.end_at,
                ":complexity": &row.complexity,
                ":estimated_hours": &row.estimated_hours,
                ":actual_hours": &row.actual_hours,
                ":status": &row.status,
                ":priority": &row.priority,
                ":deadline": &row.deadline,
                ":dependencies": &row.dependencies,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_order_id(conn: &Connection, order_id: &str) -> AppResult<Option<ScheduledTask>> {
        let sql = format!("{BASE_SELECT} WHERE order_id = :order_id");
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(named_params! {":order_id": order_id}, |row| {
                TaskRow::try_from(row)
            })
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    /// Tasks that occupy the calendar: status scheduled or in_progress,
    /// ordered by start time.
    pub fn list_active(conn: &Connection) -> AppResult<Vec<ScheduledTask>> {
        let sql = format!(
            "{BASE_SELECT} WHERE status IN ('scheduled', 'in_progress') ORDER BY start_at ASC"
        );
        Self::query_many(conn, &sql)
    }

    pub fn list_scheduled(conn: &Connection) -> AppResult<Vec<ScheduledTask>> {
        let sql = format!("{BASE_SELECT} WHERE status = 'scheduled' ORDER BY start_at ASC");
        Self::query_many(conn, &sql)
    }

    /// Scheduled tasks whose local calendar date matches `date_key`
    /// (RFC 3339 timestamps carry the local date in their first 10 chars).
    pub fn list_scheduled_for_day(
        conn: &Connection,
        date_key: &str,
    ) -> AppResult<Vec<ScheduledTask>> {
        let sql = format!(
            "{BASE_SELECT} WHERE status = 'scheduled' AND substr(start_at, 1, 10) = :day ORDER BY start_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":day": date_key}, |row| {
                TaskRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Moves a task to a new interval without touching anything else.
    pub fn retarget(
        conn: &Connection,
        task_id: &str,
        start_at: &str,
        end_at: &str,
        updated_at: &str,
    ) -> AppResult<()> {
        let changed = conn.execute(
            r#"
                UPDATE scheduled_tasks
                SET start_at = :start_at, end_at = :end_at, updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": task_id,
                ":start_at": start_at,
                ":end_at": end_at,
                ":updated_at": updated_at,
            },
        )?;

        if changed == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn update_progress(
        conn: &Connection,
        order_id: &str,
        actual_hours: f64,
        status: TaskStatus,
        updated_at: &str,
    ) -> AppResult<()> {
        let changed = conn.execute(
            r#"
                UPDATE scheduled_tasks
                SET actual_hours = :actual_hours, status = :status, updated_at = :updated_at
                WHERE order_id = :order_id
            "#,
            named_params! {
                ":order_id": order_id,
                ":actual_hours": actual_hours,
                ":status": status.as_str(),
                ":updated_at": updated_at,
            },
        )?;

        if changed == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    fn query_many(conn: &Connection, sql: &str) -> AppResult<Vec<ScheduledTask>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| TaskRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(rows)
    }
}
