use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of framing work bound to a calendar interval.
///
/// Timestamps are RFC 3339 strings in the configured workshop timezone.
/// Tasks are never hard-deleted; they only transition to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: String,
    pub order_id: String,
    pub start_at: String,
    pub end_at: String,
    pub complexity: u8,
    pub estimated_hours: f64,
    pub actual_hours: Option<f64>,
    pub status: TaskStatus,
    /// Lower value means higher precedence.
    pub priority: i64,
    pub deadline: Option<String>,
    /// Order ids that must complete before this task may start.
    pub dependencies: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Delayed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
        }
    }

    /// Scheduled and in-progress tasks occupy the calendar.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Scheduled | TaskStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Delayed)
    }

    /// Status transitions are monotonic:
    /// `scheduled -> in_progress -> {completed | delayed}`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Scheduled, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Delayed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(TaskStatus::Scheduled),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "delayed" => Ok(TaskStatus::Delayed),
            other => Err(format!("unsupported task status: {other}")),
        }
    }
}
