use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("record not found")]
    NotFound,

    #[error("record conflict: {message}")]
    Conflict { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("no slot available within the {horizon_days}-day search horizon")]
    NoSlotAvailable { horizon_days: i64 },

    #[error("overlap between tasks {task_id} and {other_task_id} could not be resolved")]
    UnresolvedConflict {
        task_id: String,
        other_task_id: String,
    },

    #[error("invalid scheduler configuration: {message}")]
    Configuration { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "scheduler::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "scheduler::validation", %message, details = %details, "validation error");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "scheduler::db", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found() -> Self {
        warn!(target: "scheduler::db", "record not found");
        AppError::NotFound
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "scheduler::db", %message, "database error");
        AppError::Database { message }
    }

    pub fn no_slot_available(horizon_days: i64) -> Self {
        warn!(target: "scheduler::slots", horizon_days, "search horizon exhausted");
        AppError::NoSlotAvailable { horizon_days }
    }

    pub fn unresolved_conflict(task_id: impl Into<String>, other_task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        let other_task_id = other_task_id.into();
        warn!(
            target: "scheduler::conflict",
            %task_id,
            %other_task_id,
            "conflict left unresolved"
        );
        AppError::UnresolvedConflict {
            task_id,
            other_task_id,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "scheduler::config", %message, "configuration error");
        AppError::Configuration { message }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                AppError::conflict("uniqueness or integrity constraint violated")
            }
            _ => {
                error!(target: "scheduler::db", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}
