use chrono::DateTime;
use chrono_tz::Tz;

/// Candidate calendar interval produced by the slot finder. Ephemeral:
/// discarded once a task is created or the request is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSlot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Slack between the slot start and the end of the free interval it
    /// was carved from.
    pub available_hours: f64,
}

/// A pair of active tasks whose intervals overlap. Ephemeral: produced by
/// detection and consumed immediately by resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    pub first_task_id: String,
    pub second_task_id: String,
}
