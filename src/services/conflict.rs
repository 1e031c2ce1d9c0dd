use std::collections::HashSet;

use chrono::DateTime;
use chrono_tz::Tz;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::repositories::task_repository::TaskRepository;
use crate::error::{AppError, AppResult};
use crate::models::config::SchedulerConfig;
use crate::models::slot::ConflictRecord;
use crate::models::task::ScheduledTask;
use crate::services::events::{EventSink, SchedulerEvent};
use crate::services::schedule_utils;
use crate::services::slot_finder::{SlotFinder, SlotRequest};

/// Resolution passes per invocation are bounded so a pathological task set
/// cannot loop forever.
const MAX_RESOLUTION_PASSES: usize = 50;

pub struct ConflictDetector;

impl ConflictDetector {
    /// Finds every unordered pair of active tasks whose intervals overlap.
    /// Symmetric by construction and never pairs a task with itself.
    pub fn detect(tz: Tz, tasks: &[ScheduledTask]) -> AppResult<Vec<ConflictRecord>> {
        let mut intervals = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !task.status.is_active() {
                continue;
            }
            let start = schedule_utils::parse_datetime(tz, &task.start_at)?;
            let end = schedule_utils::parse_datetime(tz, &task.end_at)?;
            intervals.push((task.id.as_str(), start, end));
        }

        let mut conflicts = Vec::new();
        for i in 0..intervals.len() {
            for j in (i + 1)..intervals.len() {
                let (a_id, a_start, a_end) = intervals[i];
                let (b_id, b_start, b_end) = intervals[j];
                if schedule_utils::overlaps(a_start, a_end, b_start, b_end) {
                    conflicts.push(ConflictRecord {
                        first_task_id: a_id.to_string(),
                        second_task_id: b_id.to_string(),
                    });
                }
            }
        }

        Ok(conflicts)
    }
}

/// Arbitrates detected overlaps: the numerically larger priority value
/// loses and is re-slotted inside a short default deadline window. This is
/// a best-effort consistency repair, not a full re-plan; dependencies and
/// customer preferences are not re-applied.
pub struct ConflictResolver {
    finder: SlotFinder,
    config: SchedulerConfig,
}

impl ConflictResolver {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            finder: SlotFinder::new(config.clone()),
            config,
        }
    }

    /// Runs detection and resolution to a fixed point. Idempotent: a
    /// conflict-free task set is a no-op. Returns the number of tasks
    /// rescheduled.
    pub fn run_pass(
        &self,
        conn: &Connection,
        events: &EventSink,
        now: DateTime<Tz>,
    ) -> AppResult<usize> {
        let tz = self.config.timezone;
        let mut resolved = 0usize;
        let mut unresolvable: HashSet<(String, String)> = HashSet::new();

        for _ in 0..MAX_RESOLUTION_PASSES {
            let tasks = TaskRepository::list_active(conn)?;
            let conflict = ConflictDetector::detect(tz, &tasks)?
                .into_iter()
                .find(|record| !unresolvable.contains(&pair_key(record)));
            let Some(record) = conflict else {
                break;
            };

            match self.resolve_one(conn, events, &tasks, &record, now) {
                Ok(()) => resolved += 1,
                Err(AppError::UnresolvedConflict {
                    task_id,
                    other_task_id,
                }) => {
                    events.emit(SchedulerEvent::ConflictUnresolved {
                        first_task_id: task_id,
                        second_task_id: other_task_id,
                    });
                    unresolvable.insert(pair_key(&record));
                }
                Err(error) => {
                    // A single bad pair must not block the rest of the batch.
                    warn!(
                        target: "scheduler::conflict",
                        first = %record.first_task_id,
                        second = %record.second_task_id,
                        %error,
                        "conflict resolution failed, skipping pair"
                    );
                    unresolvable.insert(pair_key(&record));
                }
            }
        }

        Ok(resolved)
    }

    /// Reschedules the losing task of one conflicting pair. Fails with
    /// `UnresolvedConflict` when no replacement slot exists inside the
    /// reschedule window.
    fn resolve_one(
        &self,
        conn: &Connection,
        events: &EventSink,
        tasks: &[ScheduledTask],
        record: &ConflictRecord,
        now: DateTime<Tz>,
    ) -> AppResult<()> {
        let tz = self.config.timezone;
        let first = find_task(tasks, &record.first_task_id)?;
        let second = find_task(tasks, &record.second_task_id)?;
        let loser = pick_loser(tz, first, second)?;
        let winner_id = if loser.id == first.id {
            &second.id
        } else {
            &first.id
        };

        let mut busy = Vec::new();
        for task in tasks {
            if task.id == loser.id {
                continue;
            }
            busy.push((
                schedule_utils::parse_datetime(tz, &task.start_at)?,
                schedule_utils::parse_datetime(tz, &task.end_at)?,
            ));
        }

        let request = SlotRequest {
            duration_hours: loser.estimated_hours,
            complexity: loser.complexity,
            deadline: now + chrono::Duration::days(self.config.reschedule_window_days),
            earliest_start: None,
            preferred_start_hours: None,
        };

        let slot = match self.finder.find_slot(&request, &busy, now) {
            Ok(slot) => slot,
            Err(AppError::NoSlotAvailable { .. }) => {
                return Err(AppError::unresolved_conflict(
                    loser.id.clone(),
                    winner_id.clone(),
                ));
            }
            Err(error) => return Err(error),
        };

        let start_at = schedule_utils::format_datetime(slot.start);
        let end_at = schedule_utils::format_datetime(slot.end);
        TaskRepository::retarget(
            conn,
            &loser.id,
            &start_at,
            &end_at,
            &schedule_utils::format_datetime(now),
        )?;

        info!(
            target: "scheduler::conflict",
            task_id = %loser.id,
            order_id = %loser.order_id,
            %start_at,
            %end_at,
            "conflicting task rescheduled"
        );
        events.emit(SchedulerEvent::ConflictResolved {
            task_id: loser.id.clone(),
            order_id: loser.order_id.clone(),
            start_at,
            end_at,
        });

        Ok(())
    }
}

fn pair_key(record: &ConflictRecord) -> (String, String) {
    if record.first_task_id <= record.second_task_id {
        (record.first_task_id.clone(), record.second_task_id.clone())
    } else {
        (record.second_task_id.clone(), record.first_task_id.clone())
    }
}

fn find_task<'a>(tasks: &'a [ScheduledTask], id: &str) -> AppResult<&'a ScheduledTask> {
    tasks
        .iter()
        .find(|task| task.id == id)
        .ok_or_else(AppError::not_found)
}

/// The numerically larger priority value loses. Ties break on the later
/// start time, then the larger id, so resolution is deterministic.
fn pick_loser<'a>(
    tz: Tz,
    first: &'a ScheduledTask,
    second: &'a ScheduledTask,
) -> AppResult<&'a ScheduledTask> {
    if first.priority != second.priority {
        return Ok(if first.priority > second.priority {
            first
        } else {
            second
        });
    }

    let first_start = schedule_utils::parse_datetime(tz, &first.start_at)?;
    let second_start = schedule_utils::parse_datetime(tz, &second.start_at)?;
    if first_start != second_start {
        return Ok(if first_start > second_start {
            first
        } else {
            second
        });
    }

    Ok(if first.id > second.id { first } else { second })
}
