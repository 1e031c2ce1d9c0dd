use std::collections::HashMap;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::task_repository::TaskRepository;
use crate::error::AppResult;
use crate::models::config::SchedulerConfig;
use crate::models::task::ScheduledTask;
use crate::services::complexity::{self, ComplexityTier};
use crate::services::schedule_utils;

/// Two same-complexity tasks separated by at most this gap are pulled
/// together to cut context switching.
const MERGE_GAP_HOURS: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeOutcome {
    pub considered: usize,
    pub merged: usize,
}

#[derive(Debug, Clone)]
struct PlannedTask {
    id: String,
    complexity: u8,
    priority: i64,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    deadline: Option<DateTime<Tz>>,
}

/// Periodic re-optimization pass: groups future scheduled tasks into
/// complexity tiers and snaps small gaps between same-complexity neighbors
/// down to the buffer. Merges collapse scheduling adjacency only; task
/// records stay separate.
pub struct ScheduleOptimizer {
    config: SchedulerConfig,
}

impl ScheduleOptimizer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, conn: &Connection, now: DateTime<Tz>) -> AppResult<OptimizeOutcome> {
        let tz = self.config.timezone;

        // Busy map over every active task, kept current as merges commit,
        // so no merge can introduce a new overlap.
        let active = TaskRepository::list_active(conn)?;
        let mut busy: HashMap<String, (DateTime<Tz>, DateTime<Tz>)> = HashMap::new();
        for task in &active {
            busy.insert(
                task.id.clone(),
                (
                    schedule_utils::parse_datetime(tz, &task.start_at)?,
                    schedule_utils::parse_datetime(tz, &task.end_at)?,
                ),
            );
        }

        let mut future: Vec<PlannedTask> = Vec::new();
        for task in TaskRepository::list_scheduled(conn)? {
            let planned = self.plan(tz, &task)?;
            if planned.start > now {
                future.push(planned);
            }
        }
        let considered = future.len();

        let mut merged = 0usize;
        for tier in [
            ComplexityTier::Complex,
            ComplexityTier::Medium,
            ComplexityTier::Simple,
        ] {
            let mut group: Vec<PlannedTask> = future
                .iter()
                .filter(|task| complexity::tier(task.complexity) == tier)
                .cloned()
                .collect();
            order_group(&mut group);
            merged += self.merge_adjacent(conn, now, &mut group, &mut busy);
        }

        info!(target: "scheduler::optimizer", considered, merged, "optimization pass complete");
        Ok(OptimizeOutcome { considered, merged })
    }

    fn plan(&self, tz: Tz, task: &ScheduledTask) -> AppResult<PlannedTask> {
        let deadline = match &task.deadline {
            Some(raw) => Some(schedule_utils::parse_datetime(tz, raw)?),
            None => None,
        };
        Ok(PlannedTask {
            id: task.id.clone(),
            complexity: task.complexity,
            priority: task.priority,
            start: schedule_utils::parse_datetime(tz, &task.start_at)?,
            end: schedule_utils::parse_datetime(tz, &task.end_at)?,
            deadline,
        })
    }

    /// Scans adjacent pairs inside one ordered tier and snaps qualifying
    /// gaps to the buffer. Per-pair failures are logged and skipped;
    /// already-committed merges stay committed.
    fn merge_adjacent(
        &self,
        conn: &Connection,
        now: DateTime<Tz>,
        group: &mut [PlannedTask],
        busy: &mut HashMap<String, (DateTime<Tz>, DateTime<Tz>)>,
    ) -> usize {
        let buffer = self.config.buffer();
        let mut merged = 0usize;

        for i in 0..group.len().saturating_sub(1) {
            let (current, next) = (&group[i], &group[i + 1]);
            if !self.can_merge(current, next, buffer) {
                continue;
            }

            let new_start = current.end + buffer;
            let new_end = new_start + (next.end - next.start);
            if let Some(deadline) = next.deadline {
                if new_end > deadline {
                    debug!(target: "scheduler::optimizer", task_id = %next.id, "merge would pass deadline, skipped");
                    continue;
                }
            }
            if busy.iter().any(|(id, (start, end))| {
                *id != next.id && schedule_utils::overlaps(new_start, new_end, *start, *end)
            }) {
                debug!(target: "scheduler::optimizer", task_id = %next.id, "merge would overlap another task, skipped");
                continue;
            }

            let next_id = next.id.clone();
            let result = TaskRepository::retarget(
                conn,
                &next_id,
                &schedule_utils::format_datetime(new_start),
                &schedule_utils::format_datetime(new_end),
                &schedule_utils::format_datetime(now),
            );
            if let Err(error) = result {
                warn!(
                    target: "scheduler::optimizer",
                    task_id = %next_id,
                    %error,
                    "merge commit failed, continuing"
                );
                continue;
            }

            group[i + 1].start = new_start;
            group[i + 1].end = new_end;
            busy.insert(next_id, (new_start, new_end));
            merged += 1;
        }

        merged
    }

    fn can_merge(&self, current: &PlannedTask, next: &PlannedTask, buffer: Duration) -> bool {
        if current.complexity != next.complexity {
            return false;
        }
        let gap = next.start - current.end;
        if gap <= buffer {
            // Negative or already-snapped gaps have nothing to collapse.
            return false;
        }
        schedule_utils::duration_hours(current.end, next.start) <= MERGE_GAP_HOURS
    }
}

/// Tier ordering: priority ascending, then earliest deadline first among
/// equal priority (tasks without a deadline sort last), then start time.
fn order_group(group: &mut [PlannedTask]) {
    group.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| match (a.deadline, b.deadline) {
                (Some(a_dl), Some(b_dl)) => a_dl.cmp(&b_dl),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.start.cmp(&b.start))
    });
}
