use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repositories::order_repository::OrderRepository;
use crate::db::repositories::task_repository::TaskRepository;
use crate::db::repositories::workload_repository::WorkloadRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analytics::ScheduleAnalyticsRow;
use crate::models::config::SchedulerConfig;
use crate::models::order::OrderScheduleInput;
use crate::models::task::{ScheduledTask, TaskStatus};
use crate::models::workload::DailyWorkloadAssessment;
use crate::services::analytics::AnalyticsService;
use crate::services::complexity;
use crate::services::conflict::ConflictResolver;
use crate::services::events::{EventSink, SchedulerEvent};
use crate::services::optimizer::ScheduleOptimizer;
use crate::services::schedule_utils;
use crate::services::slot_finder::{SlotFinder, SlotRequest};
use crate::services::workload::WorkloadAssessor;

/// Single scheduling authority over the workshop calendar.
///
/// Every read-then-write section (slot search + insert, conflict pass,
/// optimizer merges) runs under `calendar_lock`, so two concurrent
/// `schedule_order` calls can never both plan against a stale snapshot.
/// Read-only analytics and workload lookups bypass the lock.
pub struct Scheduler {
    db: DbPool,
    config: SchedulerConfig,
    finder: SlotFinder,
    resolver: ConflictResolver,
    optimizer: ScheduleOptimizer,
    workload: WorkloadAssessor,
    analytics: AnalyticsService,
    events: EventSink,
    calendar_lock: Mutex<()>,
}

impl Scheduler {
    /// Fails with a `Configuration` error when the calendar configuration
    /// is invalid; the scheduler must not start on a broken calendar.
    pub fn new(db: DbPool, config: SchedulerConfig, events: EventSink) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            finder: SlotFinder::new(config.clone()),
            resolver: ConflictResolver::new(config.clone()),
            optimizer: ScheduleOptimizer::new(config.clone()),
            workload: WorkloadAssessor::new(db.clone(), config.clone()),
            analytics: AnalyticsService::new(db.clone()),
            db,
            config,
            events,
            calendar_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Scores the order, finds the earliest feasible slot, persists the
    /// task, mirrors the schedule onto the order, and runs the conflict
    /// consistency pass.
    pub fn schedule_order(&self, input: &OrderScheduleInput) -> AppResult<ScheduledTask> {
        if input.estimated_hours <= 0.0 {
            return Err(AppError::validation("estimated hours must be positive"));
        }
        if input.priority < 1 {
            return Err(AppError::validation("priority must be at least 1"));
        }

        let tz = self.config.timezone;
        let now = self.now_local();
        let deadline = schedule_utils::parse_datetime(tz, &input.deadline)?;
        let score = complexity::score(input.estimated_hours, &input.modifiers, input.priority);

        let _guard = self.lock_calendar()?;
        let conn = self.db.get_connection()?;

        let active = TaskRepository::list_active(&conn)?;
        let mut busy = Vec::with_capacity(active.len());
        for task in &active {
            busy.push((
                schedule_utils::parse_datetime(tz, &task.start_at)?,
                schedule_utils::parse_datetime(tz, &task.end_at)?,
            ));
        }

        let earliest_start = self.dependency_bound(&conn, &input.dependencies)?;
        let request = SlotRequest {
            duration_hours: input.estimated_hours,
            complexity: score,
            deadline,
            earliest_start,
            preferred_start_hours: input.preferences.preferred_start_hours.clone(),
        };
        let slot = self.finder.find_slot(&request, &busy, now)?;

        let now_str = schedule_utils::format_datetime(now);
        let task = ScheduledTask {
            id: Uuid::new_v4().to_string(),
            order_id: input.order_id.clone(),
            start_at: schedule_utils::format_datetime(slot.start),
            end_at: schedule_utils::format_datetime(slot.end),
            complexity: score,
            estimated_hours: input.estimated_hours,
            actual_hours: None,
            status: TaskStatus::Scheduled,
            priority: input.priority,
            deadline: Some(input.deadline.clone()),
            dependencies: input.dependencies.clone(),
            created_at: now_str.clone(),
            updated_at: now_str.clone(),
        };

        TaskRepository::insert(&conn, &task)?;
        OrderRepository::upsert_schedule(
            &conn,
            &task.order_id,
            &task.start_at,
            &task.end_at,
            TaskStatus::Scheduled.as_str(),
            &now_str,
        )?;

        // Consistency repair is best effort; its failure must not undo a
        // successfully persisted task.
        if let Err(error) = self.resolver.run_pass(&conn, &self.events, now) {
            warn!(target: "scheduler::conflict", %error, "conflict pass failed after scheduling");
        }

        info!(
            target: "scheduler::core",
            order_id = %task.order_id,
            task_id = %task.id,
            start_at = %task.start_at,
            end_at = %task.end_at,
            complexity = task.complexity,
            "order scheduled"
        );
        self.events.emit(SchedulerEvent::OrderScheduled {
            order_id: task.order_id.clone(),
            task_id: task.id.clone(),
            start_at: task.start_at.clone(),
            end_at: task.end_at.clone(),
        });

        Ok(task)
    }

    /// Records actual effort and advances the task status; the new status
    /// is propagated to the linked order.
    pub fn update_task_progress(
        &self,
        order_id: &str,
        actual_hours: f64,
        status: TaskStatus,
    ) -> AppResult<()> {
        if actual_hours < 0.0 {
            return Err(AppError::validation("actual hours must not be negative"));
        }

        let conn = self.db.get_connection()?;
        let task = TaskRepository::find_by_order_id(&conn, order_id)?
            .ok_or_else(AppError::not_found)?;

        if !task.status.can_transition_to(status) {
            return Err(AppError::validation(format!(
                "illegal status transition {} -> {}",
                task.status, status
            )));
        }

        let now_str = schedule_utils::format_datetime(self.now_local());
        TaskRepository::update_progress(&conn, order_id, actual_hours, status, &now_str)?;
        OrderRepository::update_status(&conn, order_id, status.as_str(), &now_str)?;

        info!(
            target: "scheduler::core",
            %order_id,
            actual_hours,
            status = %status,
            "task progress updated"
        );
        self.events.emit(SchedulerEvent::TaskProgressUpdated {
            order_id: order_id.to_string(),
            actual_hours,
            status: status.as_str().to_string(),
        });

        Ok(())
    }

    pub fn task_for_order(&self, order_id: &str) -> AppResult<ScheduledTask> {
        let conn = self.db.get_connection()?;
        TaskRepository::find_by_order_id(&conn, order_id)?.ok_or_else(AppError::not_found)
    }

    /// Detects and arbitrates overlaps among active tasks. Idempotent.
    pub fn run_conflict_pass(&self) -> AppResult<usize> {
        let now = self.now_local();
        let _guard = self.lock_calendar()?;
        let conn = self.db.get_connection()?;
        self.resolver.run_pass(&conn, &self.events, now)
    }

    /// Periodic re-optimization over all future scheduled tasks. Returns
    /// the number of tasks considered.
    pub fn optimize_schedule(&self) -> AppResult<usize> {
        let now = self.now_local();
        let _guard = self.lock_calendar()?;
        let conn = self.db.get_connection()?;
        let outcome = self.optimizer.run(&conn, now)?;

        self.events.emit(SchedulerEvent::ScheduleOptimized {
            considered: outcome.considered,
            merged: outcome.merged,
        });
        Ok(outcome.considered)
    }

    /// Read-only per-day aggregation over the inclusive date range.
    pub fn get_schedule_analytics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<ScheduleAnalyticsRow>> {
        self.analytics.range(start_date, end_date)
    }

    /// Computes (or returns) the workload assessment for the current
    /// local day.
    pub fn assess_daily_workload(&self) -> AppResult<DailyWorkloadAssessment> {
        let assessment = self.workload.assess(self.now_local())?;
        self.events.emit(SchedulerEvent::DailyWorkloadAssessed {
            date: assessment.date.format("%Y-%m-%d").to_string(),
            recommendation: assessment.recommendation.as_str().to_string(),
            advice: assessment.recommendation.advice().to_string(),
        });
        Ok(assessment)
    }

    /// Most recent workload assessments, newest first.
    pub fn recent_workload_assessments(
        &self,
        limit: usize,
    ) -> AppResult<Vec<DailyWorkloadAssessment>> {
        let conn = self.db.get_connection()?;
        WorkloadRepository::list_recent(&conn, limit)
    }

    fn now_local(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.config.timezone)
    }

    fn lock_calendar(&self) -> AppResult<std::sync::MutexGuard<'_, ()>> {
        self.calendar_lock
            .lock()
            .map_err(|_| AppError::database("calendar lock poisoned"))
    }

    /// A task may not start before every dependency's end time. Unknown
    /// dependency orders are a validation error; terminal dependencies
    /// impose no bound.
    fn dependency_bound(
        &self,
        conn: &rusqlite::Connection,
        dependencies: &[String],
    ) -> AppResult<Option<DateTime<Tz>>> {
        let tz = self.config.timezone;
        let mut bound: Option<DateTime<Tz>> = None;
        for order_id in dependencies {
            let task = TaskRepository::find_by_order_id(conn, order_id)?.ok_or_else(|| {
                AppError::validation(format!("unknown dependency order: {order_id}"))
            })?;
            if task.status.is_terminal() {
                continue;
            }
            let end = schedule_utils::parse_datetime(tz, &task.end_at)?;
            bound = Some(match bound {
                Some(current) if current >= end => current,
                _ => end,
            });
        }
        Ok(bound)
    }
}
