use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveTime, Timelike, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::services::schedule_utils;
use crate::services::scheduler::Scheduler;

const OPTIMIZE_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// Handles for the background maintenance loops. Dropping the struct does
/// not stop the loops; call [`JobHandles::shutdown`].
pub struct JobHandles {
    optimizer: JoinHandle<()>,
    workload: JoinHandle<()>,
}

impl JobHandles {
    pub fn shutdown(self) {
        self.optimizer.abort();
        self.workload.abort();
    }
}

/// Spawns the hourly optimization pass and the daily workload assessment.
///
/// Each loop awaits its own blocking run before ticking again, so a slow
/// pass is never overlapped by the next one; missed ticks are skipped.
pub fn spawn_periodic_jobs(scheduler: Arc<Scheduler>) -> JobHandles {
    let optimizer = tokio::spawn(run_optimize_loop(Arc::clone(&scheduler)));
    let workload = tokio::spawn(run_workload_loop(scheduler));
    info!(target: "scheduler::jobs", "periodic jobs started");
    JobHandles {
        optimizer,
        workload,
    }
}

async fn run_optimize_loop(scheduler: Arc<Scheduler>) {
    let mut ticker = tokio::time::interval(OPTIMIZE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; swallow it so the loop starts one
    // interval after boot.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let handle = Arc::clone(&scheduler);
        let result = tokio::task::spawn_blocking(move || {
            handle.optimize_schedule().and_then(|considered| {
                handle.run_conflict_pass().map(|resolved| (considered, resolved))
            })
        })
        .await;
        match result {
            Ok(Ok((considered, resolved))) => {
                info!(
                    target: "scheduler::jobs",
                    considered,
                    resolved,
                    "hourly optimization pass finished"
                );
            }
            Ok(Err(error)) => {
                warn!(target: "scheduler::jobs", %error, "hourly optimization pass failed");
            }
            Err(error) => {
                warn!(target: "scheduler::jobs", %error, "optimization task panicked");
            }
        }
    }
}

async fn run_workload_loop(scheduler: Arc<Scheduler>) {
    loop {
        let wait = until_next_assessment(&scheduler);
        tokio::time::sleep(wait).await;
        let handle = Arc::clone(&scheduler);
        let result = tokio::task::spawn_blocking(move || handle.assess_daily_workload()).await;
        match result {
            Ok(Ok(assessment)) => {
                info!(
                    target: "scheduler::jobs",
                    date = %assessment.date,
                    recommendation = %assessment.recommendation,
                    "daily workload assessed"
                );
            }
            Ok(Err(error)) => {
                warn!(target: "scheduler::jobs", %error, "daily workload assessment failed");
            }
            Err(error) => {
                warn!(target: "scheduler::jobs", %error, "workload task panicked");
            }
        }
    }
}

/// Time until the next local occurrence of the configured assessment hour.
/// A target inside a DST gap falls back to one hour later.
fn until_next_assessment(scheduler: &Scheduler) -> StdDuration {
    let config = scheduler.config();
    let tz = config.timezone;
    let now = Utc::now().with_timezone(&tz);
    let target_time = NaiveTime::from_hms_opt(config.daily_assessment_hour, 0, 0)
        .unwrap_or(NaiveTime::MIN);

    let mut date = now.date_naive();
    if now.time().hour() >= config.daily_assessment_hour {
        date += Duration::days(1);
    }
    let target = schedule_utils::local_datetime(tz, date, target_time)
        .or_else(|| {
            schedule_utils::local_datetime(tz, date, target_time + Duration::hours(1))
        });

    match target {
        Some(target) if target > now => (target - now)
            .to_std()
            .unwrap_or(StdDuration::from_secs(60 * 60)),
        _ => StdDuration::from_secs(60 * 60),
    }
}
