use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;

use frameshop_scheduler::db::repositories::task_repository::TaskRepository;
use frameshop_scheduler::db::DbPool;
use frameshop_scheduler::models::config::SchedulerConfig;
use frameshop_scheduler::models::task::{ScheduledTask, TaskStatus};
use frameshop_scheduler::models::workload::WorkloadRecommendation;
use frameshop_scheduler::services::events::{EventSink, SchedulerEvent};
use frameshop_scheduler::services::scheduler::Scheduler;

fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        timezone: chrono_tz::UTC,
        workday_start: NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"),
        workday_end: NaiveTime::from_hms_opt(23, 59, 59).expect("end of day"),
        working_days: vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ],
        max_daily_hours: 8.0,
        buffer_minutes: 0,
        complex_start_cutoff_hour: 23,
        ..SchedulerConfig::default()
    }
}

fn setup() -> (TempDir, DbPool, Scheduler, UnboundedReceiver<SchedulerEvent>) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("scheduler.sqlite")).expect("db pool");
    let (events, rx) = EventSink::channel();
    let scheduler = Scheduler::new(pool.clone(), test_config(), events).expect("scheduler");
    (dir, pool, scheduler, rx)
}

// A scheduled task starting today; only the start date and the estimated
// hours matter to the assessment.
fn todays_task(id: &str, hours: f64, complexity: u8) -> ScheduledTask {
    let start: DateTime<Utc> = Utc::now();
    let now = start.to_rfc3339();
    ScheduledTask {
        id: id.to_string(),
        order_id: format!("order-{id}"),
        start_at: start.to_rfc3339(),
        end_at: (start + Duration::minutes((hours * 60.0) as i64)).to_rfc3339(),
        complexity,
        estimated_hours: hours,
        actual_hours: None,
        status: TaskStatus::Scheduled,
        priority: 1,
        deadline: None,
        dependencies: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    }
}

fn insert(pool: &DbPool, record: &ScheduledTask) {
    pool.with_connection(|conn| TaskRepository::insert(conn, record))
        .expect("insert task");
}

#[test]
fn empty_day_is_assessed_as_light() {
    let (_dir, _pool, scheduler, _rx) = setup();

    let assessment = scheduler.assess_daily_workload().expect("assess");

    assert_eq!(assessment.total_tasks, 0);
    assert_eq!(assessment.total_hours, 0.0);
    assert_eq!(assessment.recommendation, WorkloadRecommendation::Light);
}

#[test]
fn day_above_120_percent_is_overloaded() {
    let (_dir, pool, scheduler, _rx) = setup();

    insert(&pool, &todays_task("t-1", 5.0, 3));
    insert(&pool, &todays_task("t-2", 5.0, 3));

    let assessment = scheduler.assess_daily_workload().expect("assess");

    assert_eq!(assessment.total_tasks, 2);
    assert_eq!(assessment.total_hours, 10.0);
    assert!((assessment.utilization - 125.0).abs() < 1e-9);
    assert_eq!(assessment.recommendation, WorkloadRecommendation::Overloaded);
}

#[test]
fn three_complex_tasks_dominate_a_light_day() {
    let (_dir, pool, scheduler, _rx) = setup();

    insert(&pool, &todays_task("t-1", 1.0, 8));
    insert(&pool, &todays_task("t-2", 1.0, 7));
    insert(&pool, &todays_task("t-3", 1.0, 9));

    let assessment = scheduler.assess_daily_workload().expect("assess");

    assert_eq!(assessment.complex_tasks, 3);
    assert_eq!(
        assessment.recommendation,
        WorkloadRecommendation::ComplexHeavy
    );
}

#[test]
fn balanced_day_is_optimal() {
    let (_dir, pool, scheduler, _rx) = setup();

    insert(&pool, &todays_task("t-1", 4.0, 3));
    insert(&pool, &todays_task("t-2", 3.0, 3));

    let assessment = scheduler.assess_daily_workload().expect("assess");

    assert!((assessment.utilization - 87.5).abs() < 1e-9);
    assert_eq!(assessment.recommendation, WorkloadRecommendation::Optimal);
}

#[test]
fn first_assessment_of_a_date_wins() {
    let (_dir, pool, scheduler, _rx) = setup();

    let first = scheduler.assess_daily_workload().expect("first");
    assert_eq!(first.recommendation, WorkloadRecommendation::Light);

    // Workload changes after the snapshot; the stored row must not.
    insert(&pool, &todays_task("t-1", 5.0, 3));
    insert(&pool, &todays_task("t-2", 5.0, 3));

    let second = scheduler.assess_daily_workload().expect("second");
    assert_eq!(second.date, first.date);
    assert_eq!(second.total_tasks, 0);
    assert_eq!(second.recommendation, WorkloadRecommendation::Light);
    assert_eq!(second.created_at, first.created_at);
}

#[test]
fn assessment_emits_an_event() {
    let (_dir, _pool, scheduler, mut rx) = setup();

    let assessment = scheduler.assess_daily_workload().expect("assess");

    let event = rx.try_recv().expect("event emitted");
    match event {
        SchedulerEvent::DailyWorkloadAssessed {
            date,
            recommendation,
            advice,
        } => {
            assert_eq!(date, assessment.date.format("%Y-%m-%d").to_string());
            assert_eq!(recommendation, assessment.recommendation.as_str());
            assert_eq!(advice, assessment.recommendation.advice());
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn recent_assessments_list_newest_first() {
    let (_dir, pool, scheduler, _rx) = setup();

    // Seed two older assessment rows directly, then assess today.
    pool.with_connection(|conn| {
        for (date, hours) in [("2025-06-01", 4.0), ("2025-06-02", 7.0)] {
            frameshop_scheduler::db::repositories::workload_repository::WorkloadRepository::insert_if_absent(
                conn,
                &frameshop_scheduler::models::workload::DailyWorkloadAssessment {
                    date: date.parse().expect("valid date"),
                    total_tasks: 1,
                    total_hours: hours,
                    complex_tasks: 0,
                    utilization: hours / 8.0 * 100.0,
                    recommendation: WorkloadRecommendation::Optimal,
                    created_at: format!("{date}T06:00:00+00:00"),
                },
            )?;
        }
        Ok(())
    })
    .expect("seed assessments");
    scheduler.assess_daily_workload().expect("assess today");

    let recent = scheduler.recent_workload_assessments(10).expect("recent");
    assert_eq!(recent.len(), 3);
    assert!(recent[0].date > recent[1].date);
    assert!(recent[1].date > recent[2].date);

    let limited = scheduler.recent_workload_assessments(1).expect("limited");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].date, recent[0].date);
}
