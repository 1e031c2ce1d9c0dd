use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;

use frameshop_scheduler::db::repositories::task_repository::TaskRepository;
use frameshop_scheduler::db::DbPool;
use frameshop_scheduler::models::config::SchedulerConfig;
use frameshop_scheduler::models::task::{ScheduledTask, TaskStatus};
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
        max_daily_hours: 24.0,
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

fn task(
    id: &str,
    order_id: &str,
    start: DateTime<Utc>,
    hours: f64,
    priority: i64,
) -> ScheduledTask {
    let now = Utc::now().to_rfc3339();
    ScheduledTask {
        id: id.to_string(),
        order_id: order_id.to_string(),
        start_at: start.to_rfc3339(),
        end_at: (start + Duration::minutes((hours * 60.0) as i64)).to_rfc3339(),
        complexity: 3,
        estimated_hours: hours,
        actual_hours: None,
        status: TaskStatus::Scheduled,
        priority,
        deadline: Some((Utc::now() + Duration::days(14)).to_rfc3339()),
        dependencies: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    }
}

fn insert(pool: &DbPool, record: &ScheduledTask) {
    pool.with_connection(|conn| TaskRepository::insert(conn, record))
        .expect("insert task");
}

fn parse(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .expect("stored timestamps are RFC 3339")
        .with_timezone(&Utc)
}

fn overlaps(a: &ScheduledTask, b: &ScheduledTask) -> bool {
    parse(&a.start_at) < parse(&b.end_at) && parse(&b.start_at) < parse(&a.end_at)
}

#[test]
fn lower_priority_task_is_moved_out_of_the_overlap() {
    let (_dir, pool, scheduler, _rx) = setup();
    let base = Utc::now() + Duration::days(1);

    insert(&pool, &task("t-a", "order-a", base, 4.0, 1));
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(2), 4.0, 2));

    let resolved = scheduler.run_conflict_pass().expect("conflict pass");
    assert_eq!(resolved, 1);

    let winner = scheduler.task_for_order("order-a").expect("winner");
    let loser = scheduler.task_for_order("order-b").expect("loser");

    assert_eq!(winner.start_at, base.to_rfc3339(), "winner keeps its slot");
    assert!(!overlaps(&winner, &loser));
}

#[test]
fn equal_priority_moves_the_later_start() {
    let (_dir, pool, scheduler, _rx) = setup();
    let base = Utc::now() + Duration::days(1);

    insert(&pool, &task("t-a", "order-a", base, 4.0, 1));
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(1), 4.0, 1));

    scheduler.run_conflict_pass().expect("conflict pass");

    let earlier = scheduler.task_for_order("order-a").expect("earlier");
    assert_eq!(earlier.start_at, base.to_rfc3339());
    let later = scheduler.task_for_order("order-b").expect("later");
    assert!(!overlaps(&earlier, &later));
}

#[test]
fn conflict_pass_is_idempotent() {
    let (_dir, pool, scheduler, _rx) = setup();
    let base = Utc::now() + Duration::days(1);

    insert(&pool, &task("t-a", "order-a", base, 4.0, 1));
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(2), 4.0, 2));

    assert_eq!(scheduler.run_conflict_pass().expect("first pass"), 1);
    assert_eq!(scheduler.run_conflict_pass().expect("second pass"), 0);
}

#[test]
fn terminal_tasks_do_not_conflict() {
    let (_dir, pool, scheduler, _rx) = setup();
    let base = Utc::now() + Duration::days(1);

    let mut done = task("t-a", "order-a", base, 4.0, 1);
    done.status = TaskStatus::Completed;
    insert(&pool, &done);
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(2), 4.0, 2));

    assert_eq!(scheduler.run_conflict_pass().expect("pass"), 0);
}

#[test]
fn resolution_emits_a_conflict_resolved_event() {
    let (_dir, pool, scheduler, mut rx) = setup();
    let base = Utc::now() + Duration::days(1);

    insert(&pool, &task("t-a", "order-a", base, 4.0, 1));
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(2), 4.0, 2));

    scheduler.run_conflict_pass().expect("pass");

    let event = rx.try_recv().expect("event emitted");
    match event {
        SchedulerEvent::ConflictResolved {
            task_id, order_id, ..
        } => {
            assert_eq!(task_id, "t-b");
            assert_eq!(order_id, "order-b");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn three_way_overlap_settles_to_a_conflict_free_schedule() {
    let (_dir, pool, scheduler, _rx) = setup();
    let base = Utc::now() + Duration::days(1);

    insert(&pool, &task("t-a", "order-a", base, 4.0, 1));
    insert(&pool, &task("t-b", "order-b", base + Duration::hours(1), 4.0, 2));
    insert(&pool, &task("t-c", "order-c", base + Duration::hours(2), 4.0, 3));

    scheduler.run_conflict_pass().expect("pass");

    let a = scheduler.task_for_order("order-a").expect("a");
    let b = scheduler.task_for_order("order-b").expect("b");
    let c = scheduler.task_for_order("order-c").expect("c");
    assert!(!overlaps(&a, &b));
    assert!(!overlaps(&a, &c));
    assert!(!overlaps(&b, &c));
    assert_eq!(a.start_at, base.to_rfc3339(), "highest precedence is untouched");
}
