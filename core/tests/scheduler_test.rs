use chrono::{NaiveDate, NaiveDateTime};
use ease::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn local(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    // May 2024, the 1st is a Wednesday
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// An engine on a virtual clock with job ``report`` scheduled by ``schedule``, every run of the
/// job sends its name through the returned receiver
fn scheduled_engine(
    clock: Arc<VirtualClock>,
    schedule: ScheduleOptions,
) -> (Engine, mpsc::UnboundedReceiver<String>) {
    let engine = Engine::builder().clock(clock).build();
    let (tx, rx) = mpsc::unbounded_channel();

    engine
        .task("collect", move |ctx: TaskContext| {
            let _ = tx.send(ctx.job_name().to_string());
            std::future::ready(HandlerResult::Ok(()))
        })
        .unwrap();
    engine
        .job(
            "report",
            ["collect"],
            Some(
                JobOptions::builder()
                    .run_immediately(false)
                    .schedule(schedule)
                    .build(),
            ),
        )
        .unwrap();

    (engine, rx)
}

async fn expect_run(rx: &mut mpsc::UnboundedReceiver<String>) {
    let job = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("scheduled job did not run")
        .expect("channel closed");
    assert_eq!(job, "report");
}

async fn expect_no_run(rx: &mut mpsc::UnboundedReceiver<String>) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(outcome.is_err(), "scheduled job ran unexpectedly");
}

#[tokio::test]
async fn test_daily_job_runs_at_its_time() {
    let clock = Arc::new(VirtualClock::from_local(local(1, 8, 59, 59)));
    let (engine, mut rx) = scheduled_engine(clock.clone(), ScheduleOptions::daily("09:00"));

    let report = engine.run_jobs(["report"], false).await;
    assert!(matches!(report.get("report"), Some(JobReport::Deferred)));
    assert!(engine.is_clock_active());
    assert!(engine.is_scheduled("report"));
    expect_no_run(&mut rx).await;

    clock.advance_to_local(local(1, 9, 0, 0)).await;
    expect_run(&mut rx).await;

    clock.advance_to_local(local(1, 9, 0, 1)).await;
    expect_no_run(&mut rx).await;

    clock.advance_to_local(local(2, 9, 0, 0)).await;
    expect_run(&mut rx).await;
}

#[tokio::test]
async fn test_weekly_job_waits_for_its_day() {
    let clock = Arc::new(VirtualClock::from_local(local(1, 9, 59, 59)));
    let (engine, mut rx) = scheduled_engine(clock.clone(), ScheduleOptions::weekly(4, "10:00"));

    engine.run_jobs(["report"], false).await;

    clock.advance_to_local(local(1, 10, 0, 0)).await;
    expect_no_run(&mut rx).await;

    clock.advance_to_local(local(2, 10, 0, 0)).await;
    expect_run(&mut rx).await;
}

#[tokio::test]
async fn test_immediate_and_scheduled_runs_combine() {
    let clock = Arc::new(VirtualClock::from_local(local(14, 23, 59, 59)));
    let engine = Engine::builder().clock(clock.clone()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    engine
        .task("collect", move |ctx: TaskContext| {
            let _ = tx.send(ctx.job_name().to_string());
            std::future::ready(HandlerResult::Ok(()))
        })
        .unwrap();
    engine
        .job(
            "report",
            ["collect"],
            Some(
                JobOptions::builder()
                    .schedule(ScheduleOptions::monthly(15, "00:00"))
                    .build(),
            ),
        )
        .unwrap();

    let report = engine.run_jobs(["report"], false).await;
    assert!(matches!(report.get("report"), Some(JobReport::Completed)));
    expect_run(&mut rx).await;

    clock.advance_to_local(local(15, 0, 0, 0)).await;
    expect_run(&mut rx).await;
}

#[tokio::test]
async fn test_unscheduling_the_last_job_stops_the_clock() {
    let clock = Arc::new(VirtualClock::from_local(local(1, 8, 0, 0)));
    let (engine, mut rx) = scheduled_engine(clock.clone(), ScheduleOptions::daily("09:00"));

    engine.run_jobs(["report"], false).await;
    assert!(engine.is_clock_active());

    assert!(engine.unschedule("REPORT"));
    assert!(!engine.is_clock_active());
    assert!(!engine.unschedule("report"));

    clock.advance_to_local(local(1, 9, 0, 0)).await;
    expect_no_run(&mut rx).await;
}

#[tokio::test]
async fn test_changing_options_unschedules_the_job() {
    let clock = Arc::new(VirtualClock::from_local(local(1, 8, 0, 0)));
    let (engine, _rx) = scheduled_engine(clock, ScheduleOptions::daily("09:00"));

    engine.run_jobs(["report"], false).await;
    assert!(engine.is_scheduled("report"));

    engine
        .job("report", Vec::<String>::new(), Some(JobOptions::default()))
        .unwrap();
    assert!(!engine.is_scheduled("report"));
    assert!(!engine.is_clock_active());
}

#[tokio::test]
async fn test_failed_scheduled_run_reaches_the_job_error_hook() {
    let clock = Arc::new(VirtualClock::from_local(local(3, 5, 59, 59)));
    let engine = Engine::builder().clock(clock.clone()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    engine
        .task("collect", |_ctx: TaskContext| {
            std::future::ready(HandlerResult::Err("disk full".into()))
        })
        .unwrap();
    engine
        .job(
            "report",
            ["collect"],
            Some(
                JobOptions::builder()
                    .run_immediately(false)
                    .schedule(ScheduleOptions::daily("06:00"))
                    .build(),
            ),
        )
        .unwrap();
    engine
        .hook("report:error", move |ctx: JobContext| {
            let message = ctx.error().map(|err| err.to_string()).unwrap_or_default();
            let _ = tx.send(message);
            std::future::ready(HandlerResult::Ok(()))
        })
        .unwrap();

    engine.run_jobs(["report"], false).await;
    clock.advance_to_local(local(3, 6, 0, 0)).await;

    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("error hook was not invoked")
        .expect("channel closed");
    assert_eq!(message, "An error has occurred on task \"collect\"!");
    assert!(engine.is_scheduled("report"));
}
