use ease::errors::{EaseError, JobValidationError, SharedError};
use ease::prelude::*;
use ease::task::SubjectKind;
use std::future::{Ready, ready};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

type Events = Arc<Mutex<Vec<String>>>;

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn snapshot(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

fn task_recorder(
    events: &Events,
    label: &'static str,
) -> impl Fn(TaskContext) -> Ready<HandlerResult> + Send + Sync + 'static {
    let events = events.clone();
    move |_ctx| {
        events.lock().unwrap().push(label.to_string());
        ready(Ok(()))
    }
}

fn job_recorder(
    events: &Events,
    label: &'static str,
) -> impl Fn(JobContext) -> Ready<HandlerResult> + Send + Sync + 'static {
    let events = events.clone();
    move |_ctx| {
        events.lock().unwrap().push(label.to_string());
        ready(Ok(()))
    }
}

fn failing_task(message: &'static str) -> impl Fn(TaskContext) -> Ready<HandlerResult> + Send + Sync + 'static {
    move |_ctx| ready(Err(message.into()))
}

#[tokio::test]
async fn test_tasks_run_in_order_and_wait_for_async_bodies() {
    let engine = Engine::default();
    let events = events();

    engine.task("sync", task_recorder(&events, "A")).unwrap();
    {
        let events = events.clone();
        engine
            .task("async", move |_ctx: TaskContext| {
                let events = events.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    events.lock().unwrap().push("B".to_string());
                    HandlerResult::Ok(())
                }
            })
            .unwrap();
    }
    engine.job("seq", ["sync", "async"], None).unwrap();

    let report = engine.run_jobs(["seq"], false).await;

    assert_eq!(snapshot(&events), vec!["A", "B"]);
    assert!(matches!(report.get("seq"), Some(JobReport::Completed)));
    assert!(report.is_success());
}

#[tokio::test]
async fn test_every_task_runs_once_in_declared_order() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.task("c", task_recorder(&events, "c")).unwrap();
    engine.job("job", ["c", "a", "b", "a"], None).unwrap();

    engine.run_jobs(["job"], false).await;
    assert_eq!(snapshot(&events), vec!["c", "a", "b", "a"]);
}

#[tokio::test]
async fn test_task_suspension_skips_only_that_task() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.task("b:before", |ctx: TaskContext| {
        ctx.suspend();
        ready(HandlerResult::Ok(()))
    })
    .unwrap();
    engine.task("b:after", task_recorder(&events, "b:after")).unwrap();
    engine.task("b:suspend", task_recorder(&events, "b:suspend")).unwrap();
    engine.task("c", task_recorder(&events, "c")).unwrap();
    engine.job("job", ["a", "b", "c"], None).unwrap();
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();
    engine.hook("job:suspend", job_recorder(&events, "job:suspend")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a", "b:suspend", "c", "job:after"]);
    assert!(matches!(report.get("job"), Some(JobReport::Completed)));
}

#[tokio::test]
async fn test_job_suspension_in_before_hook_runs_no_task() {
    let engine = Engine::default();
    let events = events();
    let suspends = Arc::new(AtomicUsize::new(0));

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();
    engine.hook("job:before", |ctx: JobContext| {
        ctx.suspend();
        ready(HandlerResult::Ok(()))
    })
    .unwrap();
    {
        let suspends = suspends.clone();
        engine
            .hook("job:suspend", move |_ctx: JobContext| {
                suspends.fetch_add(1, Ordering::SeqCst);
                ready(HandlerResult::Ok(()))
            })
            .unwrap();
    }
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert!(snapshot(&events).is_empty());
    assert_eq!(suspends.load(Ordering::SeqCst), 1);
    assert!(matches!(report.get("job"), Some(JobReport::Suspended)));
}

#[tokio::test]
async fn test_job_suspension_from_a_task_stops_the_remaining_tasks() {
    let engine = Engine::default();
    let events = events();

    {
        let events = events.clone();
        engine
            .task("a", move |ctx: TaskContext| {
                events.lock().unwrap().push("a".to_string());
                let result = ctx.engine().suspend(ctx.job_name());
                ready(result.map_err(BoxError::from))
            })
            .unwrap();
    }
    engine.task("a:after", task_recorder(&events, "a:after")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();
    engine.hook("job:suspend", job_recorder(&events, "job:suspend")).unwrap();
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a", "job:suspend"]);
    assert!(matches!(report.get("job"), Some(JobReport::Suspended)));
    assert!(!engine.is_active("job"));
}

#[tokio::test]
async fn test_runner_failure_reaches_error_hooks_and_aborts_the_job() {
    let engine = Engine::default();
    let events = events();
    let seen: Arc<Mutex<Option<SharedError>>> = Arc::new(Mutex::new(None));
    let job_seen: Arc<Mutex<Option<SharedError>>> = Arc::new(Mutex::new(None));

    engine.task("a", failing_task("boom")).unwrap();
    engine.task("a:after", task_recorder(&events, "a:after")).unwrap();
    {
        let seen = seen.clone();
        engine
            .task("a:error", move |ctx: TaskContext| {
                *seen.lock().unwrap() = ctx.error().cloned();
                ready(HandlerResult::Ok(()))
            })
            .unwrap();
    }
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();
    {
        let job_seen = job_seen.clone();
        engine
            .hook("job:error", move |ctx: JobContext| {
                *job_seen.lock().unwrap() = ctx.error().cloned();
                ready(HandlerResult::Ok(()))
            })
            .unwrap();
    }

    let report = engine.run_jobs(["job"], false).await;

    assert!(snapshot(&events).is_empty());

    let seen = seen.lock().unwrap().clone().expect("task error hook not invoked");
    assert_eq!(seen.to_string(), "boom");

    let Some(JobReport::Failed(err)) = report.get("job") else {
        panic!("job did not fail: {report:?}");
    };
    match err.as_ref() {
        EaseError::RunnerFailed { task, source } => {
            assert_eq!(task, "a");
            assert!(Arc::ptr_eq(source, &seen));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let job_seen = job_seen.lock().unwrap().clone().expect("job error hook not invoked");
    assert_eq!(job_seen.to_string(), err.to_string());
}

#[tokio::test]
async fn test_before_hook_failure_skips_the_runner() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("a:before", failing_task("not ready")).unwrap();
    engine.task("a:error", task_recorder(&events, "a:error")).unwrap();
    engine.job("job", ["a"], None).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a:error"]);
    assert!(matches!(
        report.get("job"),
        Some(JobReport::Failed(err)) if matches!(err.as_ref(), EaseError::BeforeHookFailed { .. })
    ));
}

#[tokio::test]
async fn test_failing_task_error_hook_replaces_the_failure() {
    let engine = Engine::default();

    engine.task("a", failing_task("boom")).unwrap();
    engine.task("a:error", failing_task("error hook broke")).unwrap();
    engine.job("job", ["a"], None).unwrap();

    let report = engine.run_jobs(["job"], false).await;
    let Some(JobReport::Failed(err)) = report.get("job") else {
        panic!("job did not fail: {report:?}");
    };

    match err.as_ref() {
        EaseError::HookError {
            subject,
            name,
            hook,
            source,
        } => {
            assert_eq!(*subject, SubjectKind::Task);
            assert_eq!(name, "a");
            assert_eq!(*hook, HookKind::Error);
            assert_eq!(source.to_string(), "error hook broke");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_job_before_hook_failure_is_a_hook_error() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.job("job", ["a"], None).unwrap();
    engine
        .hook("job:before", |_ctx: JobContext| ready(HandlerResult::Err("nope".into())))
        .unwrap();
    engine.hook("job:error", job_recorder(&events, "job:error")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["job:error"]);
    assert!(matches!(
        report.get("job"),
        Some(JobReport::Failed(err)) if matches!(
            err.as_ref(),
            EaseError::HookError { subject: SubjectKind::Job, hook: HookKind::Before, .. }
        )
    ));
    assert!(!engine.is_active("job"));
}

#[tokio::test]
async fn test_batch_survives_missing_and_failing_jobs() {
    let engine = Engine::default();
    let events = events();

    engine.task("bad", failing_task("boom")).unwrap();
    engine.task("good", task_recorder(&events, "good")).unwrap();
    engine.job("bad", ["bad"], None).unwrap();
    engine.job("good", ["good"], None).unwrap();
    engine
        .hook("bad:error", |_ctx: JobContext| ready(HandlerResult::Err("hook failed too".into())))
        .unwrap();

    let report = engine.run_jobs(["missing", "bad", "good"], false).await;

    assert_eq!(report.len(), 3);
    assert!(matches!(report.get("missing"), Some(JobReport::NotFound)));
    assert!(matches!(report.get("bad"), Some(JobReport::Failed(_))));
    assert!(matches!(report.get("good"), Some(JobReport::Completed)));
    assert!(!report.is_success());
    assert_eq!(snapshot(&events), vec!["good"]);
}

#[tokio::test]
async fn test_registration_checks_tasks() {
    let engine = Engine::default();
    let events = events();

    assert!(matches!(
        engine.job("job", ["ghost"], None),
        Err(EaseError::TaskNotFound(name)) if name == "ghost"
    ));
    assert!(matches!(engine.info("job"), Err(EaseError::JobNotFound(_))));

    engine.task("hollow:before", task_recorder(&events, "before")).unwrap();
    assert!(matches!(
        engine.job("job", ["hollow"], None),
        Err(EaseError::MissingRunner(name)) if name == "hollow"
    ));

    assert!(matches!(
        engine.job("job", Vec::<String>::new(), None),
        Err(EaseError::JobValidationFailed {
            reason: JobValidationError::NoTasks,
            ..
        })
    ));
    assert!(matches!(engine.info("job"), Err(EaseError::JobNotFound(_))));
}

#[tokio::test]
async fn test_unsupported_hooks_are_rejected() {
    let engine = Engine::default();
    let events = events();

    assert!(matches!(
        engine.task("a:during", task_recorder(&events, "a")),
        Err(EaseError::UnsupportedHook { subject: SubjectKind::Task, .. })
    ));
    assert!(matches!(
        engine.hook("job", job_recorder(&events, "job")),
        Err(EaseError::UnsupportedHook { subject: SubjectKind::Job, .. })
    ));
    assert!(matches!(
        engine.job_hook("job", HookKind::Primary, job_recorder(&events, "job")),
        Err(EaseError::UnsupportedHook { .. })
    ));
}

#[tokio::test]
async fn test_invalid_schedule_evicts_the_job() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine
        .job(
            "weekly",
            ["a"],
            Some(
                JobOptions::builder()
                    .schedule(ScheduleOptions::weekly(9, "10:00"))
                    .build(),
            ),
        )
        .unwrap();

    let report = engine.run_jobs(["weekly"], false).await;
    assert!(matches!(
        report.get("weekly"),
        Some(JobReport::Evicted(JobValidationError::WeekDayOutOfRange(9)))
    ));
    assert!(snapshot(&events).is_empty());
    assert!(!engine.is_clock_active());
    assert!(matches!(engine.info("weekly"), Err(EaseError::JobNotFound(_))));

    let again = engine.run_jobs(["weekly"], false).await;
    assert!(matches!(again.get("weekly"), Some(JobReport::Evicted(_))));
    assert!(matches!(
        engine.job("weekly", ["a"], None),
        Err(EaseError::JobEvicted(_))
    ));
    assert!(matches!(
        engine.run_job("weekly").await,
        Err(EaseError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_hook_only_job_is_evicted_for_having_no_tasks() {
    let engine = Engine::default();
    let events = events();

    engine.hook("lonely:before", job_recorder(&events, "before")).unwrap();
    assert!(engine.info("lonely").unwrap().tasks.is_empty());

    let report = engine.run_jobs(["lonely"], false).await;
    assert!(matches!(
        report.get("lonely"),
        Some(JobReport::Evicted(JobValidationError::NoTasks))
    ));
    assert!(snapshot(&events).is_empty());
}

#[tokio::test]
async fn test_suspending_an_inactive_job_is_a_noop() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.job("job", ["a"], None).unwrap();

    engine.suspend("job").unwrap();
    assert!(!engine.is_suspended("job"));
    assert!(!engine.is_active("job"));
    assert!(matches!(engine.suspend("ghost"), Err(EaseError::JobNotFound(_))));

    let report = engine.run_jobs(["job"], false).await;
    assert!(matches!(report.get("job"), Some(JobReport::Completed)));
    assert_eq!(snapshot(&events), vec!["a"]);
}

#[tokio::test]
async fn test_task_suspension_does_not_carry_over_to_the_next_run() {
    let engine = Engine::default();
    let events = events();
    let calls = Arc::new(AtomicUsize::new(0));

    engine.task("a", task_recorder(&events, "a")).unwrap();
    {
        let calls = calls.clone();
        engine
            .task("a:before", move |ctx: TaskContext| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    ctx.suspend();
                }
                ready(HandlerResult::Ok(()))
            })
            .unwrap();
    }
    engine.job("job", ["a"], None).unwrap();

    engine.run_jobs(["job"], false).await;
    assert!(snapshot(&events).is_empty());

    engine.run_jobs(["job"], false).await;
    assert_eq!(snapshot(&events), vec!["a"]);
}

#[tokio::test]
async fn test_info_is_a_detached_copy() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    let options = JobOptions::builder()
        .run_immediately(false)
        .schedule(ScheduleOptions::monthly(3, "07:00"))
        .build();
    engine.job("job", ["a", "b"], Some(options.clone())).unwrap();

    let mut info = engine.info("job").unwrap();
    info.tasks.push("c".to_string());
    info.options.run_immediately = true;
    if let Some(schedule) = info.options.schedule.as_mut() {
        schedule.day = Some(20);
    }

    let fresh = engine.info("JOB").unwrap();
    assert_eq!(fresh.tasks, vec!["a", "b"]);
    assert_eq!(fresh.options, options);
}

#[tokio::test]
async fn test_run_all_follows_registration_order() {
    let engine = Engine::default();
    let events = events();

    engine.task("z", task_recorder(&events, "z")).unwrap();
    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("m", task_recorder(&events, "m")).unwrap();
    engine.job("zulu", ["z"], None).unwrap();
    engine.job("alpha", ["a"], None).unwrap();
    engine.job("mike", ["m"], None).unwrap();

    let report = engine.run_jobs(Vec::<String>::new(), true).await;

    assert_eq!(snapshot(&events), vec!["z", "a", "m"]);
    assert_eq!(
        report.iter().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["zulu", "alpha", "mike"]
    );
}

#[tokio::test]
async fn test_job_without_schedule_or_immediate_run_is_deferred() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine
        .job(
            "idle",
            ["a"],
            Some(JobOptions::builder().run_immediately(false).build()),
        )
        .unwrap();

    let report = engine.run_jobs(["idle"], false).await;
    assert!(matches!(report.get("idle"), Some(JobReport::Deferred)));
    assert!(snapshot(&events).is_empty());
    assert!(!engine.is_clock_active());
}

#[tokio::test]
async fn test_names_are_case_insensitive() {
    let engine = Engine::default();
    let events = events();

    engine.task("Backup", task_recorder(&events, "backup")).unwrap();
    engine.task("BACKUP:After", task_recorder(&events, "after")).unwrap();
    engine.job("Nightly", ["backup"], None).unwrap();

    let report = engine.run_jobs(["NIGHTLY"], false).await;
    assert!(matches!(report.get("nightly"), Some(JobReport::Completed)));
    assert_eq!(snapshot(&events), vec!["backup", "after"]);
}

#[tokio::test]
async fn test_updating_a_job_keeps_tasks_when_none_are_given() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a"], None).unwrap();
    engine
        .job(
            "job",
            Vec::<String>::new(),
            Some(JobOptions::builder().run_immediately(false).build()),
        )
        .unwrap();
    assert_eq!(engine.info("job").unwrap().tasks, vec!["a"]);

    engine.job("job", ["b", "a"], Some(JobOptions::default())).unwrap();
    let info = engine.info("job").unwrap();
    assert_eq!(info.tasks, vec!["b", "a"]);
    assert!(info.options.run_immediately);
}

#[tokio::test]
async fn test_install_hands_logger_and_base_dir_to_the_factory() {
    let engine = Engine::builder().base_dir("/srv/ease").build();
    let events = events();
    let dir_seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));

    {
        let dir_seen = dir_seen.clone();
        let events = events.clone();
        engine
            .install("Archive", move |logger: TaskLogger, base_dir: &Path| {
                assert_eq!(logger.task_name(), "archive");
                *dir_seen.lock().unwrap() = Some(base_dir.to_path_buf());
                move |_ctx: TaskContext| {
                    logger.log("archiving");
                    events.lock().unwrap().push("archive".to_string());
                    ready(HandlerResult::Ok(()))
                }
            })
            .unwrap();
    }
    engine.job("job", ["archive"], None).unwrap();

    engine.run_jobs(["job"], false).await;
    assert_eq!(
        dir_seen.lock().unwrap().as_deref(),
        Some(Path::new("/srv/ease"))
    );
    assert_eq!(snapshot(&events), vec!["archive"]);
}

#[tokio::test]
async fn test_a_job_cannot_run_twice_at_once() {
    let engine = Engine::default();
    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());

    {
        let started = started.clone();
        let gate = gate.clone();
        engine
            .task("wait", move |_ctx: TaskContext| {
                let started = started.clone();
                let gate = gate.clone();
                async move {
                    started.notify_one();
                    gate.notified().await;
                    HandlerResult::Ok(())
                }
            })
            .unwrap();
    }
    engine.job("job", ["wait"], None).unwrap();

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_job("job").await })
    };

    started.notified().await;
    assert!(engine.is_active("job"));
    assert!(matches!(
        engine.run_job("job").await,
        Err(EaseError::JobAlreadyActive(_))
    ));

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, JobOutcome::Completed);
    assert!(!engine.is_active("job"));
}

#[tokio::test]
async fn test_run_job_refuses_a_job_without_tasks() {
    let engine = Engine::default();
    let events = events();

    engine.hook("lonely:before", job_recorder(&events, "before")).unwrap();

    assert!(matches!(
        engine.run_job("lonely").await,
        Err(EaseError::JobValidationFailed {
            reason: JobValidationError::NoTasks,
            ..
        })
    ));
    assert!(snapshot(&events).is_empty());
    assert!(matches!(engine.info("lonely"), Err(EaseError::JobNotFound(_))));
    assert!(matches!(
        engine.run_job("lonely").await,
        Err(EaseError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_run_job_refuses_a_malformed_schedule() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine
        .job(
            "monthly",
            ["a"],
            Some(
                JobOptions::builder()
                    .schedule(ScheduleOptions::monthly(12, "7pm"))
                    .build(),
            ),
        )
        .unwrap();

    assert!(matches!(
        engine.run_job("monthly").await,
        Err(EaseError::JobValidationFailed {
            reason: JobValidationError::InvalidTime(_),
            ..
        })
    ));
    assert!(snapshot(&events).is_empty());
    assert!(!engine.is_scheduled("monthly"));
    assert!(matches!(
        engine.job("monthly", ["a"], None),
        Err(EaseError::JobEvicted(_))
    ));
}

#[tokio::test]
async fn test_batch_skips_a_job_that_is_still_running() {
    let engine = Engine::default();
    let events = events();
    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());

    {
        let started = started.clone();
        let gate = gate.clone();
        engine
            .task("wait", move |_ctx: TaskContext| {
                let started = started.clone();
                let gate = gate.clone();
                async move {
                    started.notify_one();
                    gate.notified().await;
                    HandlerResult::Ok(())
                }
            })
            .unwrap();
    }
    engine.job("job", ["wait"], None).unwrap();
    engine.hook("job:error", job_recorder(&events, "job:error")).unwrap();

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_job("job").await })
    };
    started.notified().await;

    let report = engine.run_jobs(["job"], false).await;
    assert!(matches!(report.get("job"), Some(JobReport::Skipped)));
    assert!(report.is_success());
    assert!(snapshot(&events).is_empty());

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), JobOutcome::Completed);
}

#[tokio::test]
async fn test_failing_task_suspend_hook() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine
        .task("a:before", |ctx: TaskContext| {
            ctx.suspend();
            ready(HandlerResult::Ok(()))
        })
        .unwrap();
    engine.task("a:suspend", failing_task("cannot park")).unwrap();
    engine.task("a:error", task_recorder(&events, "a:error")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a:error"]);
    let Some(JobReport::Failed(err)) = report.get("job") else {
        panic!("job did not fail: {report:?}");
    };
    match err.as_ref() {
        EaseError::SuspendHookFailed { task, source } => {
            assert_eq!(task, "a");
            assert_eq!(source.to_string(), "cannot park");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_task_after_hook() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.task("a:after", failing_task("cleanup failed")).unwrap();
    engine.task("a:error", task_recorder(&events, "a:error")).unwrap();
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a", "a:error"]);
    assert!(matches!(
        report.get("job"),
        Some(JobReport::Failed(err)) if matches!(
            err.as_ref(),
            EaseError::AfterHookFailed { task, .. } if task == "a"
        )
    ));
}

#[tokio::test]
async fn test_failing_job_after_hook_reaches_the_job_error_hook() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.job("job", ["a"], None).unwrap();
    engine
        .hook("job:after", |_ctx: JobContext| ready(HandlerResult::Err("report lost".into())))
        .unwrap();
    engine.hook("job:error", job_recorder(&events, "job:error")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a", "job:error"]);
    assert!(matches!(
        report.get("job"),
        Some(JobReport::Failed(err)) if matches!(
            err.as_ref(),
            EaseError::HookError { subject: SubjectKind::Job, hook: HookKind::After, .. }
        )
    ));
}

#[tokio::test]
async fn test_failing_job_suspend_hook_reaches_the_job_error_hook() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    engine.job("job", ["a"], None).unwrap();
    engine
        .hook("job:before", |ctx: JobContext| {
            ctx.suspend();
            ready(HandlerResult::Ok(()))
        })
        .unwrap();
    engine
        .hook("job:suspend", |_ctx: JobContext| ready(HandlerResult::Err("stuck".into())))
        .unwrap();
    engine.hook("job:error", job_recorder(&events, "job:error")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["job:error"]);
    assert!(matches!(
        report.get("job"),
        Some(JobReport::Failed(err)) if matches!(
            err.as_ref(),
            EaseError::HookError { subject: SubjectKind::Job, hook: HookKind::Suspend, .. }
        )
    ));
    assert!(!engine.is_active("job"));
}

#[tokio::test]
async fn test_job_suspended_from_an_after_hook_stops_before_the_next_task() {
    let engine = Engine::default();
    let events = events();

    engine.task("a", task_recorder(&events, "a")).unwrap();
    {
        let events = events.clone();
        engine
            .task("a:after", move |ctx: TaskContext| {
                events.lock().unwrap().push("a:after".to_string());
                ctx.suspend_job();
                ready(HandlerResult::Ok(()))
            })
            .unwrap();
    }
    engine.task("b", task_recorder(&events, "b")).unwrap();
    engine.job("job", ["a", "b"], None).unwrap();
    engine.hook("job:suspend", job_recorder(&events, "job:suspend")).unwrap();
    engine.hook("job:after", job_recorder(&events, "job:after")).unwrap();

    let report = engine.run_jobs(["job"], false).await;

    assert_eq!(snapshot(&events), vec!["a", "a:after", "job:suspend"]);
    assert!(matches!(report.get("job"), Some(JobReport::Suspended)));
}

#[tokio::test]
async fn test_structured_hook_registration() {
    let engine = Engine::default();
    let events = events();

    engine
        .task_hook("Fetch", HookKind::Primary, task_recorder(&events, "fetch"))
        .unwrap();
    engine
        .task_hook("fetch", HookKind::Before, task_recorder(&events, "fetch:before"))
        .unwrap();
    engine
        .task_hook("fetch", HookKind::After, task_recorder(&events, "fetch:after"))
        .unwrap();
    engine.job("sync", ["fetch"], None).unwrap();
    engine
        .job_hook("sync", HookKind::Before, job_recorder(&events, "sync:before"))
        .unwrap();
    engine
        .job_hook("Sync", HookKind::After, job_recorder(&events, "sync:after"))
        .unwrap();

    let report = engine.run_jobs(["sync"], false).await;

    assert!(matches!(report.get("sync"), Some(JobReport::Completed)));
    assert_eq!(
        snapshot(&events),
        vec![
            "sync:before",
            "fetch:before",
            "fetch",
            "fetch:after",
            "sync:after"
        ]
    );
}
