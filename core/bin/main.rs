use ease::prelude::*;
use std::time::Duration;

/// The jobs this binary knows about, replace with your own configuration
fn configure(engine: &Engine) -> anyhow::Result<()> {
    engine.task("greet", |ctx: TaskContext| async move {
        ctx.log(format!("Hello from job \"{}\"", ctx.job_name()));
        HandlerResult::Ok(())
    })?;

    engine.task("greet:before", |ctx: TaskContext| async move {
        if std::env::var_os("EASE_SKIP_GREETING").is_some() {
            ctx.suspend();
        }
        HandlerResult::Ok(())
    })?;

    engine.task("pause", |_ctx: TaskContext| async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        HandlerResult::Ok(())
    })?;

    engine.install("disk-report", |logger: TaskLogger, base_dir: &std::path::Path| {
        let base_dir = base_dir.to_path_buf();
        move |_ctx: TaskContext| {
            let logger = logger.clone();
            let base_dir = base_dir.clone();
            async move {
                let entries = match std::fs::read_dir(&base_dir) {
                    Ok(entries) => entries.count(),
                    Err(err) => {
                        logger.error(format!("cannot read {}: {err}", base_dir.display()));
                        return Err(err.into());
                    }
                };

                if entries == 0 {
                    logger.warn(format!("{} is empty", base_dir.display()));
                } else {
                    logger.log(format!("{} holds {entries} entries", base_dir.display()));
                }
                HandlerResult::Ok(())
            }
        }
    })?;

    engine.job("hello", ["greet", "pause", "greet"], None)?;

    engine.job(
        "report",
        ["disk-report"],
        Some(
            JobOptions::builder()
                .run_immediately(false)
                .schedule(ScheduleOptions::daily("09:00"))
                .build(),
        ),
    )?;

    engine.hook("report:error", |ctx: JobContext| async move {
        if let Some(err) = ctx.error() {
            ctx.log(format!("report failed: {err}"));
        }
        HandlerResult::Ok(())
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ease::cli::launch(configure).await
}
