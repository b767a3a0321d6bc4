use crate::engine::{Engine, JobReport};
use crate::errors::ErrorChain;
use crate::logging::{self, LoggingConfig};
use anyhow::{Context, bail};
use clap::Parser;
use std::path::PathBuf;

/// Command line of the ``ease`` launcher
#[derive(Parser, Debug, Clone)]
#[command(name = "ease")]
#[command(about = "Runs code-defined jobs now or on a daily, weekly or monthly schedule", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Names of the jobs to run
    pub jobs: Vec<String>,

    /// Run every registered job
    #[arg(short, long)]
    pub all: bool,

    /// Print configuration lines on the console
    #[arg(short, long)]
    pub verbose: bool,

    /// Base directory handed to installed task modules
    #[arg(short, long, env = "EASE_CONFIG_DIR", default_value = ".")]
    pub config: PathBuf,

    /// Log file location, defaults to ~/.ease/ease.log
    #[arg(long, env = "EASE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Parses the command line and runs [`run`] with it
pub async fn launch<F>(configure: F) -> anyhow::Result<()>
where
    F: FnOnce(&Engine) -> anyhow::Result<()>,
{
    run(Cli::parse(), configure).await
}

/// Sets up logging, builds an [`Engine`], lets ``configure`` register tasks and jobs on it and
/// runs the requested jobs. When jobs were scheduled the process keeps running until Ctrl-C
///
/// # Returns
/// An error when no job was requested, when logging cannot be set up or when ``configure``
/// fails. Failing jobs are reported in the log only
pub async fn run<F>(cli: Cli, configure: F) -> anyhow::Result<()>
where
    F: FnOnce(&Engine) -> anyhow::Result<()>,
{
    if cli.jobs.is_empty() && !cli.all {
        bail!("No jobs to run! Name at least one job or pass --all");
    }

    let log_file = cli.log_file.clone().or_else(logging::default_log_file);
    let _guard = logging::init(
        LoggingConfig::builder()
            .verbose(cli.verbose)
            .log_file(log_file)
            .build(),
    )?;

    let engine = Engine::builder().base_dir(cli.config.clone()).build();
    configure(&engine).context("Failed to configure jobs")?;

    let report = engine.run_jobs(&cli.jobs, cli.all).await;
    for (job, outcome) in report.iter() {
        match outcome {
            JobReport::Failed(err) => {
                tracing::debug!("Job \"{job}\" failed: {}", ErrorChain(err.as_ref()))
            }
            other => tracing::debug!("Job \"{job}\": {other:?}"),
        }
    }

    if engine.is_clock_active() {
        tracing::info!("Waiting for scheduled jobs, press Ctrl-C to exit...");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("Shutting down");
    }

    Ok(())
}
