use crate::engine::Engine;
use crate::errors::EaseError;
use crate::executor::{JobOutcome, JobState, TaskOutcome, run_task};
use crate::job::JobContext;
use crate::registry::JobEntry;
use crate::suspend::SuspendToken;
use crate::task::{HookKind, SubjectKind, hook_error};
use std::sync::Arc;

/// Runs job ``job`` once: its before hook, each of its tasks in order and its after hook. The
/// job occupies its slot in the active-job set for the whole run, the slot is released on every
/// exit path
///
/// Suspension is checked after the before hook, before and after every task, and by the task
/// executor after each task's before hook and runner. Once seen, the job's suspend hook runs and
/// the remaining tasks are abandoned, completed tasks are not rolled back
///
/// # Returns
/// [`JobOutcome::Completed`] or [`JobOutcome::Suspended`], otherwise the failure of the first
/// task or job hook that failed. [`EaseError::JobAlreadyActive`] when the job is still running
/// from an earlier trigger. The job's error hook is NOT invoked here, that is left to the caller
pub async fn run_job(engine: &Engine, job: &str) -> Result<JobOutcome, EaseError> {
    let entry = engine
        .registry()
        .job(job)
        .ok_or_else(|| EaseError::JobNotFound(job.to_string()))?;

    let guard = engine.active_jobs().acquire(job)?;
    let mut run = JobRun {
        engine,
        job: Arc::from(job),
        token: guard.token().clone(),
        entry,
        state: JobState::Pending,
    };

    let result = run.execute().await;
    match &result {
        Ok(JobOutcome::Completed) => tracing::info!("Job \"{job}\" was executed."),
        Ok(JobOutcome::Suspended) => {}
        Err(_) => run.transition(JobState::Failed),
    }

    drop(guard);
    result
}

struct JobRun<'a> {
    engine: &'a Engine,
    job: Arc<str>,
    token: SuspendToken,
    entry: JobEntry,
    state: JobState,
}

impl JobRun<'_> {
    fn transition(&mut self, to: JobState) {
        tracing::debug!("Job \"{}\": {} -> {}", self.job, self.state, to);
        self.state = to;
    }

    fn context(&self) -> JobContext {
        JobContext::new(self.engine.clone(), self.job.clone())
    }

    async fn execute(&mut self) -> Result<JobOutcome, EaseError> {
        self.transition(JobState::RunningBefore);
        if let Some(before) = self.entry.hooks.get(HookKind::Before) {
            tracing::info!("Running before hook of job \"{}\"...", self.job);
            let ctx = self.context().with_token(self.token.clone());
            before
                .handle(ctx)
                .await
                .map_err(|err| hook_error(SubjectKind::Job, &self.job, HookKind::Before, err))?;
        }

        if self.token.is_suspended() {
            return self.suspend().await;
        }

        self.transition(JobState::RunningTasks);
        tracing::info!("Executing job \"{}\"...", self.job);

        let tasks = self.entry.tasks.clone();
        for task in &tasks {
            if self.token.is_suspended() {
                return self.suspend().await;
            }

            let outcome = run_task(self.engine, &self.job, task, &self.token).await?;
            if outcome == TaskOutcome::JobSuspended || self.token.is_suspended() {
                return self.suspend().await;
            }
        }

        self.transition(JobState::RunningAfter);
        if let Some(after) = self.entry.hooks.get(HookKind::After) {
            tracing::info!("Running after hook of job \"{}\"...", self.job);
            after
                .handle(self.context())
                .await
                .map_err(|err| hook_error(SubjectKind::Job, &self.job, HookKind::After, err))?;
        }

        self.transition(JobState::Completed);
        Ok(JobOutcome::Completed)
    }

    async fn suspend(&mut self) -> Result<JobOutcome, EaseError> {
        tracing::warn!("Job \"{}\" was suspended!", self.job);
        self.transition(JobState::Suspended);

        if let Some(suspend) = self.entry.hooks.get(HookKind::Suspend) {
            tracing::info!("Running suspend hook of job \"{}\"...", self.job);
            suspend
                .handle(self.context())
                .await
                .map_err(|err| hook_error(SubjectKind::Job, &self.job, HookKind::Suspend, err))?;
        }

        Ok(JobOutcome::Suspended)
    }
}
