use crate::engine::Engine;
use crate::errors::{EaseError, SharedError};
use crate::executor::TaskOutcome;
use crate::registry::TaskEntry;
use crate::suspend::SuspendToken;
use crate::task::{HookKind, SubjectKind, TaskContext, hook_error, share};
use std::sync::Arc;

/// Runs one task of a job: its before hook, its runner and its after hook
///
/// # Arguments
/// - ``engine`` the engine owning the task, handed to the handlers through their context
/// - ``job`` the name of the job the task runs in
/// - ``task`` the (lower-cased) task name
/// - ``job_token`` the suspension token of the current job run
///
/// # Returns
/// A [`TaskOutcome`] when the task finished, was skipped or the job got suspended along the
/// way. Any failure first reaches the task's error hook, then comes back as the matching
/// [`EaseError`] variant (or as [`EaseError::HookError`] when the error hook itself fails)
pub async fn run_task(
    engine: &Engine,
    job: &Arc<str>,
    task: &str,
    job_token: &SuspendToken,
) -> Result<TaskOutcome, EaseError> {
    let entry = engine
        .registry()
        .task(task)
        .ok_or_else(|| EaseError::TaskNotFound(task.to_string()))?;

    let ctx = TaskContext::new(engine.clone(), job.clone(), Arc::from(task), job_token.clone());

    let Some(runner) = entry.runner.clone() else {
        let cause: SharedError = Arc::new(EaseError::MissingRunner(task.to_string()));
        let error = EaseError::MissingRunner(task.to_string());
        return Err(on_task_error(&entry, &ctx, cause, error).await);
    };

    let task_token = SuspendToken::new();
    if let Some(before) = entry.hooks.get(HookKind::Before) {
        tracing::info!("Running before hook of task \"{task}\"...");
        let before_ctx = ctx.clone().with_task_token(task_token.clone());
        if let Err(err) = before.handle(before_ctx).await {
            let cause = share(err);
            let error = EaseError::BeforeHookFailed {
                task: task.to_string(),
                source: cause.clone(),
            };
            return Err(on_task_error(&entry, &ctx, cause, error).await);
        }
    }

    if job_token.is_suspended() {
        return Ok(TaskOutcome::JobSuspended);
    }

    if task_token.is_suspended() {
        tracing::warn!("Task \"{task}\" was suspended!");
        if let Some(suspend) = entry.hooks.get(HookKind::Suspend) {
            tracing::info!("Running suspend hook of task \"{task}\"...");
            if let Err(err) = suspend.handle(ctx.clone()).await {
                let cause = share(err);
                let error = EaseError::SuspendHookFailed {
                    task: task.to_string(),
                    source: cause.clone(),
                };
                return Err(on_task_error(&entry, &ctx, cause, error).await);
            }
        }
        return Ok(TaskOutcome::Skipped);
    }

    tracing::info!("Running task \"{task}\"...");
    if let Err(err) = runner.handle(ctx.clone()).await {
        let cause = share(err);
        let error = EaseError::RunnerFailed {
            task: task.to_string(),
            source: cause.clone(),
        };
        return Err(on_task_error(&entry, &ctx, cause, error).await);
    }

    if job_token.is_suspended() {
        return Ok(TaskOutcome::JobSuspended);
    }

    if let Some(after) = entry.hooks.get(HookKind::After) {
        tracing::info!("Running after hook of task \"{task}\"...");
        if let Err(err) = after.handle(ctx.clone()).await {
            let cause = share(err);
            let error = EaseError::AfterHookFailed {
                task: task.to_string(),
                source: cause.clone(),
            };
            return Err(on_task_error(&entry, &ctx, cause, error).await);
        }
    }

    Ok(TaskOutcome::Completed)
}

/// Hands ``cause`` to the task's error hook (if any) and returns the error to propagate, which
/// is ``error`` unless the hook itself fails
async fn on_task_error(
    entry: &TaskEntry,
    ctx: &TaskContext,
    cause: SharedError,
    error: EaseError,
) -> EaseError {
    let Some(hook) = entry.hooks.get(HookKind::Error) else {
        return error;
    };

    tracing::info!("Running error hook of task \"{}\"...", ctx.task_name());
    match hook.handle(ctx.clone().with_error(cause)).await {
        Ok(()) => error,
        Err(err) => hook_error(SubjectKind::Task, ctx.task_name(), HookKind::Error, err),
    }
}
