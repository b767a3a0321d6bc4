pub mod hooks; // skipcq: RS-D1001

pub use hooks::*;

use crate::engine::Engine;
use crate::errors::{HandlerResult, SharedError};
use crate::logging::TASK_TARGET;
use crate::suspend::SuspendToken;
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;

/// [`TaskHandler`] is the unit of user code behind a task, both the task body (its runner) and
/// its before / after / error / suspend hooks are [`TaskHandler`]s, they only differ in the
/// [`TaskContext`] they receive
///
/// # Required Method(s)
/// [`TaskHandler::handle`] runs the handler, returning an error fails the task, see
/// [`crate::errors::EaseError`] for how each hook's failure is reported
///
/// # Trait Implementation(s)
/// Any ``Fn(TaskContext) -> impl Future<Output = HandlerResult>`` closure is a [`TaskHandler`],
/// which is what [`Engine::task`] and [`Engine::task_hook`] accept. Structs implement the trait
/// directly and are registered through [`Engine::register_task_handler`] or [`Engine::install`]
///
/// # Object Safety
/// This trait is object safe to use, the registry stores ``Arc<dyn TaskHandler>``
///
/// # See Also
/// - [`TaskContext`]
/// - [`Engine::task`]
/// - [`Engine::install`]
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: TaskContext) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> TaskHandler for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: TaskContext) -> HandlerResult {
        self(ctx).await
    }
}

/// [`TaskContext`] is what every task handler receives, it identifies the running job and task
/// and carries the capabilities of the lifecycle point being executed:
///
/// - the ``before`` hook may call [`TaskContext::suspend`] to skip the task
/// - the ``error`` hook finds the failure through [`TaskContext::error`]
/// - any handler may suspend the whole job via [`TaskContext::suspend_job`] or log with
///   [`TaskContext::log`]
///
/// # See Also
/// - [`TaskHandler`]
/// - [`SuspendToken`]
#[derive(Clone)]
pub struct TaskContext {
    engine: Engine,
    job: Arc<str>,
    task: Arc<str>,
    job_token: SuspendToken,
    task_token: Option<SuspendToken>,
    error: Option<SharedError>,
}

impl TaskContext {
    pub(crate) fn new(engine: Engine, job: Arc<str>, task: Arc<str>, job_token: SuspendToken) -> Self {
        Self {
            engine,
            job,
            task,
            job_token,
            task_token: None,
            error: None,
        }
    }

    pub(crate) fn with_task_token(mut self, token: SuspendToken) -> Self {
        self.task_token = Some(token);
        self
    }

    pub(crate) fn with_error(mut self, error: SharedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job
    }

    pub fn task_name(&self) -> &str {
        &self.task
    }

    /// The failure that triggered the ``error`` hook, [`None`] everywhere else
    pub fn error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    /// Suspends this task, skipping its runner and after hook. Only the ``before`` hook can
    /// suspend a task, anywhere else this logs a warning and does nothing
    pub fn suspend(&self) {
        match &self.task_token {
            Some(token) => token.suspend(),
            None => tracing::warn!(
                "Task \"{}\" can only be suspended from its before hook!",
                self.task
            ),
        }
    }

    /// Suspends the job this task is running in, the remaining tasks do not run
    pub fn suspend_job(&self) {
        self.job_token.suspend();
    }

    /// Writes a user log line tagged ``[TASK]``
    pub fn log(&self, message: impl Display) {
        tracing::info!(target: TASK_TARGET, "{message}");
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// [`TaskLogger`] is the logger handed to installed task modules, every line it writes is tagged
/// ``[TASK]`` and prefixed with the name the module was installed under
///
/// # See Also
/// - [`Engine::install`]
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task: Arc<str>,
}

impl TaskLogger {
    pub(crate) fn new(task: &str) -> Self {
        Self { task: Arc::from(task) }
    }

    pub fn task_name(&self) -> &str {
        &self.task
    }

    pub fn log(&self, message: impl Display) {
        tracing::info!(target: TASK_TARGET, "{}: {message}", self.task);
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(target: TASK_TARGET, "{}: {message}", self.task);
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(target: TASK_TARGET, "{}: {message}", self.task);
    }
}
