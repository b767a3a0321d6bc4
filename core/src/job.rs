use crate::engine::Engine;
use crate::errors::{HandlerResult, SharedError};
use crate::logging::TASK_TARGET;
use crate::schedule::ScheduleOptions;
use crate::suspend::SuspendToken;
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// [`JobOptions`] controls when a job runs. By default a job runs immediately when requested
/// and is not scheduled
///
/// # Fields
/// - ``run_immediately`` whether the batch runner executes the job right away (default ``true``)
/// - ``schedule`` an optional recurrence, validated and registered with the scheduler by the
///   batch runner
///
/// # Constructor(s)
/// Through [`JobOptions::builder`] (a ``typed_builder`` builder) or [`JobOptions::default`]
///
/// # Example
/// ```ignore
/// use ease::job::JobOptions;
/// use ease::schedule::ScheduleOptions;
///
/// let options = JobOptions::builder()
///     .run_immediately(false)
///     .schedule(ScheduleOptions::weekly(3, "09:00"))
///     .build();
/// ```
#[derive(TypedBuilder, Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    #[builder(default = true)]
    pub run_immediately: bool,

    #[builder(default, setter(strip_option))]
    pub schedule: Option<ScheduleOptions>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            run_immediately: true,
            schedule: None,
        }
    }
}

/// A detached copy of a job's configuration as returned by [`Engine::info`], changing it has
/// no effect on the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub tasks: Vec<String>,
    pub options: JobOptions,
}

/// [`JobHandler`] is the job-level counterpart of [`crate::task::TaskHandler`], jobs have no body
/// of their own so every [`JobHandler`] is a lifecycle hook (before, after, error or suspend)
///
/// # Trait Implementation(s)
/// Any ``Fn(JobContext) -> impl Future<Output = HandlerResult>`` closure is a [`JobHandler`],
/// which is what [`Engine::hook`] and [`Engine::job_hook`] accept
///
/// # See Also
/// - [`JobContext`]
/// - [`Engine::hook`]
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: JobContext) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> JobHandler for F
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        self(ctx).await
    }
}

/// [`JobContext`] is what every job hook receives. The ``before`` hook may suspend the job
/// through [`JobContext::suspend`], the ``error`` hook finds the failure of the run through
/// [`JobContext::error`]
#[derive(Clone)]
pub struct JobContext {
    engine: Engine,
    job: Arc<str>,
    token: Option<SuspendToken>,
    error: Option<SharedError>,
}

impl JobContext {
    pub(crate) fn new(engine: Engine, job: Arc<str>) -> Self {
        Self {
            engine,
            job,
            token: None,
            error: None,
        }
    }

    pub(crate) fn with_token(mut self, token: SuspendToken) -> Self {
        self.token = Some(token);
        self
    }

    pub(crate) fn with_error(mut self, error: SharedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job
    }

    pub fn error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    /// Suspends the job before any of its tasks run, anywhere but the ``before`` hook this logs
    /// a warning and does nothing ([`Engine::suspend`] reaches a running job at any point)
    pub fn suspend(&self) {
        match &self.token {
            Some(token) => token.suspend(),
            None => tracing::warn!(
                "Job \"{}\" can only be suspended from its before hook!",
                self.job
            ),
        }
    }

    pub fn log(&self, message: impl Display) {
        tracing::info!(target: TASK_TARGET, "{message}");
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
