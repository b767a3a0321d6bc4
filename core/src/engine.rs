pub mod batch; // skipcq: RS-D1001

pub use batch::{BatchReport, JobReport};

use crate::clock::{SchedulerClock, SystemClock};
use crate::errors::{EaseError, HandlerResult};
use crate::executor::{JobOutcome, run_job};
use crate::job::{JobContext, JobHandler, JobInfo, JobOptions};
use crate::logging::{CONFIG_TARGET, TASK_TARGET};
use crate::registry::{JobRegistration, Registry};
use crate::schedule::{Recurrence, Schedule};
use crate::scheduler::{JobDispatcher, JobScheduler};
use crate::suspend::ActiveJobs;
use crate::task::{
    HookAddress, HookKind, SubjectKind, TaskContext, TaskHandler, TaskLogger, normalize_name,
};
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use typed_builder::TypedBuilder;

/// This is the builder configs to use for building an [`Engine`] instance.
/// By itself it should not be used, and it resides in [`Engine::builder`]
#[derive(TypedBuilder)]
#[builder(build_method(into = Engine))]
pub struct EngineConfig {
    /// The directory handed to installed task modules, usually the directory the configuration
    /// lives in
    ///
    /// # Default Value
    /// The current directory (``.``)
    ///
    /// # See Also
    /// - [`Engine::install`]
    #[builder(default = PathBuf::from("."), setter(into))]
    base_dir: PathBuf,

    /// The [`SchedulerClock`] the scheduler ticks against
    ///
    /// # Default Value
    /// [`SystemClock`], tests supply a [`crate::clock::VirtualClock`] to advance time by hand
    ///
    /// # See Also
    /// - [`SchedulerClock`]
    /// - [`JobScheduler`]
    #[builder(default = Arc::new(SystemClock))]
    clock: Arc<dyn SchedulerClock>,
}

impl From<EngineConfig> for Engine {
    fn from(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry: Registry::default(),
                active: ActiveJobs::default(),
                scheduler: JobScheduler::new(config.clock),
                base_dir: config.base_dir,
            }),
        }
    }
}

pub(crate) struct EngineInner {
    registry: Registry,
    active: ActiveJobs,
    scheduler: JobScheduler,
    base_dir: PathBuf,
}

/// [`Engine`] is the public face of Ease: configuration code registers tasks, jobs and hooks
/// through it, then [`Engine::run_jobs`] validates, schedules and runs the requested jobs
///
/// An [`Engine`] is a cheap handle, clones share the same registry, active-job set and
/// scheduler. Handlers receive a clone through their context and may call back into it
/// (for instance [`Engine::suspend`]) while they run
///
/// # Constructor(s)
/// [`Engine::builder`] for supplying a base directory or a clock, [`Engine::default`] otherwise
///
/// # Example
/// ```ignore
/// use ease::prelude::*;
///
/// let engine = Engine::default();
/// engine.task("fetch", |ctx: TaskContext| async move {
///     ctx.log("fetching");
///     Ok(())
/// })?;
/// engine.task("fetch:after", |ctx: TaskContext| async move {
///     ctx.log("fetched");
///     Ok(())
/// })?;
/// engine.job("nightly", ["fetch"], Some(
///     JobOptions::builder().schedule(ScheduleOptions::daily("02:00")).build()
/// ))?;
///
/// let report = engine.run_jobs(["nightly"], false).await;
/// ```
///
/// # See Also
/// - [`EngineConfig`]
/// - [`BatchReport`]
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::builder().build()
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("jobs", &self.inner.registry.job_names())
            .field("scheduler", &self.inner.scheduler)
            .field("base_dir", &self.inner.base_dir)
            .finish()
    }
}

impl Engine {
    /// Constructs an engine builder, used for supplying the base directory and the clock
    ///
    /// # Returns
    /// The [`EngineConfigBuilder`] builder for constructing the [`Engine`]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfig::builder()
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn active_jobs(&self) -> &ActiveJobs {
        &self.inner.active
    }

    pub(crate) fn scheduler(&self) -> &JobScheduler {
        &self.inner.scheduler
    }

    pub fn base_dir(&self) -> &Path {
        &self.inner.base_dir
    }

    pub fn clock(&self) -> &Arc<dyn SchedulerClock> {
        self.inner.scheduler.clock()
    }

    /// Registers the runner or a hook of a task, addressed as ``name`` or ``name:hook`` where
    /// ``hook`` is one of ``before``, ``after``, ``error`` and ``suspend``
    ///
    /// # Arguments
    /// - ``address`` the (case-insensitive) task name, optionally suffixed with a hook kind
    /// - ``handler`` the closure to run, it receives a [`TaskContext`]
    ///
    /// # Returns
    /// [`EaseError::UnsupportedHook`] when the suffix names no known hook
    ///
    /// # See Also
    /// - [`Engine::task_hook`]
    /// - [`TaskHandler`]
    pub fn task<F, Fut>(&self, address: &str, handler: F) -> Result<(), EaseError>
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let address = self.parse_address(SubjectKind::Task, address)?;
        self.register_task_handler(&address.name, address.kind, Arc::new(handler))
    }

    /// Registers the runner ([`HookKind::Primary`]) or a hook of task ``name``
    pub fn task_hook<F, Fut>(&self, name: &str, kind: HookKind, handler: F) -> Result<(), EaseError>
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_task_handler(name, kind, Arc::new(handler))
    }

    /// Registers any [`TaskHandler`] as the runner or a hook of task ``name``
    pub fn register_task_handler(
        &self,
        name: &str,
        kind: HookKind,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), EaseError> {
        let name = normalize_name(name);
        match kind {
            HookKind::Primary => tracing::info!(target: CONFIG_TARGET, "Registering task \"{name}\""),
            hook => tracing::info!(target: CONFIG_TARGET, "Registering {hook} hook for task \"{name}\""),
        }

        self.inner.registry.set_task_handler(&name, kind, handler);
        Ok(())
    }

    /// Registers or updates a job
    ///
    /// # Arguments
    /// - ``name`` the (case-insensitive) job name
    /// - ``tasks`` the ordered task names (duplicates allowed), an empty list keeps the tasks of
    ///   an existing job
    /// - ``options`` replaces the job's options when given, [`JobOptions::default`] is used for
    ///   new jobs otherwise. Changing the options unschedules the job until the next
    ///   [`Engine::run_jobs`] validates it again
    ///
    /// # Returns
    /// [`EaseError::TaskNotFound`] or [`EaseError::MissingRunner`] when a task cannot run,
    /// [`EaseError::JobValidationFailed`] when a new job has no tasks and
    /// [`EaseError::JobEvicted`] when the name was evicted. Nothing is registered on failure
    pub fn job<I, S>(&self, name: &str, tasks: I, options: Option<JobOptions>) -> Result<(), EaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = normalize_name(name);
        let tasks = tasks
            .into_iter()
            .map(|task| normalize_name(task.as_ref()))
            .collect::<Vec<_>>();
        let options_changed = options.is_some();
        let task_list = quoted(&tasks);

        let registration = self
            .inner
            .registry
            .upsert_job(&name, tasks, options)
            .inspect_err(|err| tracing::error!("{err}"))?;

        match registration {
            JobRegistration::Created => {
                tracing::info!(target: CONFIG_TARGET, "Registering job \"{name}\" with tasks {task_list}");
            }
            JobRegistration::Updated => {
                if !task_list.is_empty() {
                    tracing::info!(target: CONFIG_TARGET, "Adding tasks {task_list} to job \"{name}\"");
                }
                if options_changed {
                    tracing::info!(target: CONFIG_TARGET, "Updating options of job \"{name}\"");
                }
            }
        }

        if options_changed && self.inner.scheduler.unschedule(&name) {
            tracing::info!(target: CONFIG_TARGET, "Removed scheduled job \"{name}\"");
        }

        if let Some(job) = self.inner.registry.job(&name)
            && !job.options.run_immediately
            && job.options.schedule.is_none()
        {
            tracing::warn!("Job \"{name}\" will never run due to options!");
        }

        Ok(())
    }

    /// Registers a job hook, addressed as ``name:hook`` where ``hook`` is one of ``before``,
    /// ``after``, ``error`` and ``suspend``. The job is created (without tasks) when absent
    ///
    /// # Returns
    /// [`EaseError::UnsupportedHook`] for unknown suffixes and for a bare job name, jobs have no
    /// primary handler
    pub fn hook<F, Fut>(&self, address: &str, handler: F) -> Result<(), EaseError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let address = self.parse_address(SubjectKind::Job, address)?;
        self.register_job_handler(&address.name, address.kind, Arc::new(handler))
    }

    /// Registers a hook of job ``name``
    pub fn job_hook<F, Fut>(&self, name: &str, kind: HookKind, handler: F) -> Result<(), EaseError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_job_handler(name, kind, Arc::new(handler))
    }

    /// Registers any [`JobHandler`] as a hook of job ``name``
    pub fn register_job_handler(
        &self,
        name: &str,
        kind: HookKind,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), EaseError> {
        let name = normalize_name(name);
        self.inner
            .registry
            .set_job_hook(&name, kind, handler)
            .inspect_err(|err| tracing::error!("{err}"))?;

        tracing::info!(target: CONFIG_TARGET, "Registering {kind} hook for job \"{name}\"");
        Ok(())
    }

    /// Builds a task runner with ``factory`` and registers it under ``address`` (which may carry a
    /// ``:hook`` suffix like [`Engine::task`]). The factory receives a [`TaskLogger`] bound to the
    /// task and the engine's base directory
    pub fn install<F, H>(&self, address: &str, factory: F) -> Result<(), EaseError>
    where
        F: FnOnce(TaskLogger, &Path) -> H,
        H: TaskHandler,
    {
        let address = self.parse_address(SubjectKind::Task, address)?;
        let handler = factory(TaskLogger::new(&address.name), self.base_dir());
        self.register_task_handler(&address.name, address.kind, Arc::new(handler))
    }

    /// Requests suspension of the running job ``job``, it stops at its next checkpoint
    ///
    /// # Returns
    /// [`EaseError::JobNotFound`] when the job is unknown. Suspending a job that is not running
    /// only logs a warning
    pub fn suspend(&self, job: &str) -> Result<(), EaseError> {
        let name = normalize_name(job);
        if self.inner.registry.job(&name).is_none() {
            tracing::error!("Cannot suspend job \"{name}\" because it doesn't exist!");
            return Err(EaseError::JobNotFound(name));
        }

        match self.inner.active.token(&name) {
            Some(token) => token.suspend(),
            None => tracing::warn!("Job \"{name}\" cannot be suspended because it's inactive!"),
        }

        Ok(())
    }

    /// Whether the current run of ``job`` was asked to suspend, ``false`` when it is not running
    pub fn is_suspended(&self, job: &str) -> bool {
        self.inner
            .active
            .token(&normalize_name(job))
            .is_some_and(|token| token.is_suspended())
    }

    /// Whether ``job`` is currently running
    pub fn is_active(&self, job: &str) -> bool {
        self.inner.active.is_active(&normalize_name(job))
    }

    /// A detached copy of the tasks and options of ``job``
    pub fn info(&self, job: &str) -> Result<JobInfo, EaseError> {
        let name = normalize_name(job);
        self.inner
            .registry
            .job(&name)
            .map(|entry| entry.info())
            .ok_or(EaseError::JobNotFound(name))
    }

    /// Writes a user log line tagged ``[TASK]``
    pub fn log(&self, message: impl Display) {
        tracing::info!(target: TASK_TARGET, "{message}");
    }

    /// Whether the scheduler clock is ticking, i.e. at least one job is scheduled
    pub fn is_clock_active(&self) -> bool {
        self.inner.scheduler.is_active()
    }

    /// Whether ``job`` is registered with the scheduler
    pub fn is_scheduled(&self, job: &str) -> bool {
        self.inner.scheduler.is_scheduled(&normalize_name(job))
    }

    /// Runs ``job`` once right now, without scheduling it and without invoking its error hook on
    /// failure. The job is validated first like in [`Engine::run_jobs`], failing the validation
    /// evicts it
    ///
    /// # Returns
    /// The [`JobOutcome`], [`EaseError::JobNotFound`] for unknown (or evicted) jobs,
    /// [`EaseError::JobValidationFailed`] when the job cannot run and
    /// [`EaseError::JobAlreadyActive`] when the job is running already
    pub async fn run_job(&self, job: &str) -> Result<JobOutcome, EaseError> {
        let name = normalize_name(job);
        if self.inner.registry.job(&name).is_none() {
            return Err(EaseError::JobNotFound(name));
        }

        if let Err(reason) = self.validate_or_evict(&name) {
            return Err(EaseError::JobValidationFailed { job: name, reason });
        }

        run_job(self, &name).await
    }

    /// Removes ``job`` from the scheduler, the clock stops once nothing is scheduled
    pub fn unschedule(&self, job: &str) -> bool {
        let name = normalize_name(job);
        let removed = self.inner.scheduler.unschedule(&name);
        if removed {
            tracing::info!(target: CONFIG_TARGET, "Removed scheduled job \"{name}\"");
        }
        removed
    }

    pub(crate) fn schedule(&self, job: &str, schedule: Schedule) {
        let dispatcher: Arc<dyn JobDispatcher> =
            Arc::new(EngineDispatcher(Arc::downgrade(&self.inner)));
        self.inner.scheduler.schedule(job, schedule, dispatcher);
        tracing::info!(target: CONFIG_TARGET, "Scheduled job \"{job}\" to recur {schedule}");

        if schedule.skips_some_months() {
            tracing::warn!(
                "Job \"{job}\" will not be executed on certain months since schedule day is \"{}\"!",
                schedule_day(&schedule)
            );
        }
    }

    fn parse_address(&self, subject: SubjectKind, address: &str) -> Result<HookAddress, EaseError> {
        HookAddress::parse(subject, address).inspect_err(|err| tracing::error!("{err}"))
    }
}

fn schedule_day(schedule: &Schedule) -> String {
    match schedule.recurrence() {
        Recurrence::Monthly { day } | Recurrence::Weekly { day } => day.to_string(),
        Recurrence::Daily => String::new(),
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Starts scheduled runs on the engine, it holds the engine weakly so the scheduler process
/// never keeps a dropped engine alive
struct EngineDispatcher(Weak<EngineInner>);

impl JobDispatcher for EngineDispatcher {
    fn dispatch(&self, job: String) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };

        let engine = Engine { inner };
        tokio::spawn(async move {
            engine.run_scheduled(&job).await;
        });
    }
}
