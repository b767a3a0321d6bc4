use crate::engine::Engine;
use crate::errors::{EaseError, ErrorChain, JobValidationError, SharedError};
use crate::executor::{JobOutcome, run_job};
use crate::job::JobContext;
use crate::logging::CONFIG_TARGET;
use crate::registry::JobStatus;
use crate::schedule::Schedule;
use crate::task::{HookKind, SubjectKind, hook_error, normalize_name};
use std::sync::Arc;

/// How one requested job fared in a [`Engine::run_jobs`] batch
#[derive(Debug, Clone)]
pub enum JobReport {
    /// The job ran to completion
    Completed,
    /// The job was suspended during its run
    Suspended,
    /// The job is valid but does not run immediately, it only runs on its schedule (if any)
    Deferred,
    /// A run of the job (usually a scheduled one) was still in progress, this run did not start
    Skipped,
    /// No job with that name is registered
    NotFound,
    /// The job failed validation (now or in an earlier batch) and was evicted
    Evicted(JobValidationError),
    /// The job failed, its error hook has been invoked
    Failed(Arc<EaseError>),
}

/// The outcome of a [`Engine::run_jobs`] batch, one entry per requested name in the order the
/// batch settled them (validation failures first, then runs)
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    jobs: Vec<(String, JobReport)>,
}

impl BatchReport {
    fn push(&mut self, job: &str, report: JobReport) {
        self.jobs.push((job.to_string(), report));
    }

    /// The report of the first entry named ``job``
    pub fn get(&self, job: &str) -> Option<&JobReport> {
        let job = normalize_name(job);
        self.jobs
            .iter()
            .find(|(name, _)| *name == job)
            .map(|(_, report)| report)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobReport)> {
        self.jobs.iter().map(|(name, report)| (name.as_str(), report))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether no job of the batch failed, was evicted or was missing
    pub fn is_success(&self) -> bool {
        self.jobs.iter().all(|(_, report)| {
            matches!(
                report,
                JobReport::Completed
                    | JobReport::Suspended
                    | JobReport::Deferred
                    | JobReport::Skipped
            )
        })
    }
}

impl Engine {
    /// Validates, schedules and runs a batch of jobs. Nothing escapes this method, every failure
    /// is logged, handed to the failing job's error hook and recorded in the [`BatchReport`]
    ///
    /// The batch runs in two phases:
    /// 1. Every requested job is looked up and validated, unknown names are skipped. A job failing
    ///    validation is evicted for good, a valid job defining a schedule is scheduled
    /// 2. Every valid job whose options ask to run immediately is run, strictly one after the
    ///    other in the requested order
    ///
    /// # Arguments
    /// - ``jobs`` the names of the jobs to run (case-insensitive)
    /// - ``run_all`` ignores ``jobs`` and takes every registered job in registration order
    pub async fn run_jobs<I, S>(&self, jobs: I, run_all: bool) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let jobs = if run_all {
            self.registry().job_names()
        } else {
            jobs.into_iter()
                .map(|job| normalize_name(job.as_ref()))
                .collect()
        };

        let mut report = BatchReport::default();
        let mut candidates = Vec::with_capacity(jobs.len());

        for job in jobs {
            match self.registry().job_status(&job) {
                None => {
                    tracing::error!("Job \"{job}\" not found!");
                    report.push(&job, JobReport::NotFound);
                    continue;
                }
                Some(JobStatus::Evicted(reason)) => {
                    tracing::error!("Job \"{job}\" was evicted and will not run! {reason}");
                    report.push(&job, JobReport::Evicted(reason));
                    continue;
                }
                Some(JobStatus::Registered) => {}
            }

            match self.validate_or_evict(&job) {
                Ok(schedule) => {
                    if let Some(schedule) = schedule {
                        self.schedule(&job, schedule);
                    }
                    candidates.push(job);
                }
                Err(reason) => report.push(&job, JobReport::Evicted(reason)),
            }
        }

        for job in candidates {
            let run_immediately = self
                .registry()
                .job(&job)
                .is_some_and(|entry| entry.options().run_immediately);

            if !run_immediately {
                report.push(&job, JobReport::Deferred);
                continue;
            }

            let outcome = match run_job(self, &job).await {
                Ok(JobOutcome::Completed) => JobReport::Completed,
                Ok(JobOutcome::Suspended) => JobReport::Suspended,
                Err(EaseError::JobAlreadyActive(_)) => {
                    tracing::warn!("Job \"{job}\" is still running, skipping this run!");
                    JobReport::Skipped
                }
                Err(err) => {
                    let err = Arc::new(err);
                    self.handle_job_failure(&job, err.clone()).await;
                    JobReport::Failed(err)
                }
            };
            report.push(&job, outcome);
        }

        report
    }

    /// Checks that ``job`` can run, a job failing the check is evicted for good and removed from
    /// the scheduler
    ///
    /// # Returns
    /// The validated [`Schedule`] when the job defines one, otherwise the reason of the eviction
    pub(crate) fn validate_or_evict(
        &self,
        job: &str,
    ) -> Result<Option<Schedule>, JobValidationError> {
        self.registry().validate_job(job).inspect_err(|reason| {
            let error = EaseError::JobValidationFailed {
                job: job.to_string(),
                reason: reason.clone(),
            };
            tracing::error!("{error}");
            self.registry().evict(job, reason.clone());
            if self.scheduler().unschedule(job) {
                tracing::info!(target: CONFIG_TARGET, "Removed scheduled job \"{job}\"");
            }
        })
    }

    /// Runs a job triggered by the scheduler, a run still in progress from an earlier trigger
    /// makes this one skip
    pub(crate) async fn run_scheduled(&self, job: &str) {
        if self.active_jobs().is_active(job) {
            tracing::warn!("Job \"{job}\" is still running, skipping its scheduled run!");
            return;
        }

        tracing::info!("Running scheduled job \"{job}\"...");
        match run_job(self, job).await {
            Ok(_) => {}
            Err(EaseError::JobAlreadyActive(_)) => {
                tracing::warn!("Job \"{job}\" is still running, skipping its scheduled run!");
            }
            Err(err) => self.handle_job_failure(job, Arc::new(err)).await,
        }
    }

    /// Logs a job failure and hands it to the job's error hook, a failure of the hook itself is
    /// only logged
    async fn handle_job_failure(&self, job: &str, error: Arc<EaseError>) {
        tracing::error!(
            "Job \"{job}\" has failed due to an error:\n{}",
            ErrorChain(error.as_ref())
        );

        let Some(hook) = self
            .registry()
            .job(job)
            .and_then(|entry| entry.hooks.get(HookKind::Error))
        else {
            return;
        };

        tracing::info!("Running error hook of job \"{job}\"...");
        let cause: SharedError = error;
        let ctx = JobContext::new(self.clone(), Arc::from(job)).with_error(cause);
        if let Err(err) = hook.handle(ctx).await {
            let err = hook_error(SubjectKind::Job, job, HookKind::Error, err);
            tracing::error!("{}", ErrorChain(&err));
        }
    }
}
