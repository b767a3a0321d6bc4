use crate::errors::{EaseError, JobValidationError};
use crate::job::{JobHandler, JobInfo, JobOptions};
use crate::schedule::Schedule;
use crate::task::{HookKind, HookSet, SubjectKind, TaskHandler};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[allow(unused_imports)]
use crate::engine::Engine;

/// A registered task, a task without a runner is a placeholder created by registering one of
/// its hooks first
#[derive(Clone, Default)]
pub struct TaskEntry {
    pub(crate) runner: Option<Arc<dyn TaskHandler>>,
    pub(crate) hooks: HookSet<dyn TaskHandler>,
}

impl TaskEntry {
    pub fn has_runner(&self) -> bool {
        self.runner.is_some()
    }
}

/// Whether a job is usable or has been evicted by a failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Registered,
    Evicted(JobValidationError),
}

#[derive(Clone)]
pub struct JobEntry {
    pub(crate) tasks: Vec<String>,
    pub(crate) options: JobOptions,
    pub(crate) hooks: HookSet<dyn JobHandler>,
    pub(crate) status: JobStatus,
    seq: u64,
}

impl JobEntry {
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            tasks: self.tasks.clone(),
            options: self.options.clone(),
        }
    }
}

/// What [`Registry::upsert_job`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRegistration {
    Created,
    Updated,
}

/// [`Registry`] maps (lower-cased) names to task and job definitions. It is owned by the
/// [`Engine`] and holds no logic beyond storage and the validation the batch runner asks for
///
/// Every accessor hands out clones of the entries, no map guard outlives a method call so
/// handlers can re-enter the [`Engine`] while they run
#[derive(Default)]
pub struct Registry {
    tasks: DashMap<String, TaskEntry>,
    jobs: DashMap<String, JobEntry>,
    next_seq: AtomicU64,
}

impl Registry {
    /// Stores ``handler`` as the runner ([`HookKind::Primary`]) or as a hook of task ``name``,
    /// creating the task entry on first use
    pub fn set_task_handler(&self, name: &str, kind: HookKind, handler: Arc<dyn TaskHandler>) {
        let mut entry = self.tasks.entry(name.to_string()).or_default();
        if kind == HookKind::Primary {
            entry.runner = Some(handler);
        } else {
            entry.hooks.set(kind, handler);
        }
    }

    pub fn task(&self, name: &str) -> Option<TaskEntry> {
        self.tasks.get(name).map(|entry| entry.value().clone())
    }

    /// Registers or updates job ``name``
    ///
    /// # Arguments
    /// - ``tasks`` the ordered task names, replacing the current list unless empty
    /// - ``options`` replaces the current options wholesale when given
    ///
    /// # Returns
    /// Whether the job was created or updated, or an error when a referenced task is missing
    /// or has no runner, when a new job has no tasks, or when the name was evicted
    pub fn upsert_job(
        &self,
        name: &str,
        tasks: Vec<String>,
        options: Option<JobOptions>,
    ) -> Result<JobRegistration, EaseError> {
        for task in &tasks {
            match self.tasks.get(task) {
                None => return Err(EaseError::TaskNotFound(task.clone())),
                Some(entry) if !entry.has_runner() => {
                    return Err(EaseError::MissingRunner(task.clone()));
                }
                Some(_) => {}
            }
        }

        if let Some(mut entry) = self.jobs.get_mut(name) {
            if matches!(entry.status, JobStatus::Evicted(_)) {
                return Err(EaseError::JobEvicted(name.to_string()));
            }
            if !tasks.is_empty() {
                entry.tasks = tasks;
            }
            if let Some(options) = options {
                entry.options = options;
            }
            return Ok(JobRegistration::Updated);
        }

        if tasks.is_empty() {
            return Err(EaseError::JobValidationFailed {
                job: name.to_string(),
                reason: JobValidationError::NoTasks,
            });
        }

        self.jobs.insert(
            name.to_string(),
            JobEntry {
                tasks,
                options: options.unwrap_or_default(),
                hooks: HookSet::default(),
                status: JobStatus::Registered,
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            },
        );

        Ok(JobRegistration::Created)
    }

    /// Stores ``handler`` as a hook of job ``name``, creating an empty job entry when absent
    pub fn set_job_hook(
        &self,
        name: &str,
        kind: HookKind,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), EaseError> {
        if kind == HookKind::Primary {
            return Err(EaseError::UnsupportedHook {
                subject: SubjectKind::Job,
                name: name.to_string(),
                hook: kind.to_string(),
            });
        }

        let mut entry = self.jobs.entry(name.to_string()).or_insert_with(|| JobEntry {
            tasks: Vec::new(),
            options: JobOptions::default(),
            hooks: HookSet::default(),
            status: JobStatus::Registered,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
        });

        if matches!(entry.status, JobStatus::Evicted(_)) {
            return Err(EaseError::JobEvicted(name.to_string()));
        }

        entry.hooks.set(kind, handler);
        Ok(())
    }

    /// A snapshot of job ``name``, evicted jobs are not visible
    pub fn job(&self, name: &str) -> Option<JobEntry> {
        self.jobs
            .get(name)
            .filter(|entry| entry.status == JobStatus::Registered)
            .map(|entry| entry.value().clone())
    }

    pub fn job_status(&self, name: &str) -> Option<JobStatus> {
        self.jobs.get(name).map(|entry| entry.status.clone())
    }

    /// Names of every job still registered, in registration order
    pub fn job_names(&self) -> Vec<String> {
        let mut jobs = self
            .jobs
            .iter()
            .filter(|entry| entry.status == JobStatus::Registered)
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect::<Vec<_>>();

        jobs.sort_unstable_by_key(|(seq, _)| *seq);
        jobs.into_iter().map(|(_, name)| name).collect()
    }

    /// Moves job ``name`` into the evicted state, its tasks and hooks are released
    pub fn evict(&self, name: &str, reason: JobValidationError) {
        if let Some(mut entry) = self.jobs.get_mut(name) {
            entry.tasks.clear();
            entry.hooks = HookSet::default();
            entry.status = JobStatus::Evicted(reason);
        }
    }

    /// Checks that job ``name`` can run: it has at least one task, every task exists and has a
    /// runner and its schedule (if any) is well-formed
    ///
    /// # Returns
    /// The validated [`Schedule`] when the job defines one
    pub fn validate_job(&self, name: &str) -> Result<Option<Schedule>, JobValidationError> {
        let Some(job) = self.job(name) else {
            return Ok(None);
        };

        if job.tasks.is_empty() {
            return Err(JobValidationError::NoTasks);
        }

        for task in &job.tasks {
            match self.tasks.get(task) {
                None => return Err(JobValidationError::UnknownTask(task.clone())),
                Some(entry) if !entry.has_runner() => {
                    return Err(JobValidationError::TaskWithoutRunner(task.clone()));
                }
                Some(_) => {}
            }
        }

        job.options
            .schedule
            .as_ref()
            .map(Schedule::try_from)
            .transpose()
    }
}
