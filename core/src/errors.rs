use crate::task::hooks::{HookKind, SubjectKind};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

#[allow(unused_imports)]
use crate::engine::Engine;

/// The error type user handlers (task runners, task hooks and job hooks) return, anything
/// implementing [`Error`] converts into it through `?`
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The shared form of a handler failure, it is created once per failure so the very same
/// instance reaches the error hook and the wrapping [`EaseError`]
pub type SharedError = Arc<dyn Error + Send + Sync>;

/// The result every user handler resolves to
pub type HandlerResult = Result<(), BoxError>;

/// [`EaseError`] is the main enum that contains all the errors which can be produced by the
/// [`Engine`], it uses under the hood [`thiserror`]. Failures raised by user code are kept as
/// the ``source`` of the corresponding variant, so walking [`Error::source`] always ends at the
/// original failure
///
/// # See Also
/// - [`JobValidationError`]
/// - [`Engine`]
#[derive(Error, Debug)]
pub enum EaseError {
    /// A job references a task name that has never been registered
    #[error("Task \"{0}\" not found!")]
    TaskNotFound(String),

    /// A task was registered with hooks only and never received its primary runner
    #[error("Task \"{0}\" does not have a definition!")]
    MissingRunner(String),

    /// A hook address named a hook kind the subject does not support
    #[error("Unsupported hook name \"{hook}\" for {subject} \"{name}\"")]
    UnsupportedHook {
        subject: SubjectKind,
        name: String,
        hook: String,
    },

    #[error("An error has occurred on the before hook of the task \"{task}\"!")]
    BeforeHookFailed {
        task: String,
        #[source]
        source: SharedError,
    },

    #[error("An error has occurred on the suspend hook of the task \"{task}\"!")]
    SuspendHookFailed {
        task: String,
        #[source]
        source: SharedError,
    },

    #[error("An error has occurred on task \"{task}\"!")]
    RunnerFailed {
        task: String,
        #[source]
        source: SharedError,
    },

    #[error("An error has occurred on the after hook of the task \"{task}\"!")]
    AfterHookFailed {
        task: String,
        #[source]
        source: SharedError,
    },

    #[error("Invalid job options on job \"{job}\"! {reason}")]
    JobValidationFailed {
        job: String,
        reason: JobValidationError,
    },

    #[error("Job \"{0}\" not found!")]
    JobNotFound(String),

    /// The job failed validation during an earlier batch and was evicted for the
    /// rest of the process
    #[error("Job \"{0}\" was evicted after failing validation and cannot be registered again!")]
    JobEvicted(String),

    #[error("Job \"{0}\" is already running!")]
    JobAlreadyActive(String),

    /// A lifecycle hook itself failed. For task error hooks this replaces the failure
    /// that triggered the hook
    #[error("An error has occurred on the {hook} hook of the {subject} \"{name}\"!")]
    HookError {
        subject: SubjectKind,
        name: String,
        hook: HookKind,
        #[source]
        source: SharedError,
    },

    #[error("Failed to set up logging: {0}")]
    Logging(String),
}

/// [`JobValidationError`] lists the reasons a job can be rejected by the validation phase of
/// the batch runner (or by registration for the shape checks that can happen eagerly). A job
/// failing this validation is evicted from the registry
///
/// # See Also
/// - [`EaseError::JobValidationFailed`]
/// - [`crate::schedule::ScheduleOptions`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("Job must have at least one task.")]
    NoTasks,

    #[error("Task \"{0}\" not found.")]
    UnknownTask(String),

    #[error("Task \"{0}\" does not have a definition.")]
    TaskWithoutRunner(String),

    #[error("\"recurrence\" is required.")]
    MissingRecurrence,

    #[error("\"recurrence\" must be one of the following: \"monthly\", \"weekly\", \"daily\" (got \"{0}\").")]
    UnknownRecurrence(String),

    #[error("\"time\" is required.")]
    MissingTime,

    #[error("\"time\" has invalid format (got \"{0}\").")]
    InvalidTime(String),

    #[error("\"day\" is required when recurrence is not daily.")]
    MissingDay,

    #[error("\"day\" must be between 1-7 when recurrence is weekly (got {0}).")]
    WeekDayOutOfRange(i64),

    #[error("\"day\" must be between 1-31 when recurrence is monthly (got {0}).")]
    MonthDayOutOfRange(i64),
}

/// Displays an error followed by every error in its ``source`` chain, one per line
pub struct ErrorChain<'a>(pub &'a (dyn Error + 'static));

impl Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, "\n{err}")?;
            source = err.source();
        }
        Ok(())
    }
}

impl Debug for ErrorChain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
