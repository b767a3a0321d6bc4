pub mod job_executor; // skipcq: RS-D1001

pub mod task_executor; // skipcq: RS-D1001

pub use job_executor::run_job;
pub use task_executor::run_task;

use std::fmt::{Display, Formatter};

/// How a single task invocation ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The runner and the after hook ran
    Completed,
    /// The task was suspended from its before hook, its runner did not run
    Skipped,
    /// The owning job was suspended while the task was in progress
    JobSuspended,
}

/// How a job run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Suspended,
}

/// [`JobState`] is the state machine a job run moves through, every transition is logged at
/// ``DEBUG`` level. [`JobState::Suspended`] and [`JobState::Failed`] are terminal like
/// [`JobState::Completed`]
///
/// ```text
/// Pending -> RunningBefore -> RunningTasks -> RunningAfter -> Completed
///                 |                 |               |
///                 +--> Suspended <--+               |
///                 +---------> Failed <--------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    RunningBefore,
    RunningTasks,
    RunningAfter,
    Completed,
    Suspended,
    Failed,
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::RunningBefore => "running before hook",
            JobState::RunningTasks => "running tasks",
            JobState::RunningAfter => "running after hook",
            JobState::Completed => "completed",
            JobState::Suspended => "suspended",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}
