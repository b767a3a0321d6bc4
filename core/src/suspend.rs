use crate::errors::EaseError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[allow(unused_imports)]
use crate::engine::Engine;

/// [`SuspendToken`] is a cooperative cancellation flag scoped to a single job run or to a single
/// task invocation. A fresh token is created for each of them, so a suspension never leaks into
/// a later run
///
/// Clones share the same flag, the executors keep one clone while contexts and the active-job
/// set hold the others
#[derive(Debug, Clone, Default)]
pub struct SuspendToken(Arc<AtomicBool>);

impl SuspendToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests suspension, it is observed at the next checkpoint of the executor
    pub fn suspend(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// [`ActiveJobs`] is the set of job names currently inside a job run, each mapped to the
/// [`SuspendToken`] of that run. [`Engine::suspend`] reaches running jobs through it
///
/// # See Also
/// - [`ActiveJobGuard`]
/// - [`SuspendToken`]
#[derive(Debug, Clone, Default)]
pub struct ActiveJobs(Arc<DashMap<String, SuspendToken>>);

impl ActiveJobs {
    /// Marks ``job`` as active for the lifetime of the returned guard
    ///
    /// # Returns
    /// An [`ActiveJobGuard`] which releases the slot when dropped, or
    /// [`EaseError::JobAlreadyActive`] when a run of the same job is still going
    pub fn acquire(&self, job: &str) -> Result<ActiveJobGuard, EaseError> {
        match self.0.entry(job.to_string()) {
            Entry::Occupied(_) => Err(EaseError::JobAlreadyActive(job.to_string())),
            Entry::Vacant(slot) => {
                let token = SuspendToken::new();
                slot.insert(token.clone());
                Ok(ActiveJobGuard {
                    jobs: self.0.clone(),
                    job: job.to_string(),
                    token,
                })
            }
        }
    }

    /// The token of the active run of ``job``, if there is one
    pub fn token(&self, job: &str) -> Option<SuspendToken> {
        self.0.get(job).map(|entry| entry.value().clone())
    }

    pub fn is_active(&self, job: &str) -> bool {
        self.0.contains_key(job)
    }
}

/// Scoped ownership of an active-job slot, dropping it (on success, suspension, failure or
/// cancellation alike) removes the job from the [`ActiveJobs`] set
#[derive(Debug)]
pub struct ActiveJobGuard {
    jobs: Arc<DashMap<String, SuspendToken>>,
    job: String,
    token: SuspendToken,
}

impl ActiveJobGuard {
    pub fn token(&self) -> &SuspendToken {
        &self.token
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        self.jobs.remove(&self.job);
    }
}
