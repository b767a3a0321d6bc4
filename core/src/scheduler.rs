use crate::clock::SchedulerClock;
use crate::schedule::Schedule;
use crate::utils::{local_second, next_second};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[allow(unused_imports)]
use crate::engine::Engine;

/// [`JobDispatcher`] receives the names of scheduled jobs that are due. The [`JobScheduler`] never
/// runs a job itself, it only hands the name over, and the dispatcher is expected to start the
/// run without waiting for it so the ticker is never held up
pub trait JobDispatcher: Send + Sync + 'static {
    fn dispatch(&self, job: String);
}

impl<F> JobDispatcher for F
where
    F: Fn(String) + Send + Sync + 'static,
{
    fn dispatch(&self, job: String) {
        self(job)
    }
}

struct SchedulerProcess {
    ticker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl SchedulerProcess {
    fn abort(self) {
        self.ticker.abort();
        self.dispatcher.abort();
    }
}

/// [`JobScheduler`] owns the set of scheduled jobs and the ticking process evaluating it. The
/// process consists of two tokio tasks:
///
/// 1. The ticker, which wakes at every whole second of the [`SchedulerClock`], matches every
///    scheduled [`Schedule`] against the local wall-clock second and sends the names of the due
///    jobs through an ``mpsc`` channel. A second is never evaluated twice.
/// 2. The dispatcher, which forwards every name it receives to the [`JobDispatcher`].
///
/// The process starts lazily with the first scheduled job and stops once the last one is
/// unscheduled (or the [`JobScheduler`] is dropped)
///
/// # See Also
/// - [`Schedule`]
/// - [`SchedulerClock`]
/// - [`Engine`]
pub struct JobScheduler {
    clock: Arc<dyn SchedulerClock>,
    scheduled: Arc<DashMap<String, Schedule>>,
    process: Mutex<Option<SchedulerProcess>>,
}

impl Debug for JobScheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("clock", &self.clock)
            .field("scheduled", &self.scheduled.len())
            .field("active", &self.is_active())
            .finish()
    }
}

impl JobScheduler {
    pub fn new(clock: Arc<dyn SchedulerClock>) -> Self {
        Self {
            clock,
            scheduled: Arc::new(DashMap::new()),
            process: Mutex::new(None),
        }
    }

    pub fn clock(&self) -> &Arc<dyn SchedulerClock> {
        &self.clock
    }

    fn process(&self) -> MutexGuard<'_, Option<SchedulerProcess>> {
        self.process.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedules (or re-schedules) ``job``, starting the ticking process if it is not running.
    /// Must be called from within a tokio runtime
    ///
    /// # Returns
    /// ``true`` when the job was not scheduled before
    pub fn schedule(
        &self,
        job: &str,
        schedule: Schedule,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> bool {
        let added = self.scheduled.insert(job.to_string(), schedule).is_none();

        let mut process = self.process();
        if process.is_none() {
            *process = Some(self.spawn(dispatcher));
        }

        added
    }

    /// Removes ``job`` from the scheduled set, stopping the ticking process when nothing is
    /// scheduled anymore
    ///
    /// # Returns
    /// ``true`` when the job was scheduled
    pub fn unschedule(&self, job: &str) -> bool {
        let removed = self.scheduled.remove(job).is_some();
        if self.scheduled.is_empty() {
            self.abort();
        }
        removed
    }

    pub fn is_scheduled(&self, job: &str) -> bool {
        self.scheduled.contains_key(job)
    }

    /// Whether the ticking process is running
    pub fn is_active(&self) -> bool {
        self.process().is_some()
    }

    /// Stops the ticking process, the scheduled set is kept
    pub fn abort(&self) {
        if let Some(process) = self.process().take() {
            process.abort();
            tracing::debug!("Scheduler clock stopped");
        }
    }

    fn spawn(&self, dispatcher: Arc<dyn JobDispatcher>) -> SchedulerProcess {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let clock = self.clock.clone();
        let scheduled = self.scheduled.clone();

        let ticker = tokio::spawn(async move {
            let mut last: Option<NaiveDateTime> = None;
            loop {
                let now = clock.now().await;
                let second = local_second(now);

                if last != Some(second) {
                    last = Some(second);
                    let due = scheduled
                        .iter()
                        .filter(|entry| entry.value().matches(&second))
                        .map(|entry| entry.key().clone())
                        .collect::<Vec<_>>();

                    for job in due {
                        if tx.send(job).is_err() {
                            return;
                        }
                    }
                }

                clock.idle_to(next_second(now)).await;
            }
        });

        let dispatcher = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                dispatcher.dispatch(job);
            }
        });

        tracing::debug!("Scheduler clock started");
        SchedulerProcess { ticker, dispatcher }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        if let Some(process) = self
            .process
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            process.abort();
        }
    }
}
