use crate::clock::{AdvanceableScheduleClock, SchedulerClock};
use crate::utils::{date_time_to_system_time, system_time_to_date_time};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

#[allow(unused_imports)]
use crate::clock::SystemClock;

/// [`VirtualClock`] is an implementation of the [`SchedulerClock`] trait, it acts as a mock object,
/// allowing to simulate time without the waiting around. This is what the recurrence tests drive the
/// scheduler with: the clock sits on a chosen local date and only moves when told to
///
/// # Constructor(s)
/// - [`VirtualClock::new`] For creating one based on an initial [`SystemTime`]
/// - [`VirtualClock::from_value`] For creating one from milliseconds since the UNIX Epoch
/// - [`VirtualClock::from_local`] For creating one at a local wall-clock date and time
/// - [`VirtualClock::from_current_time`] For creating one based on the current time
/// - [`VirtualClock::from_epoch`] For creating one at the UNIX Epoch
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use ease::clock::{AdvanceableScheduleClock, SchedulerClock, VirtualClock};
///
/// let clock = VirtualClock::from_value(0);
/// clock.advance(Duration::from_secs(1)).await;
/// assert_eq!(clock.now().await, UNIX_EPOCH + Duration::from_secs(1));
/// ```
///
/// # See Also
/// - [`SystemClock`]
/// - [`AdvanceableScheduleClock`]
/// - [`SchedulerClock`]
pub struct VirtualClock {
    current_time: AtomicI64,
    notify: Notify,
}

impl Debug for VirtualClock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClock")
            .field(
                "current_time",
                &system_time_to_date_time(millis_to_system_time(
                    self.current_time.load(Ordering::SeqCst),
                )),
            )
            .finish()
    }
}

fn system_time_to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(dur) => dur.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

fn millis_to_system_time(millis: i64) -> SystemTime {
    if millis >= 0 {
        UNIX_EPOCH + Duration::from_millis(millis as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(millis.unsigned_abs())
    }
}

impl VirtualClock {
    /// Creates a new [`VirtualClock`] set to ``initial_time``
    pub fn new(initial_time: SystemTime) -> Self {
        VirtualClock::from_value(system_time_to_millis(initial_time))
    }

    /// Creates a new [`VirtualClock`] from a value in **total milliseconds** since the UNIX Epoch
    pub fn from_value(initial_value: i64) -> Self {
        VirtualClock {
            current_time: AtomicI64::new(initial_value),
            notify: Notify::new(),
        }
    }

    /// Creates a new [`VirtualClock`] set to a local wall-clock date and time. Ambiguous local
    /// times (DST fold) resolve to the earliest instant
    pub fn from_local(local: NaiveDateTime) -> Self {
        Self::new(local_to_system_time(local))
    }

    pub fn from_current_time() -> Self {
        Self::new(SystemTime::now())
    }

    pub fn from_epoch() -> Self {
        Self::new(UNIX_EPOCH)
    }

    /// Advances the clock to a local wall-clock date and time
    pub async fn advance_to_local(&self, local: NaiveDateTime) {
        self.advance_to(local_to_system_time(local)).await
    }
}

fn local_to_system_time(local: NaiveDateTime) -> SystemTime {
    match Local.from_local_datetime(&local).earliest() {
        Some(dt) => date_time_to_system_time(dt),
        // Skipped by a DST gap, treat the wall-clock value as UTC
        None => date_time_to_system_time(local.and_utc()),
    }
}

#[async_trait]
impl AdvanceableScheduleClock for VirtualClock {
    async fn advance_to(&self, to: SystemTime) {
        self.current_time
            .store(system_time_to_millis(to), Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl SchedulerClock for VirtualClock {
    async fn now(&self) -> SystemTime {
        millis_to_system_time(self.current_time.load(Ordering::SeqCst))
    }

    async fn idle_to(&self, to: SystemTime) {
        loop {
            // Register interest before reading the time, an advance landing in between would
            // otherwise be missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.now().await >= to {
                return;
            }

            notified.await;
        }
    }
}
