use crate::clock::SchedulerClock;
use crate::utils::system_time_to_date_time;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::time::SystemTime;

#[allow(unused_imports)]
use crate::clock::VirtualClock;

/// [`SystemClock`] reads the operating system's wall clock, it is what an [`crate::engine::Engine`]
/// ticks against unless a [`VirtualClock`] is configured. It cannot be advanced by hand
///
/// Tokio timers run on the monotonic clock while recurrences are matched against the wall clock,
/// so [`SystemClock::idle_to`] re-reads the wall clock after every sleep and keeps sleeping until
/// the target instant is really reached. A wall clock stepped backwards (NTP, manual change)
/// therefore never makes the scheduler evaluate a second early
///
/// # See Also
/// - [`VirtualClock`]
/// - [`SchedulerClock`]
#[derive(Default, Clone, Copy)]
pub struct SystemClock;

impl Debug for SystemClock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SystemClock({})", system_time_to_date_time(SystemTime::now()))
    }
}

#[async_trait]
impl SchedulerClock for SystemClock {
    async fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn idle_to(&self, to: SystemTime) {
        while let Ok(remaining) = to.duration_since(SystemTime::now()) {
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(remaining).await;
        }
    }
}
