pub mod system_clock; // skipcq: RS-D1001

pub mod virtual_clock; // skipcq: RS-D1001

use std::fmt::Debug;
use std::ops::Deref;
pub use system_clock::SystemClock;
pub use virtual_clock::VirtualClock;

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

#[allow(unused_imports)]
use crate::scheduler::JobScheduler;

/// [`SchedulerClock`] is the time source the [`JobScheduler`] ticks against. Typical operations
/// include getting the current time and idling until a specific point in time is reached
///
/// # Required Methods
/// When implementing the [`SchedulerClock`], one must provide implementations for two methods, those
/// being [`SchedulerClock::now`] and [`SchedulerClock::idle_to`], the former is used to read the
/// wall-clock instant a tick evaluates recurrences against while the latter is used to sleep until
/// the next tick boundary
///
/// # Trait Implementation(s)
/// There are 2 implementations to list, those being:
///
/// - [`VirtualClock`] used to simulate time (for tests and debugging), it doesn't go forward
///   without explicit advancing and implements the [`AdvanceableScheduleClock`] trait as well
///
/// - [`SystemClock`] the default clock, it follows the operating system's wall clock and cannot be
///   advanced by hand
///
/// # See Also
/// - [`VirtualClock`]
/// - [`SystemClock`]
/// - [`AdvanceableScheduleClock`]
#[async_trait]
pub trait SchedulerClock: Debug + Send + Sync + 'static {
    /// Gets the current time of the clock
    ///
    /// # Returns
    /// The current time of the clock represented as [`SystemTime`], the scheduler converts it to
    /// local time before matching recurrences
    async fn now(&self) -> SystemTime;

    /// Idle until this specified time is reached (if it is in the past or present, it doesn't idle)
    ///
    /// # Arguments
    /// It accepts a ``to`` parameter, the point in time to reach by idling around
    async fn idle_to(&self, to: SystemTime);
}

#[async_trait]
impl<T> SchedulerClock for T
where
    T: Deref + Send + Sync + Debug + 'static,
    T::Target: SchedulerClock,
{
    async fn now(&self) -> SystemTime {
        self.deref().now().await
    }

    async fn idle_to(&self, to: SystemTime) {
        self.deref().idle_to(to).await
    }
}

/// [`AdvanceableScheduleClock`] is an optional extension to [`SchedulerClock`] which allows for
/// arbitrary advancement of time. [`SystemClock`] cannot support it, as such why it is an
/// optional trait
///
/// # Required Methods
/// One has to implement [`AdvanceableScheduleClock::advance_to`], [`AdvanceableScheduleClock::advance`]
/// is derived from it
///
/// # See Also
/// - [`SchedulerClock`]
/// - [`VirtualClock`]
#[async_trait]
pub trait AdvanceableScheduleClock: SchedulerClock {
    /// Advance the time by a specified duration forward
    async fn advance(&self, duration: Duration) {
        let now = self.now().await;
        self.advance_to(now + duration).await
    }

    /// Advance the time to a specified point, waking anything idling on the clock
    async fn advance_to(&self, to: SystemTime);
}

#[async_trait]
impl<T> AdvanceableScheduleClock for T
where
    T: Deref + Send + Sync + Debug + 'static,
    T::Target: AdvanceableScheduleClock,
{
    async fn advance(&self, duration: Duration) {
        self.deref().advance(duration).await
    }

    async fn advance_to(&self, to: SystemTime) {
        self.deref().advance_to(to).await
    }
}
