pub mod system_clock; // skipcq: RS-D1001

pub mod virtual_clock; // skipcq: RS-D1001

pub use system_clock::SystemClock;
pub use virtual_clock::VirtualClock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::ops::Deref;
use std::time::Duration;

/// The [`TimerClock`] trait supplies the [`TimerListener`] with the current
/// UTC instant and with the ability to idle until an armed interval elapses.
/// Splitting this out of the listener keeps every timing decision
/// deterministic under test: swap [`SystemClock`] for [`VirtualClock`] and
/// the whole state machine runs on manually advanced time
///
/// [`TimerListener`]: crate::listener::TimerListener
#[async_trait]
pub trait TimerClock: 'static + Send + Sync {
    /// The current UTC instant
    async fn now(&self) -> DateTime<Utc>;

    /// Suspends until ``duration`` has elapsed on this clock
    async fn idle_for(&self, duration: Duration);
}

#[async_trait]
impl<T> TimerClock for T
where
    T: Deref + Send + Sync + 'static,
    T::Target: TimerClock,
{
    async fn now(&self) -> DateTime<Utc> {
        self.deref().now().await
    }

    async fn idle_for(&self, duration: Duration) {
        self.deref().idle_for(duration).await
    }
}

/// A [`TimerClock`] whose time can be moved forward explicitly, for tests
/// and simulations
#[async_trait]
pub trait AdvanceableTimerClock: TimerClock {
    /// Moves the clock forward by ``duration``, releasing idlers whose
    /// target has been reached
    async fn advance(&self, duration: Duration);

    /// Moves the clock forward to ``to``. Moving backwards is not supported
    async fn advance_to(&self, to: DateTime<Utc>);
}

#[async_trait]
impl<T> AdvanceableTimerClock for T
where
    T: Deref + Send + Sync + 'static,
    T::Target: AdvanceableTimerClock,
{
    async fn advance(&self, duration: Duration) {
        self.deref().advance(duration).await
    }

    async fn advance_to(&self, to: DateTime<Utc>) {
        self.deref().advance_to(to).await
    }
}
