use crate::clock::{AdvanceableTimerClock, TimerClock};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[allow(unused_imports)]
use crate::clock::SystemClock;

/// [`VirtualClock`] is an implementation of the [`TimerClock`] trait whose
/// time only moves when told to, via [`AdvanceableTimerClock::advance`] or
/// [`AdvanceableTimerClock::advance_to`]. Idlers block until an advance
/// carries the clock past their target, which makes listener timing fully
/// deterministic under test
///
/// # Constructor(s)
/// - [`VirtualClock::new`] starts the clock at a given UTC instant
/// - [`VirtualClock::from_epoch`] starts it at the Unix epoch
/// - [`VirtualClock::from_current_time`] starts it at the present wall time
///
/// # See Also
/// - [`SystemClock`]
/// - [`TimerClock`]
/// - [`AdvanceableTimerClock`]
pub struct VirtualClock {
    current_millis: AtomicI64,
    notify: Notify,
}

impl VirtualClock {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        VirtualClock {
            current_millis: AtomicI64::new(initial_time.timestamp_millis()),
            notify: Notify::new(),
        }
    }

    pub fn from_epoch() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }

    pub fn from_current_time() -> Self {
        Self::new(Utc::now())
    }

    fn now_sync(&self) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + TimeDelta::milliseconds(self.current_millis.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl TimerClock for VirtualClock {
    async fn now(&self) -> DateTime<Utc> {
        self.now_sync()
    }

    async fn idle_for(&self, duration: Duration) {
        let target = self.now_sync()
            + TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::milliseconds(i64::MAX));
        loop {
            // Register before the check so an advance that lands in between
            // cannot be missed
            let notified = self.notify.notified();
            if self.now_sync() >= target {
                break;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl AdvanceableTimerClock for VirtualClock {
    async fn advance(&self, duration: Duration) {
        let now = self.now_sync();
        self.advance_to(
            now + TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::milliseconds(i64::MAX)),
        )
        .await
    }

    async fn advance_to(&self, to: DateTime<Utc>) {
        self.current_millis
            .store(to.timestamp_millis(), Ordering::Relaxed);
        self.notify.notify_waiters();
    }
}
