pub mod file; // skipcq: RS-D1001

pub mod memory; // skipcq: RS-D1001

pub use crate::monitor::file::FileScheduleMonitor;
pub use crate::monitor::memory::InMemoryScheduleMonitor;

use crate::errors::MonitorError;
use crate::schedule::TimerSchedule;
use crate::status::{NEVER, ScheduleStatus};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

#[allow(unused_imports)]
use crate::listener::TimerListener;

/// The [`ScheduleMonitor`] trait is the durable half of the scheduler: it
/// persists one [`ScheduleStatus`] per timer so that occurrences survive
/// process restarts, and it owns the past-due calculation the
/// [`TimerListener`] runs on host startup to decide whether a missed
/// occurrence warrants an immediate catch-up invocation
///
/// # Required Method(s)
/// Implementations provide only the two storage operations,
/// [`ScheduleMonitor::get_status`] and [`ScheduleMonitor::update_status`].
/// The past-due calculation is shared logic, not a storage hook:
/// [`ScheduleMonitor::check_past_due`] has a provided body that every
/// implementation inherits, so all monitors agree on what "past due" means
///
/// # Write Semantics
/// A status write is atomic per timer name: a concurrent read never observes
/// a mix of old and new field values. Writes for the same timer are
/// serialized; nothing here coordinates across hosts, so callers sharing a
/// monitor between hosts must guarantee single-writer semantics externally
///
/// # Trait Implementation(s)
/// some of the noteworthy implementations of this trait include:
/// - [`InMemoryScheduleMonitor`] keeps statuses in process memory, for hosts
///   without durable storage and for tests
/// - [`FileScheduleMonitor`] keeps one JSON status document per timer on the
///   local filesystem
///
/// # See Also
/// - [`ScheduleStatus`]
/// - [`TimerListener`]
#[async_trait]
pub trait ScheduleMonitor: Send + Sync {
    /// Loads the persisted status for ``timer_name``, or `None` when the
    /// timer has never been recorded
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, MonitorError>;

    /// Persists ``status`` for ``timer_name``, replacing any previous record
    /// atomically
    async fn update_status(
        &self,
        timer_name: &str,
        status: &ScheduleStatus,
    ) -> Result<(), MonitorError>;

    /// Decides how far past due the timer is at ``now_utc``, persisting
    /// whatever bookkeeping that decision requires. ``last_status`` is the
    /// status the caller just loaded (or `None` for a brand-new timer)
    ///
    /// The calculation is deterministic:
    /// 1. A brand-new timer persists `{NEVER, next(now), now}` and is never
    ///    past due
    /// 2. Otherwise the expected next occurrence derives from `last` when the
    ///    timer has fired, else from `last_updated`, else from ``now_utc``
    /// 3. A stored `next` that disagrees with the expectation means the
    ///    schedule definition changed since the status was written: the
    ///    status is rewritten with `last = NEVER`, and when the expectation
    ///    already lies in the past it is recomputed from ``now_utc`` so a
    ///    changed schedule does not retroactively register as past due
    ///
    /// # Returns
    /// `max(0, now_utc - recorded_next)` for the `next` value as persisted
    /// above
    async fn check_past_due(
        &self,
        timer_name: &str,
        now_utc: DateTime<Utc>,
        tz: &Tz,
        schedule: &dyn TimerSchedule,
        last_status: Option<&ScheduleStatus>,
    ) -> Result<TimeDelta, MonitorError> {
        let recorded_next = match last_status {
            None => {
                let next = schedule.next_after(now_utc, tz)?;
                self.update_status(timer_name, &ScheduleStatus::new(next, now_utc))
                    .await?;
                next
            }
            Some(status) => {
                let (expected_next, last_updated) = if status.has_fired() {
                    (schedule.next_after(status.last, tz)?, status.last)
                } else if status.last_updated != *NEVER {
                    (schedule.next_after(status.last_updated, tz)?, status.last_updated)
                } else {
                    (schedule.next_after(now_utc, tz)?, now_utc)
                };

                if status.next != expected_next {
                    // The schedule definition changed since this status was
                    // written
                    let (expected_next, last_updated) = if now_utc > expected_next {
                        (schedule.next_after(now_utc, tz)?, now_utc)
                    } else {
                        (expected_next, last_updated)
                    };
                    let rewritten = ScheduleStatus {
                        last: *NEVER,
                        next: expected_next,
                        last_updated,
                    };
                    self.update_status(timer_name, &rewritten).await?;
                    expected_next
                } else {
                    status.next
                }
            }
        };

        Ok((now_utc - recorded_next).max(TimeDelta::zero()))
    }
}
