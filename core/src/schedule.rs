pub mod constant; // skipcq: RS-D1001

pub mod cron; // skipcq: RS-D1001

pub use crate::schedule::constant::ConstantSchedule;
pub use crate::schedule::cron::CronSchedule;

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Debug;
use std::ops::Deref;

#[allow(unused_imports)]
use crate::listener::TimerListener;

/// The [`TimerSchedule`] trait is the strategy that decides *when* a timer
/// fires: given a UTC instant and a named civil time zone it returns the next
/// occurrence, again in UTC. This system is used closely by the
/// [`TimerListener`] and the [`ScheduleMonitor`]
///
/// # Required Method(s)
/// If one wants to implement this trait, they must provide an implementation
/// for the [`TimerSchedule::next_after`] method used to calculate the next
/// occurrence strictly after a given instant
///
/// # Trait Implementation(s)
/// some of the noteworthy implementations of this trait include:
/// - [`ConstantSchedule`] fires on a fixed, strictly positive period and
///   ignores the time zone entirely
/// - [`CronSchedule`] fires per a six-field cron expression evaluated over
///   civil time in the supplied zone, mapping skipped and repeated
///   daylight-saving hours back to unambiguous UTC instants
///
/// This trait is also implemented for any type implementing ``Deref`` where
/// the target is ``T`` which itself is an implementation of the
/// [`TimerSchedule`] trait, making it relatively easy to store both owned and
/// non-owned values
///
/// # Purity
/// Implementations perform no I/O and no mutation; `next_after` is safe for
/// concurrent calls from any number of listeners
///
/// # Object Safety
/// This trait is object safe to use, as seen in the source code of the
/// [`TimerListener`] struct
///
/// # See Also
/// - [`ConstantSchedule`]
/// - [`CronSchedule`]
/// - [`TimerListener`]
/// - [`ScheduleMonitor`]
///
/// [`ScheduleMonitor`]: crate::monitor::ScheduleMonitor
pub trait TimerSchedule: Debug + Send + Sync {
    /// Calculates the next occurrence of this schedule strictly after
    /// ``now_utc``, evaluated in the civil time zone ``tz``
    ///
    /// # Arguments
    /// It accepts the UTC instant ``now_utc`` used as the exclusive lower
    /// bound, and the zone ``tz`` in which civil-time arithmetic happens
    ///
    /// # Returns
    /// A ``Result<DateTime<Utc>, ScheduleError>`` which when successful
    /// returns the next occurrence, guaranteed to be strictly greater than
    /// ``now_utc``
    ///
    /// # See Also
    /// - [`TimerSchedule::next_occurrences`]
    fn next_after(&self, now_utc: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>, ScheduleError>;

    /// Calculates the next ``count`` occurrences by iterating
    /// [`TimerSchedule::next_after`] forward, feeding each result back as the
    /// new lower bound. The returned instants are strictly increasing
    fn next_occurrences(
        &self,
        count: usize,
        now_utc: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        let mut occurrences = Vec::with_capacity(count);
        let mut cursor = now_utc;
        for _ in 0..count {
            cursor = self.next_after(cursor, tz)?;
            occurrences.push(cursor);
        }
        Ok(occurrences)
    }
}

impl<T> TimerSchedule for T
where
    T: Deref + Debug + Send + Sync,
    T::Target: TimerSchedule,
{
    fn next_after(&self, now_utc: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>, ScheduleError> {
        self.deref().next_after(now_utc, tz)
    }
}
