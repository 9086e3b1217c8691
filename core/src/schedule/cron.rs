use crate::errors::ScheduleError;
use crate::schedule::TimerSchedule;
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Ambiguous fall-back candidates of a schedule whose following occurrence is
/// closer than this many civil hours get both UTC interpretations emitted;
/// rarer schedules get only the earlier one. The cutoff is observable
/// behavior in repeated hours and must stay at exactly four
const AMBIGUOUS_FREQUENT_CUTOFF_HOURS: i64 = 4;

/// [`CronSchedule`] is an implementation of the [`TimerSchedule`] trait that
/// produces occurrences according to a six-field cron expression
/// ``sec min hour dom mon dow``, evaluated over *civil time* in the zone
/// handed to [`CronSchedule::next_after`] and then mapped back to UTC. Learn
/// more about cron expressions in
/// [Wikipedia](https://en.wikipedia.org/wiki/Cron)
///
/// # Implementation Detail(s)
/// Under the hood, this uses the crate ``cron`` to parse the expression and
/// enumerate candidate occurrences. The candidates are enumerated in naive
/// civil time (the iterator runs over a ``Utc``-tagged copy of the local wall
/// time, which keeps it monotonic) and each candidate is mapped to UTC
/// through the real zone, which is where daylight-saving transitions are
/// resolved:
/// - a candidate inside a skipped spring-forward hour fires at the UTC that
///   ``candidate + 1h`` maps to
/// - a candidate inside a repeated fall-back hour fires at both UTC
///   interpretations when the schedule runs more often than once per four
///   civil hours, otherwise only at the earlier one
///
/// The returned occurrence is the smallest mapped UTC instant strictly after
/// the lower bound
///
/// # Construction
/// When constructing [`CronSchedule`], the only way to do so is via
/// [`CronSchedule::parse`] which requires a cron expression as a string.
/// Classic five-field expressions are accepted and normalized by prepending a
/// ``0`` seconds field
///
/// # Examples
///
/// ```ignore
/// use duratimer_core::schedule::CronSchedule;
///
/// // Run at minute 30 of every hour
/// let schedule = CronSchedule::parse("0 30 * * * *")?;
///
/// // Run every day at 01:30:00
/// let schedule = CronSchedule::parse("0 30 1 * * *")?;
/// ```
///
/// # Trait Implementation(s)
/// Apart from implementing [`TimerSchedule`], [`CronSchedule`] also
/// implements the [`Debug`] trait, the [`Clone`] trait, the [`Eq`] trait and
/// subsequently the [`PartialEq`] trait, plus [`Display`] which renders the
/// original textual form
///
/// # See also
/// - [`ConstantSchedule`]
/// - [`TimerSchedule`]
///
/// [`ConstantSchedule`]: crate::schedule::ConstantSchedule
/// [`Debug`]: std::fmt::Debug
#[derive(Debug, Clone)]
pub struct CronSchedule {
    inner: Schedule,
    expression: String,
}

impl CronSchedule {
    /// Parses a cron expression into a [`CronSchedule`]. Six
    /// whitespace-separated fields ``sec min hour dom mon dow`` with ranges
    /// (``1-5``), lists (``1,3,5``), steps (``*/15``) and wildcards (``*``);
    /// five-field classic expressions get a ``0`` seconds field prepended
    ///
    /// # Returns
    /// The parsed [`CronSchedule`], or
    /// [`ScheduleError::WrongCronFieldCount`] /
    /// [`ScheduleError::InvalidCronExpression`] when the expression does not
    /// parse
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let trimmed = expression.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {trimmed}"),
            6 => trimmed.to_owned(),
            count => return Err(ScheduleError::WrongCronFieldCount(count)),
        };
        let inner = Schedule::from_str(&normalized).map_err(|e| {
            ScheduleError::InvalidCronExpression(expression.to_owned(), e.to_string())
        })?;
        Ok(Self {
            inner,
            expression: expression.to_owned(),
        })
    }

    /// The expression this schedule was parsed from, in its original textual
    /// form
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the occurrence following ``candidate`` is closer than the
    /// four-civil-hour ambiguity cutoff
    fn is_frequent_at(&self, candidate: &NaiveDateTime) -> bool {
        let cursor = Utc.from_utc_datetime(candidate);
        match self.inner.after(&cursor).next() {
            Some(following) => {
                following.naive_utc() - *candidate
                    < TimeDelta::hours(AMBIGUOUS_FREQUENT_CUTOFF_HOURS)
            }
            None => false,
        }
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

impl Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl TimerSchedule for CronSchedule {
    fn next_after(&self, now_utc: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>, ScheduleError> {
        let mut now_local = now_utc.with_timezone(tz).naive_local();

        // A repeated fall-back hour makes local time non-monotonic; starting
        // the enumeration from an ambiguous wall time can produce an
        // occurrence lexicographically earlier than now_utc. Pull the cursor
        // back by the rule's DST delta to the unambiguous earlier point
        if let LocalResult::Ambiguous(earlier, later) = tz.from_local_datetime(&now_local) {
            let dst_delta = later.with_timezone(&Utc) - earlier.with_timezone(&Utc);
            now_local -= dst_delta.abs();
        }

        let mut best: Option<DateTime<Utc>> = None;
        let cursor = Utc.from_utc_datetime(&now_local);
        for candidate in self.inner.after(&cursor) {
            let local = candidate.naive_utc();
            let mut ambiguous = false;

            match tz.from_local_datetime(&local) {
                LocalResult::None => {
                    // Skipped spring-forward hour: one hour of forward shift
                    // resolves every standard DST skip
                    if let Some(utc) = earliest_utc(tz, &(local + TimeDelta::hours(1))) {
                        consider(&mut best, utc, now_utc);
                    }
                }
                LocalResult::Ambiguous(earlier, later) => {
                    ambiguous = true;
                    consider(&mut best, earlier.with_timezone(&Utc), now_utc);
                    if self.is_frequent_at(&local) {
                        consider(&mut best, later.with_timezone(&Utc), now_utc);
                    }
                }
                LocalResult::Single(mapped) => {
                    consider(&mut best, mapped.with_timezone(&Utc), now_utc);
                }
            }

            // Ambiguous candidates must be fully enumerated before the
            // smallest result can be trusted
            if !ambiguous && best.is_some() {
                break;
            }
        }

        best.ok_or_else(|| {
            ScheduleError::NoUpcomingOccurrence(self.expression.clone(), now_utc.to_rfc3339())
        })
    }
}

/// Keeps the smallest candidate strictly greater than the lower bound
fn consider(best: &mut Option<DateTime<Utc>>, candidate: DateTime<Utc>, now_utc: DateTime<Utc>) {
    if candidate > now_utc && best.is_none_or(|held| candidate < held) {
        *best = Some(candidate);
    }
}

fn earliest_utc(tz: &Tz, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(local) {
        LocalResult::Single(mapped) => Some(mapped.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_five_field_expressions() {
        let five = CronSchedule::parse("30 * * * *").unwrap();
        let six = CronSchedule::parse("0 30 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            five.next_after(now, &chrono_tz::UTC).unwrap(),
            six.next_after(now, &chrono_tz::UTC).unwrap()
        );
    }

    #[test]
    fn rejects_wrong_field_counts() {
        assert!(matches!(
            CronSchedule::parse("* * * *"),
            Err(ScheduleError::WrongCronFieldCount(4))
        ));
        assert!(matches!(
            CronSchedule::parse("0 0 0 1 1 * 2020"),
            Err(ScheduleError::WrongCronFieldCount(7))
        ));
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(matches!(
            CronSchedule::parse("0 99 * * * *"),
            Err(ScheduleError::InvalidCronExpression(..))
        ));
    }

    #[test]
    fn display_keeps_original_form() {
        let schedule = CronSchedule::parse("30 * * * *").unwrap();
        assert_eq!(schedule.to_string(), "30 * * * *");
    }
}
