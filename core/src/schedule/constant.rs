use crate::errors::ScheduleError;
use crate::schedule::TimerSchedule;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::fmt::{self, Display};
use std::time::Duration;

/// [`ConstantSchedule`] is a straightforward implementation of the
/// [`TimerSchedule`] trait that produces occurrences at a fixed, strictly
/// positive period. The period is defined using either a [`TimeDelta`] or a
/// [`Duration`], making it flexible for different time representations. This
/// makes it well-suited for recurring jobs such as periodic cleanup tasks,
/// heartbeat signals, polling operations... etc.
///
/// The time zone handed to [`ConstantSchedule::next_after`] is ignored:
/// `now + period` is the same instant in every zone
///
/// # Constructor(s)
/// When one wants to create a new [`ConstantSchedule`] instance, they can use
/// a variety of constructors, those being:
/// - [`ConstantSchedule::new`] Creates a [`ConstantSchedule`] with a [`TimeDelta`]
/// - [`ConstantSchedule::from_std`] Creates a [`ConstantSchedule`] with a [`Duration`]
/// - [`ConstantSchedule::from_secs`] Creates a [`ConstantSchedule`] with a
///   period number of seconds
/// - [`ConstantSchedule::parse`] Creates a [`ConstantSchedule`] from a
///   ``[d.]hh:mm:ss[.fff]`` duration string as written in trigger declarations
///
/// Every constructor rejects a zero or negative period with
/// [`ScheduleError::NonPositivePeriod`]
///
/// # Examples
/// ```ignore
/// use duratimer_core::schedule::ConstantSchedule;
///
/// // Run every 5 minutes
/// let schedule = ConstantSchedule::parse("00:05:00")?;
///
/// // Run every day and a half
/// let schedule = ConstantSchedule::parse("1.12:00:00")?;
/// ```
///
/// # Trait Implementation(s)
/// Apart from implementing [`TimerSchedule`], [`ConstantSchedule`] also
/// implements the [`Debug`], [`Clone`], [`Copy`], [`Eq`], [`PartialEq`],
/// [`PartialOrd`], [`Ord`] and [`Display`] traits
///
/// # See Also
/// - [`CronSchedule`]
/// - [`TimerSchedule`]
///
/// [`CronSchedule`]: crate::schedule::CronSchedule
/// [`Debug`]: std::fmt::Debug
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct ConstantSchedule(pub(crate) TimeDelta);

impl ConstantSchedule {
    /// Constructs / Creates a new [`ConstantSchedule`] from a chrono
    /// [`TimeDelta`] period
    ///
    /// # Returns
    /// The newly created [`ConstantSchedule`], or
    /// [`ScheduleError::NonPositivePeriod`] when ``period`` is zero or
    /// negative
    pub fn new(period: TimeDelta) -> Result<Self, ScheduleError> {
        if period <= TimeDelta::zero() {
            return Err(ScheduleError::NonPositivePeriod);
        }
        Ok(Self(period))
    }

    /// Constructs / Creates a new [`ConstantSchedule`] from a standard
    /// library [`Duration`] period
    pub fn from_std(period: Duration) -> Result<Self, ScheduleError> {
        let delta = TimeDelta::from_std(period).map_err(|_| ScheduleError::NonPositivePeriod)?;
        Self::new(delta)
    }

    /// Constructs / Creates a new [`ConstantSchedule`] from a whole number of
    /// seconds
    pub fn from_secs(period: u32) -> Result<Self, ScheduleError> {
        Self::new(TimeDelta::seconds(period as i64))
    }

    /// Parses a duration string of the form ``[d.]hh:mm:ss[.fff]`` into a
    /// [`ConstantSchedule`]. This is the constant-period half of the
    /// schedule-expression syntax consumed from trigger declarations; the
    /// cron half lives in [`CronSchedule::parse`]
    ///
    /// # Returns
    /// The parsed [`ConstantSchedule`], or
    /// [`ScheduleError::InvalidDurationExpression`] when the string does not
    /// match the grammar, or [`ScheduleError::NonPositivePeriod`] for a
    /// zero-length duration
    ///
    /// [`CronSchedule::parse`]: crate::schedule::CronSchedule::parse
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        parse_timespan(expression)
            .ok_or_else(|| ScheduleError::InvalidDurationExpression(expression.to_owned()))
            .and_then(Self::new)
    }

    /// The fixed period between occurrences
    pub fn period(&self) -> TimeDelta {
        self.0
    }
}

impl Display for ConstantSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {}", self.0)
    }
}

impl TimerSchedule for ConstantSchedule {
    fn next_after(&self, now_utc: DateTime<Utc>, _tz: &Tz) -> Result<DateTime<Utc>, ScheduleError> {
        Ok(now_utc + self.0)
    }
}

/// Parses ``[d.]hh:mm:ss[.fff]``. Returns `None` for anything that does not
/// match the grammar; range checks follow the grammar (hours under 24 when a
/// day component is present, minutes and seconds under 60)
fn parse_timespan(expression: &str) -> Option<TimeDelta> {
    let parts: Vec<&str> = expression.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let (days, hours_str) = match parts[0].split_once('.') {
        Some((d, h)) => (parse_component(d)?, h),
        None => (0, parts[0]),
    };
    let hours = parse_component(hours_str)?;
    let minutes = parse_component(parts[1])?;

    let (seconds_str, frac_nanos) = match parts[2].split_once('.') {
        Some((s, f)) => (s, parse_fraction(f)?),
        None => (parts[2], 0),
    };
    let seconds = parse_component(seconds_str)?;

    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let total_seconds = ((days * 24 + hours) * 60 + minutes) * 60 + seconds;
    Some(TimeDelta::seconds(total_seconds) + TimeDelta::nanoseconds(frac_nanos))
}

fn parse_component(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Fractional seconds, up to nanosecond precision
fn parse_fraction(text: &str) -> Option<i64> {
    if text.is_empty() || text.len() > 9 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: i64 = text.parse().ok()?;
    Some(digits * 10_i64.pow(9 - text.len() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_is_now_plus_period() {
        let schedule = ConstantSchedule::from_secs(90).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 3, 11, 9, 59, 0).unwrap();
        let next = schedule.next_after(now, &chrono_tz::UTC).unwrap();
        assert_eq!(next, now + TimeDelta::seconds(90));
    }

    #[test]
    fn zone_is_ignored() {
        let schedule = ConstantSchedule::from_secs(3600).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 3, 11, 9, 30, 0).unwrap();
        // Crosses the Pacific spring-forward boundary; the period is wall
        // time in UTC, not civil time
        let next = schedule
            .next_after(now, &chrono_tz::America::Los_Angeles)
            .unwrap();
        assert_eq!(next, now + TimeDelta::hours(1));
    }

    #[test]
    fn rejects_non_positive_periods() {
        assert!(matches!(
            ConstantSchedule::new(TimeDelta::zero()),
            Err(ScheduleError::NonPositivePeriod)
        ));
        assert!(matches!(
            ConstantSchedule::new(TimeDelta::seconds(-5)),
            Err(ScheduleError::NonPositivePeriod)
        ));
    }

    #[test]
    fn parses_timespan_forms() {
        assert_eq!(
            ConstantSchedule::parse("00:05:00").unwrap().period(),
            TimeDelta::minutes(5)
        );
        assert_eq!(
            ConstantSchedule::parse("1.00:00:00").unwrap().period(),
            TimeDelta::days(1)
        );
        assert_eq!(
            ConstantSchedule::parse("2.03:04:05").unwrap().period(),
            TimeDelta::days(2) + TimeDelta::hours(3) + TimeDelta::minutes(4) + TimeDelta::seconds(5)
        );
        assert_eq!(
            ConstantSchedule::parse("00:00:30.500").unwrap().period(),
            TimeDelta::seconds(30) + TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn rejects_malformed_timespans() {
        for bad in [
            "", "00:05", "24:00:00", "00:60:00", "00:00:60", "a.00:00:00", "00:00:00",
            "1.2.3:00:00", "00:00:00.",
        ] {
            assert!(ConstantSchedule::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
