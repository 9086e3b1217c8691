use crate::errors::ScheduleError;
use crate::schedule::{ConstantSchedule, CronSchedule, TimerSchedule};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;
use typed_builder::TypedBuilder;

#[allow(unused_imports)]
use crate::listener::TimerListener;
#[allow(unused_imports)]
use crate::monitor::ScheduleMonitor;

/// The [`NameResolver`] trait lets a host substitute configuration values
/// into schedule expressions before parsing: a declaration like
/// ``%cleanup-schedule%`` resolves against app settings rather than being
/// baked into code
pub trait NameResolver: Send + Sync {
    /// Resolves ``name`` to its configured value, or `None` when unknown
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Substitutes every ``%name%`` placeholder in ``expression`` through
/// ``resolver``. An unmatched ``%`` is kept literally; a placeholder the
/// resolver does not know is a configuration error
pub fn resolve_schedule_expression(
    expression: &str,
    resolver: &dyn NameResolver,
) -> Result<String, ScheduleError> {
    let mut resolved = String::with_capacity(expression.len());
    let mut rest = expression;
    while let Some(start) = rest.find('%') {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                let value = resolver
                    .resolve(name)
                    .ok_or_else(|| ScheduleError::UnresolvedPlaceholder(name.to_owned()))?;
                resolved.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                resolved.push('%');
                rest = after;
            }
        }
    }
    resolved.push_str(rest);
    Ok(resolved)
}

/// [`TimerTriggerOptions`] is the attribute-level configuration a host
/// consumes from a timer-decorated function and turns into the composites a
/// [`TimerListener`] is built from
///
/// # Field(s)
/// - ``schedule_expression`` is either a six-field cron expression or a
///   ``[d.]hh:mm:ss[.fff]`` duration string; the presence of a ``:`` decides
///   which parser runs
/// - ``run_on_startup`` invokes the user function once immediately on start
///   even when the timer is not past due
/// - ``use_monitor`` overrides the monitoring decision; left unset, it is
///   derived from the schedule (see
///   [`TimerTriggerOptions::effective_use_monitor`])
/// - ``time_zone`` is an IANA zone identifier such as
///   ``America/Los_Angeles``; unset means UTC
///
/// # Constructor(s)
/// Constructed via [`TimerTriggerOptions::builder`]
///
/// # Example
/// ```ignore
/// use duratimer_core::options::TimerTriggerOptions;
///
/// let options = TimerTriggerOptions::builder()
///     .schedule_expression("0 30 9 * * 1-5")
///     .time_zone(Some("America/Los_Angeles".to_owned()))
///     .build();
///
/// let schedule = options.create_schedule()?;
/// let tz = options.resolve_time_zone()?;
/// ```
///
/// # See Also
/// - [`TimerListener`]
/// - [`NameResolver`]
#[derive(Debug, Clone, TypedBuilder)]
pub struct TimerTriggerOptions {
    #[builder(setter(into))]
    pub schedule_expression: String,

    #[builder(default)]
    pub run_on_startup: bool,

    #[builder(default)]
    pub use_monitor: Option<bool>,

    #[builder(default)]
    pub time_zone: Option<String>,
}

impl TimerTriggerOptions {
    /// Parses the schedule expression into a schedule: duration strings
    /// (they contain ``:``) become a [`ConstantSchedule`], everything else
    /// is parsed as cron
    ///
    /// # Returns
    /// The parsed schedule, or the [`ScheduleError`] that makes this timer's
    /// declaration invalid. The error is fatal for this timer only; other
    /// timers of the host are unaffected
    pub fn create_schedule(&self) -> Result<Arc<dyn TimerSchedule>, ScheduleError> {
        let expression = self.schedule_expression.trim();
        if expression.contains(':') {
            Ok(Arc::new(ConstantSchedule::parse(expression)?))
        } else {
            Ok(Arc::new(CronSchedule::parse(expression)?))
        }
    }

    /// Resolves the configured zone identifier, defaulting to UTC
    pub fn resolve_time_zone(&self) -> Result<Tz, ScheduleError> {
        match &self.time_zone {
            None => Ok(chrono_tz::UTC),
            Some(id) => Tz::from_str(id).map_err(|_| ScheduleError::UnknownTimeZone(id.clone())),
        }
    }

    /// Whether this timer should run monitored. An explicit ``use_monitor``
    /// wins; otherwise monitoring is disabled for schedules that fire more
    /// than once per minute, where persisting every occurrence would cost
    /// more than a missed one is worth
    pub fn effective_use_monitor(
        &self,
        schedule: &dyn TimerSchedule,
        tz: &Tz,
        now_utc: DateTime<Utc>,
    ) -> bool {
        match self.use_monitor {
            Some(explicit) => explicit,
            None => should_use_monitor(schedule, tz, now_utc),
        }
    }
}

/// The default monitoring decision: sample three upcoming occurrences and
/// disable monitoring when any consecutive pair is under one minute apart
pub fn should_use_monitor(schedule: &dyn TimerSchedule, tz: &Tz, now_utc: DateTime<Utc>) -> bool {
    match schedule.next_occurrences(3, now_utc, tz) {
        Ok(occurrences) => occurrences
            .windows(2)
            .all(|pair| pair[1] - pair[0] >= TimeDelta::minutes(1)),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    impl NameResolver for MapResolver {
        fn resolve(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|value| (*value).to_owned())
        }
    }

    #[test]
    fn resolves_placeholders() {
        let resolver = MapResolver(HashMap::from([("schedule", "0 30 * * * *")]));
        assert_eq!(
            resolve_schedule_expression("%schedule%", &resolver).unwrap(),
            "0 30 * * * *"
        );
        assert_eq!(
            resolve_schedule_expression("0 %minute% * * * *", &resolver).unwrap_err().to_string(),
            "Unresolved placeholder '%minute%' in schedule expression"
        );
        // No placeholder: passthrough, lone % kept literally
        assert_eq!(
            resolve_schedule_expression("0 30 * * * *", &resolver).unwrap(),
            "0 30 * * * *"
        );
    }

    #[test]
    fn duration_strings_become_constant_schedules() {
        let options = TimerTriggerOptions::builder()
            .schedule_expression("00:05:00")
            .build();
        let schedule = options.create_schedule().unwrap();
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(now, &chrono_tz::UTC).unwrap(),
            now + TimeDelta::minutes(5)
        );
    }

    #[test]
    fn cron_strings_become_cron_schedules() {
        let options = TimerTriggerOptions::builder()
            .schedule_expression("0 0 * * * *")
            .build();
        let schedule = options.create_schedule().unwrap();
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 30, 0).unwrap();
        assert_eq!(
            schedule.next_after(now, &chrono_tz::UTC).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_zone_is_a_configuration_error() {
        let options = TimerTriggerOptions::builder()
            .schedule_expression("0 0 * * * *")
            .time_zone(Some("Mars/Olympus_Mons".to_owned()))
            .build();
        assert!(matches!(
            options.resolve_time_zone(),
            Err(ScheduleError::UnknownTimeZone(_))
        ));
    }

    #[test]
    fn sub_minute_schedules_disable_monitoring() {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let tz = chrono_tz::UTC;

        let frequent_cron = CronSchedule::parse("*/15 * * * * *").unwrap();
        assert!(!should_use_monitor(&frequent_cron, &tz, now));

        let hourly_cron = CronSchedule::parse("0 0 * * * *").unwrap();
        assert!(should_use_monitor(&hourly_cron, &tz, now));

        let short_period = ConstantSchedule::from_secs(30).unwrap();
        assert!(!should_use_monitor(&short_period, &tz, now));

        let exact_minute = ConstantSchedule::from_secs(60).unwrap();
        assert!(should_use_monitor(&exact_minute, &tz, now));
    }

    #[test]
    fn explicit_use_monitor_wins() {
        let options = TimerTriggerOptions::builder()
            .schedule_expression("*/5 * * * * *")
            .use_monitor(Some(true))
            .build();
        let schedule = options.create_schedule().unwrap();
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(options.effective_use_monitor(schedule.as_ref(), &chrono_tz::UTC, now));
    }
}
