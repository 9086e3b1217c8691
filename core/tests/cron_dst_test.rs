use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

fn local(tz: &Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    tz.with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;
    use duratimer_core::schedule::{ConstantSchedule, CronSchedule, TimerSchedule};

    // Schedule at 18:00 on the 6th of each month, evaluated just after the
    // March occurrence: the next one lies across the spring-forward
    // transition, so the interval is one hour shorter than four weeks
    #[test]
    fn interval_shrinks_across_spring_forward() {
        let schedule = CronSchedule::parse("0 0 18 6 * *").unwrap();
        let now = local(&Los_Angeles, 2018, 3, 9, 18, 0, 0);

        let next = schedule.next_after(now, &Los_Angeles).unwrap();

        assert_eq!(next - now, TimeDelta::hours(671));
        assert_eq!(next, local(&Los_Angeles, 2018, 4, 6, 18, 0, 0));
    }

    // Hourly at minute 59, evaluated at 01:59 on the spring-forward night:
    // 02:59 does not exist, the 03:59 occurrence fires exactly one hour later
    #[test]
    fn skipped_hour_occurrence_shifts_forward() {
        let schedule = CronSchedule::parse("0 59 * * * *").unwrap();
        let now = local(&Los_Angeles, 2018, 3, 11, 1, 59, 0);

        let next = schedule.next_after(now, &Los_Angeles).unwrap();

        assert_eq!(next - now, TimeDelta::hours(1));
        assert_eq!(next, local(&Los_Angeles, 2018, 3, 11, 3, 59, 0));
    }

    // Hourly at minute 30 through the fall-back night: the repeated 01:30
    // fires under both offsets, so every interval stays close to one hour
    #[test]
    fn frequent_schedule_fires_in_both_repeated_hours() {
        let schedule = CronSchedule::parse("0 30 * * * *").unwrap();
        let mut cursor = local(&Los_Angeles, 2018, 11, 4, 0, 30, 0);

        for _ in 0..3 {
            let next = schedule.next_after(cursor, &Los_Angeles).unwrap();
            let interval = next - cursor;
            let drift = (interval - TimeDelta::hours(1)).abs();
            assert!(
                drift <= TimeDelta::minutes(3),
                "interval {interval} drifted more than 5% from one hour"
            );
            cursor = next;
        }
    }

    // Daily at 01:30, started the day before fall-back: only one of the two
    // 01:30 wall times fires, keeping the interval at a day
    #[test]
    fn rare_schedule_fires_once_in_the_repeated_hour() {
        let schedule = CronSchedule::parse("0 30 1 * * *").unwrap();
        let now = local(&Los_Angeles, 2018, 11, 3, 1, 30, 0);

        let next = schedule.next_after(now, &Los_Angeles).unwrap();
        let interval = next - now;

        let drift = (interval - TimeDelta::hours(24)).abs();
        assert!(
            drift <= TimeDelta::minutes(72),
            "interval {interval} drifted more than 5% from one day"
        );
        // The earlier interpretation (still on daylight time) is the one
        // that fires
        assert_eq!(next, Utc.with_ymd_and_hms(2018, 11, 4, 8, 30, 0).unwrap());
    }

    // next_after is strictly increasing from any starting instant,
    // including instants inside and around both DST transitions
    #[test]
    fn next_is_strictly_greater_for_all_probes() {
        let cron = CronSchedule::parse("0 30 * * * *").unwrap();
        let constant = ConstantSchedule::from_secs(90).unwrap();
        let probes = [
            Utc.with_ymd_and_hms(2018, 3, 11, 9, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2018, 3, 11, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 11, 4, 8, 29, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 11, 4, 8, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 11, 4, 9, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 6, 15, 12, 0, 0).unwrap(),
        ];

        for probe in probes {
            assert!(cron.next_after(probe, &Los_Angeles).unwrap() > probe);
            assert!(constant.next_after(probe, &Los_Angeles).unwrap() > probe);
        }
    }

    // The batched helper is exactly repeated application of next_after
    #[test]
    fn next_occurrences_matches_successive_next() {
        let schedule = CronSchedule::parse("0 30 * * * *").unwrap();
        let start = Utc.with_ymd_and_hms(2018, 11, 3, 12, 0, 0).unwrap();

        let batched = schedule.next_occurrences(8, start, &Los_Angeles).unwrap();

        let mut cursor = start;
        for occurrence in &batched {
            cursor = schedule.next_after(cursor, &Los_Angeles).unwrap();
            assert_eq!(cursor, *occurrence);
        }
        assert!(batched.windows(2).all(|pair| pair[0] < pair[1]));
    }

    // Evaluation in a fixed-offset zone is untouched by DST handling
    #[test]
    fn utc_zone_is_plain_cron() {
        let schedule = CronSchedule::parse("0 0 12 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2018, 3, 11, 13, 0, 0).unwrap();

        let next = schedule.next_after(now, &chrono_tz::UTC).unwrap();

        assert_eq!(next, Utc.with_ymd_and_hms(2018, 3, 12, 12, 0, 0).unwrap());
    }
}
