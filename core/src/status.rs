use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The sentinel instant stored in [`ScheduleStatus::last`] before a timer has
/// ever fired. Fixed at 1900-01-01T00:00:00Z so that persisted statuses from
/// different hosts agree on what "never" looks like
pub static NEVER: LazyLock<DateTime<Utc>> =
    LazyLock::new(|| Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap());

/// [`ScheduleStatus`] is the plain value record a [`ScheduleMonitor`] persists
/// per timer so that schedule occurrences survive process restarts. All three
/// fields are UTC instants; the `DateTime<Utc>` type makes an assignment from
/// a non-UTC source unrepresentable
///
/// # Field(s)
/// - [`ScheduleStatus::last`] is the UTC time of the most recent occurrence
///   that actually fired, or [`NEVER`] before any fire
/// - [`ScheduleStatus::next`] is the UTC time at which the next occurrence is
///   expected
/// - [`ScheduleStatus::last_updated`] is the UTC time at which `next` was
///   (re)computed; when `last` is [`NEVER`] it is what detects a schedule
///   definition change since the status was written
///
/// # Persisted Layout
/// The serde layout keeps the PascalCase keys of the on-disk format:
/// `{"Last": "...", "Next": "...", "LastUpdated": "..."}` with RFC 3339
/// timestamps. Concrete monitors decide where the document lives; the record
/// itself is the format
///
/// # Trait Implementation(s)
/// [`ScheduleStatus`] implements [`Debug`], [`Clone`], [`Copy`], [`PartialEq`]
/// and [`Eq`] (equality is by field), plus [`Serialize`] and [`Deserialize`]
///
/// # See Also
/// - [`ScheduleMonitor`]
/// - [`NEVER`]
///
/// [`ScheduleMonitor`]: crate::monitor::ScheduleMonitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    #[serde(rename = "Last")]
    pub last: DateTime<Utc>,

    #[serde(rename = "Next")]
    pub next: DateTime<Utc>,

    #[serde(rename = "LastUpdated")]
    pub last_updated: DateTime<Utc>,
}

impl ScheduleStatus {
    /// Constructs the status of a brand-new timer: `last` is [`NEVER`],
    /// `next` is the first expected occurrence and `last_updated` records
    /// when that expectation was computed
    pub fn new(next: DateTime<Utc>, last_updated: DateTime<Utc>) -> Self {
        Self {
            last: *NEVER,
            next,
            last_updated,
        }
    }

    /// Whether this timer has ever fired
    pub fn has_fired(&self) -> bool {
        self.last != *NEVER
    }
}
