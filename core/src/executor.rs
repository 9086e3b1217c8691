use crate::errors::ScheduleError;
use crate::schedule::TimerSchedule;
use crate::status::ScheduleStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::error::Error;
use std::fmt::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[allow(unused_imports)]
use crate::listener::TimerListener;

/// [`TimerInfo`] is the immutable value handed to the job runtime at
/// invocation time: the schedule that produced the fire, the zone it is
/// evaluated in, a snapshot of the persisted status (or `None` when
/// monitoring is disabled) and whether this invocation is a catch-up for a
/// missed occurrence
#[derive(Clone)]
pub struct TimerInfo {
    pub schedule: Arc<dyn TimerSchedule>,
    pub time_zone: Tz,
    pub schedule_status: Option<ScheduleStatus>,
    pub is_past_due: bool,
}

impl TimerInfo {
    /// Renders the upcoming occurrences of the schedule as a report, one
    /// zone-local instant per line. The [`TimerListener`] logs this for
    /// unmonitored timers at startup
    pub fn format_next_occurrences(
        &self,
        count: usize,
        now_utc: DateTime<Utc>,
    ) -> Result<String, ScheduleError> {
        let occurrences = self
            .schedule
            .next_occurrences(count, now_utc, &self.time_zone)?;
        let mut report = format!("The next {count} occurrences of the schedule will be:");
        for occurrence in occurrences {
            let _ = write!(
                report,
                "\n{}",
                occurrence.with_timezone(&self.time_zone).to_rfc3339()
            );
        }
        Ok(report)
    }
}

impl std::fmt::Debug for TimerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerInfo")
            .field("schedule", &self.schedule)
            .field("time_zone", &self.time_zone)
            .field("schedule_status", &self.schedule_status)
            .field("is_past_due", &self.is_past_due)
            .finish()
    }
}

/// The outcome a [`TimerExecutor`] reports for one invocation. The listener
/// logs failures and advances the schedule regardless of the outcome
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub error: Option<Box<dyn Error + Send + Sync>>,
}

impl ExecutionResult {
    /// A successful invocation
    pub fn success() -> Self {
        Self {
            succeeded: true,
            error: None,
        }
    }

    /// A failed invocation, optionally carrying the error the user function
    /// raised
    pub fn failure(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// The [`TimerExecutor`] trait is the seam between the scheduling core and
/// the job runtime that actually runs a user function given a trigger value.
/// The [`TimerListener`] hands it a [`TimerInfo`] and a cancellation token
/// per fire; fires for one timer are serialized, so an implementation never
/// sees two concurrent calls from the same listener
///
/// Cancellation of the listener is forwarded through the token; an
/// invocation already in flight runs to completion and any status write that
/// already happened is not rolled back
#[async_trait]
pub trait TimerExecutor: 'static + Send + Sync {
    /// Runs the user function for one fire
    async fn execute(&self, info: TimerInfo, cancellation: CancellationToken) -> ExecutionResult;
}
