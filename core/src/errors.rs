use std::error::Error;
use thiserror::Error;

/// Errors raised while turning a trigger declaration into a usable schedule.
/// These are configuration errors: they surface to the host at startup and
/// are fatal for the offending timer only
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{0}': {1}")]
    InvalidCronExpression(String, String),

    #[error("A cron expression must have six fields `sec min hour dom mon dow`, got {0}")]
    WrongCronFieldCount(usize),

    #[error("Invalid duration expression '{0}', expected `[d.]hh:mm:ss[.fff]`")]
    InvalidDurationExpression(String),

    #[error("A constant schedule requires a strictly positive period")]
    NonPositivePeriod,

    #[error("Unknown time zone identifier '{0}'")]
    UnknownTimeZone(String),

    #[error("Unresolved placeholder '%{0}%' in schedule expression")]
    UnresolvedPlaceholder(String),

    #[error("The schedule '{0}' has no occurrence after {1}")]
    NoUpcomingOccurrence(String, String),
}

/// Errors raised by a [`ScheduleMonitor`] implementation. Read and write
/// failures are transient: the listener logs them and carries on as if
/// monitoring were disabled for that fire, so the next fire retries
///
/// [`ScheduleMonitor`]: crate::monitor::ScheduleMonitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to read status for timer '{timer}': {source}")]
    ReadFailed {
        timer: String,
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("Failed to write status for timer '{timer}': {source}")]
    WriteFailed {
        timer: String,
        source: Box<dyn Error + Send + Sync>,
    },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Errors raised by the [`TimerListener`] state machine. Only invalid
/// lifecycle transitions are reported this way; executor and monitor
/// failures are contained inside the listener and never reach the caller
///
/// [`TimerListener`]: crate::listener::TimerListener
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Timer '{timer}' cannot {operation} while {state}")]
    InvalidState {
        timer: String,
        operation: &'static str,
        state: &'static str,
    },
}
