use crate::clock::{SystemClock, TimerClock};
use crate::errors::{ListenerError, ScheduleError};
use crate::executor::{TimerExecutor, TimerInfo};
use crate::monitor::ScheduleMonitor;
use crate::schedule::TimerSchedule;
use crate::status::ScheduleStatus;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// The longest interval a single arming of the underlying timer may cover:
/// 2³¹ − 1 milliseconds, about 24.8 days. Longer waits are traversed in
/// chunks with a remaining-time carry; the user function does not run until
/// the whole interval has elapsed
pub const MAX_TIMER_INTERVAL: Duration = Duration::from_millis(i32::MAX as u64);

/// How early a fire may land, relative to the recorded next occurrence,
/// while still being attributed to that occurrence. Underlying timers have
/// been observed waking about a millisecond short of their target; without
/// the adjustment the schedule would compute the same `Next` twice and the
/// timer would double-fire
const CLOCK_SKEW_TOLERANCE_MS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Created,
    Started,
    Stopped,
    Disposed,
}

impl ListenerState {
    fn name(self) -> &'static str {
        match self {
            ListenerState::Created => "created",
            ListenerState::Started => "started",
            ListenerState::Stopped => "stopped",
            ListenerState::Disposed => "disposed",
        }
    }
}

/// This is the builder configs to use for building a [`TimerListener`]
/// instance. By itself it should not be used, and it resides in
/// [`TimerListener::builder`]
#[derive(TypedBuilder)]
#[builder(build_method(into = TimerListener))]
pub struct TimerListenerConfig {
    /// The name the host assigned to this timer; it keys the persisted
    /// status and every log line
    #[builder(setter(into))]
    timer_name: String,

    /// The [`TimerSchedule`] deciding when this timer fires
    schedule: Arc<dyn TimerSchedule>,

    /// The [`TimerExecutor`] that runs the user function on each fire
    executor: Arc<dyn TimerExecutor>,

    /// The civil time zone schedule evaluation happens in
    ///
    /// # Default Value
    /// UTC
    #[builder(default = chrono_tz::UTC)]
    time_zone: Tz,

    /// The [`ScheduleMonitor`] persisting occurrence bookkeeping. Leaving it
    /// unset disables monitoring entirely: no status reads or writes, no
    /// past-due catch-up across restarts
    #[builder(default, setter(strip_option))]
    monitor: Option<Arc<dyn ScheduleMonitor>>,

    /// The [`TimerClock`] driving this listener
    ///
    /// # Default Value
    /// [`SystemClock`], the wall clock. Tests substitute an advanceable
    /// clock here
    #[builder(default = Arc::new(SystemClock) as Arc<dyn TimerClock>)]
    clock: Arc<dyn TimerClock>,

    /// Whether to invoke the user function once immediately on start even
    /// when the timer is not past due
    #[builder(default)]
    run_on_startup: bool,
}

impl From<TimerListenerConfig> for TimerListener {
    fn from(config: TimerListenerConfig) -> Self {
        Self {
            timer_name: config.timer_name,
            schedule: config.schedule,
            executor: config.executor,
            time_zone: config.time_zone,
            monitor: config.monitor,
            clock: config.clock,
            run_on_startup: config.run_on_startup,
            state: Mutex::new(ListenerState::Created),
            process: Mutex::new(None),
            cancellation: CancellationToken::new(),
        }
    }
}

/// [`TimerListener`] is the per-timer state machine: it arms the underlying
/// timer for the next occurrence of its [`TimerSchedule`], invokes the user
/// function through the [`TimerExecutor`] on each fire, advances the
/// [`ScheduleMonitor`] bookkeeping, traverses intervals longer than
/// [`MAX_TIMER_INTERVAL`] with a remaining-time carry, and stops cleanly
///
/// # Lifecycle
/// `Created → Started → Stopped → Disposed`, driven by
/// [`TimerListener::start`], [`TimerListener::stop`] and
/// [`TimerListener::dispose`]. Any other transition (double-start, stop
/// before start, operations after dispose) is rejected with
/// [`ListenerError::InvalidState`]
///
/// # Start Protocol
/// On start the listener loads the persisted status, logs it, asks the
/// monitor how far past due the timer is, and when past due (or when
/// configured to run on startup) invokes the user function once before any
/// arming, with `is_past_due` set accordingly. Unmonitored timers that do
/// not run on startup instead log their next five occurrences
///
/// # Fire Protocol
/// Every fire invokes the user function, then (when monitored) persists
/// `{last, next, last_updated}` *before* re-arming, so a crash between fire
/// and re-arm still observes an advanced `Next` after restart. Executor
/// failures and monitor failures are logged and contained; every fire
/// advances the schedule regardless
///
/// # Concurrency
/// One worker task per listener; fires are serialized, at most one user
/// invocation is in flight per timer. Listeners for different timers are
/// independent
///
/// # Constructor(s)
/// If one wishes to construct a [`TimerListener`], they may do so via
/// [`TimerListener::builder`]
///
/// # Example
/// ```ignore
/// use duratimer_core::listener::TimerListener;
///
/// let listener = TimerListener::builder()
///     .timer_name("cleanup")
///     .schedule(schedule)
///     .executor(executor)
///     .monitor(monitor)
///     .build();
///
/// listener.start(CancellationToken::new()).await?;
/// // ...
/// listener.stop(CancellationToken::new()).await?;
/// listener.dispose().await?;
/// ```
///
/// # See Also
/// - [`TimerSchedule`]
/// - [`ScheduleMonitor`]
/// - [`TimerExecutor`]
pub struct TimerListener {
    timer_name: String,
    schedule: Arc<dyn TimerSchedule>,
    executor: Arc<dyn TimerExecutor>,
    time_zone: Tz,
    monitor: Option<Arc<dyn ScheduleMonitor>>,
    clock: Arc<dyn TimerClock>,
    run_on_startup: bool,
    state: Mutex<ListenerState>,
    process: Mutex<Option<JoinHandle<()>>>,
    cancellation: CancellationToken,
}

impl TimerListener {
    /// Constructs a listener builder, used for supplying the schedule,
    /// executor, monitor and clock composites to then construct a
    /// [`TimerListener`]
    pub fn builder() -> TimerListenerConfigBuilder {
        TimerListenerConfig::builder()
    }

    /// The name the host assigned to this timer
    pub fn timer_name(&self) -> &str {
        &self.timer_name
    }

    /// Starts the listener: runs the start protocol (status load, past-due
    /// check, optional catch-up invocation) and arms the timer for the next
    /// occurrence
    ///
    /// # Arguments
    /// ``cancellation`` covers the start operation itself: when already
    /// cancelled, start returns without side effects; when cancelled after
    /// the catch-up invocation, the timer is not armed
    ///
    /// # Returns
    /// `Ok(())` once armed, or [`ListenerError::InvalidState`] unless the
    /// listener is freshly created
    pub async fn start(&self, cancellation: CancellationToken) -> Result<(), ListenerError> {
        if cancellation.is_cancelled() {
            return Ok(());
        }
        {
            let mut state = self.state.lock().await;
            if *state != ListenerState::Created {
                return Err(ListenerError::InvalidState {
                    timer: self.timer_name.clone(),
                    operation: "start",
                    state: state.name(),
                });
            }
            *state = ListenerState::Started;
        }

        let worker = TimerWorker {
            timer_name: self.timer_name.clone(),
            schedule: self.schedule.clone(),
            executor: self.executor.clone(),
            time_zone: self.time_zone,
            monitor: self.monitor.clone(),
            clock: self.clock.clone(),
            cancellation: self.cancellation.clone(),
        };

        let now = worker.clock.now().await;
        let mut status = None;
        let mut past_due = TimeDelta::zero();
        let mut read_ok = false;

        if let Some(monitor) = &worker.monitor {
            match monitor.get_status(&worker.timer_name).await {
                Ok(loaded) => {
                    status = loaded;
                    read_ok = true;
                }
                // Transient: this fire runs unmonitored, the next one
                // retries. Checking past due against a None we did not
                // actually load would clobber the stored status
                Err(e) => {
                    warn!(timer = %worker.timer_name, error = %e, "failed to read schedule status");
                }
            }
        }
        log_initial_status(&worker.timer_name, status.as_ref());

        if let Some(monitor) = &worker.monitor
            && read_ok
        {
            past_due = match monitor
                .check_past_due(
                    &worker.timer_name,
                    now,
                    &worker.time_zone,
                    worker.schedule.as_ref(),
                    status.as_ref(),
                )
                .await
            {
                Ok(past_due) => past_due,
                Err(e) => {
                    warn!(timer = %worker.timer_name, error = %e, "past-due check failed, treating the timer as on schedule");
                    TimeDelta::zero()
                }
            };

            // The check may have persisted bookkeeping (brand-new timer,
            // schedule change); arm from what was actually recorded
            if let Ok(recorded) = monitor.get_status(&worker.timer_name).await {
                status = recorded.or(status);
            }
        }

        let is_past_due = past_due > TimeDelta::zero();
        if is_past_due || self.run_on_startup {
            debug!(
                timer = %worker.timer_name,
                past_due = %past_due,
                run_on_startup = self.run_on_startup,
                "invoking on startup"
            );
            let invocation_time = worker.clock.now().await;
            worker
                .invoke(&mut status, is_past_due, invocation_time)
                .await;
        } else if worker.monitor.is_none() {
            let info = TimerInfo {
                schedule: worker.schedule.clone(),
                time_zone: worker.time_zone,
                schedule_status: None,
                is_past_due: false,
            };
            match info.format_next_occurrences(5, now) {
                Ok(report) => info!(timer = %worker.timer_name, "{report}"),
                Err(e) => warn!(timer = %worker.timer_name, error = %e, "failed to compute upcoming occurrences"),
            }
        }

        if cancellation.is_cancelled() || self.cancellation.is_cancelled() {
            return Ok(());
        }
        *self.process.lock().await = Some(tokio::spawn(worker.run(status)));
        Ok(())
    }

    /// Stops the listener: the pending arm is cancelled and no further fire
    /// occurs. A fire currently in flight runs to completion but will not
    /// re-arm, so a late completion can never restart a stopped timer
    ///
    /// Stop does not wait for an in-flight invocation; it is safe to call
    /// from inside the user function
    ///
    /// # Arguments
    /// ``cancellation`` covers the stop operation itself: when already
    /// cancelled, stop returns without touching the listener
    pub async fn stop(&self, cancellation: CancellationToken) -> Result<(), ListenerError> {
        if cancellation.is_cancelled() {
            return Ok(());
        }
        {
            let mut state = self.state.lock().await;
            if *state != ListenerState::Started {
                return Err(ListenerError::InvalidState {
                    timer: self.timer_name.clone(),
                    operation: "stop",
                    state: state.name(),
                });
            }
            *state = ListenerState::Stopped;
        }
        self.cancellation.cancel();
        debug!(timer = %self.timer_name, "timer listener stopped");
        Ok(())
    }

    /// Disposes a stopped listener, releasing its worker. Every operation
    /// after dispose is rejected
    pub async fn dispose(&self) -> Result<(), ListenerError> {
        {
            let mut state = self.state.lock().await;
            if *state != ListenerState::Stopped {
                return Err(ListenerError::InvalidState {
                    timer: self.timer_name.clone(),
                    operation: "dispose",
                    state: state.name(),
                });
            }
            *state = ListenerState::Disposed;
        }
        if let Some(process) = self.process.lock().await.take() {
            process.abort();
        }
        Ok(())
    }
}

/// The owned half of a started listener: everything the spawned worker task
/// needs to keep firing without borrowing the [`TimerListener`] itself
struct TimerWorker {
    timer_name: String,
    schedule: Arc<dyn TimerSchedule>,
    executor: Arc<dyn TimerExecutor>,
    time_zone: Tz,
    monitor: Option<Arc<dyn ScheduleMonitor>>,
    clock: Arc<dyn TimerClock>,
    cancellation: CancellationToken,
}

impl TimerWorker {
    async fn run(self, mut status: Option<ScheduleStatus>) {
        loop {
            if self.cancellation.is_cancelled() {
                break;
            }
            let now = self.clock.now().await;
            let next = match self.next_occurrence(status.as_ref(), now) {
                Ok(next) => next,
                Err(e) => {
                    error!(timer = %self.timer_name, error = %e, "no further occurrence, timer will not fire again");
                    break;
                }
            };
            if !self.idle_until(next, now).await {
                break;
            }
            let invocation_time = self.clock.now().await;
            self.invoke(&mut status, false, invocation_time).await;
        }
        debug!(timer = %self.timer_name, "timer worker exited");
    }

    /// The monitored next occurrence when one is recorded, otherwise a fresh
    /// computation from the schedule
    fn next_occurrence(
        &self,
        status: Option<&ScheduleStatus>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ScheduleError> {
        match status {
            Some(status) if self.monitor.is_some() => Ok(status.next),
            _ => self.schedule.next_after(now, &self.time_zone),
        }
    }

    /// Arms the timer until ``next`` is reached, splitting intervals above
    /// [`MAX_TIMER_INTERVAL`] and carrying the remainder across fires.
    /// Returns `false` when cancelled mid-wait
    async fn idle_until(&self, next: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let mut remaining = next - now;
        if remaining <= TimeDelta::zero() {
            // Already due: arm for the smallest representable positive
            // duration rather than firing inline
            remaining = TimeDelta::nanoseconds(1);
        }
        loop {
            let chunk = remaining.min(max_interval());
            if !self.arm(chunk).await {
                return false;
            }
            remaining -= chunk;
            if remaining <= TimeDelta::zero() {
                return true;
            }
            debug!(
                timer = %self.timer_name,
                remaining = %remaining,
                "interval exceeds the platform timer maximum, re-armed without invoking"
            );
        }
    }

    /// One arming of the underlying timer. Returns `false` when cancelled
    async fn arm(&self, interval: TimeDelta) -> bool {
        assert!(
            interval <= max_interval(),
            "single arm interval {interval} exceeds MAX_TIMER_INTERVAL"
        );
        let sleep = interval.to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = self.cancellation.cancelled() => false,
            _ = self.clock.idle_for(sleep) => true,
        }
    }

    /// Invokes the user function for one fire and advances the monitor.
    /// The status write happens before the caller re-arms
    async fn invoke(
        &self,
        status: &mut Option<ScheduleStatus>,
        is_past_due: bool,
        invocation_time: DateTime<Utc>,
    ) {
        // Underlying timers may fire early on clock skew; attributing such a
        // fire to the recorded occurrence keeps next_after from returning
        // the same instant twice
        let mut last_occurrence = invocation_time;
        if let Some(recorded) = status.as_ref()
            && invocation_time < recorded.next
            && recorded.next - invocation_time <= TimeDelta::milliseconds(CLOCK_SKEW_TOLERANCE_MS)
        {
            last_occurrence = recorded.next;
        }

        let info = TimerInfo {
            schedule: self.schedule.clone(),
            time_zone: self.time_zone,
            schedule_status: if self.monitor.is_some() { *status } else { None },
            is_past_due,
        };
        debug!(timer = %self.timer_name, is_past_due, "timer fired");

        let result = self
            .executor
            .execute(info, self.cancellation.child_token())
            .await;
        if !result.succeeded {
            match result.error {
                Some(e) => error!(timer = %self.timer_name, error = %e, "timer invocation failed"),
                None => error!(timer = %self.timer_name, "timer invocation failed"),
            }
        }

        if let Some(monitor) = &self.monitor {
            match self.schedule.next_after(last_occurrence, &self.time_zone) {
                Ok(next) => {
                    let advanced = ScheduleStatus {
                        last: last_occurrence,
                        next,
                        last_updated: invocation_time,
                    };
                    if let Err(e) = monitor.update_status(&self.timer_name, &advanced).await {
                        warn!(timer = %self.timer_name, error = %e, "failed to persist schedule status, next fire retries");
                    }
                    *status = Some(advanced);
                }
                Err(e) => {
                    error!(timer = %self.timer_name, error = %e, "failed to compute the next occurrence");
                    *status = None;
                }
            }
        }
    }
}

fn max_interval() -> TimeDelta {
    TimeDelta::milliseconds(i32::MAX as i64)
}

fn log_initial_status(timer: &str, status: Option<&ScheduleStatus>) {
    let (last, next, last_updated) = match status {
        Some(s) => (
            s.last.to_rfc3339(),
            s.next.to_rfc3339(),
            s.last_updated.to_rfc3339(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    debug!(
        timer = %timer,
        last = %last,
        next = %next,
        last_updated = %last_updated,
        "initial schedule status"
    );
}
