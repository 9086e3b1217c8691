use crate::errors::MonitorError;
use crate::monitor::ScheduleMonitor;
use crate::status::ScheduleStatus;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;

/// [`InMemoryScheduleMonitor`] is an implementation of [`ScheduleMonitor`]
/// that operates in-memory
///
/// # Usage Note(s)
/// Due to the fact that [`InMemoryScheduleMonitor`] operates in-memory by
/// nature, it doesn't store any information on the disk: statuses are gone
/// with the process, so the past-due catch-up never fires across restarts.
/// It is mostly meant for hosts without durable storage and for tests; for
/// anything that must survive a restart, a persistent implementation such as
/// [`FileScheduleMonitor`] should be preferred
///
/// # Constructor(s)
/// When constructing a new [`InMemoryScheduleMonitor`], one can use
/// [`InMemoryScheduleMonitor::new`] for doing so, or
/// [`InMemoryScheduleMonitor::default`] via the [`Default`] trait
///
/// # Write Semantics
/// Statuses live in a sharded concurrent map; replacing an entry is atomic
/// and writes to the same timer name serialize on its shard, which is
/// exactly the per-timer ordering [`ScheduleMonitor`] requires
///
/// # See Also
/// - [`ScheduleMonitor`]
/// - [`FileScheduleMonitor`]
///
/// [`FileScheduleMonitor`]: crate::monitor::FileScheduleMonitor
#[derive(Default)]
pub struct InMemoryScheduleMonitor {
    statuses: DashMap<String, ScheduleStatus>,
}

impl InMemoryScheduleMonitor {
    /// Constructs an empty [`InMemoryScheduleMonitor`]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Debug for InMemoryScheduleMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryScheduleMonitor")
            .field("timers", &self.statuses.len())
            .finish()
    }
}

#[async_trait]
impl ScheduleMonitor for InMemoryScheduleMonitor {
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, MonitorError> {
        Ok(self.statuses.get(timer_name).map(|entry| *entry.value()))
    }

    async fn update_status(
        &self,
        timer_name: &str,
        status: &ScheduleStatus,
    ) -> Result<(), MonitorError> {
        self.statuses.insert(timer_name.to_owned(), *status);
        Ok(())
    }
}
