use crate::errors::MonitorError;
use crate::monitor::ScheduleMonitor;
use crate::status::ScheduleStatus;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// [`FileScheduleMonitor`] is an implementation of [`ScheduleMonitor`] that
/// keeps one JSON status document per timer on the local filesystem, named
/// ``{timer_name}.status`` under a configured root directory
///
/// # Persisted Layout
/// Each document is the serde layout of [`ScheduleStatus`]:
/// ``{"Last": "...", "Next": "...", "LastUpdated": "..."}`` with RFC 3339
/// UTC timestamps
///
/// # Write Semantics
/// A write lands in a sibling ``.tmp`` file first and is moved over the
/// status document with a rename, so a reader never observes a half-written
/// record. A missing document reads as `None`; an unreadable or corrupt one
/// surfaces [`MonitorError::ReadFailed`], which the listener treats as
/// transient
///
/// # Constructor(s)
/// When constructing a [`FileScheduleMonitor`], one can use
/// [`FileScheduleMonitor::new`] with the root directory that should hold the
/// status documents. The directory is created on first write
///
/// # See Also
/// - [`ScheduleMonitor`]
/// - [`InMemoryScheduleMonitor`]
///
/// [`InMemoryScheduleMonitor`]: crate::monitor::InMemoryScheduleMonitor
#[derive(Debug, Clone)]
pub struct FileScheduleMonitor {
    root: PathBuf,
}

impl FileScheduleMonitor {
    /// Constructs a [`FileScheduleMonitor`] rooted at ``root``
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn status_path(&self, timer_name: &str) -> PathBuf {
        self.root.join(format!("{timer_name}.status"))
    }

    fn read_error(timer: &str, source: std::io::Error) -> MonitorError {
        MonitorError::ReadFailed {
            timer: timer.to_owned(),
            source: Box::new(source),
        }
    }

    fn write_error(timer: &str, source: std::io::Error) -> MonitorError {
        MonitorError::WriteFailed {
            timer: timer.to_owned(),
            source: Box::new(source),
        }
    }
}

#[async_trait]
impl ScheduleMonitor for FileScheduleMonitor {
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, MonitorError> {
        let contents = match tokio::fs::read(self.status_path(timer_name)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::read_error(timer_name, e)),
        };
        let status = serde_json::from_slice(&contents).map_err(|e| MonitorError::ReadFailed {
            timer: timer_name.to_owned(),
            source: Box::new(e),
        })?;
        Ok(Some(status))
    }

    async fn update_status(
        &self,
        timer_name: &str,
        status: &ScheduleStatus,
    ) -> Result<(), MonitorError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::write_error(timer_name, e))?;

        let document = serde_json::to_vec_pretty(status).map_err(|e| MonitorError::WriteFailed {
            timer: timer_name.to_owned(),
            source: Box::new(e),
        })?;

        let path = self.status_path(timer_name);
        let staging = sibling_tmp(&path);
        tokio::fs::write(&staging, document)
            .await
            .map_err(|e| Self::write_error(timer_name, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| Self::write_error(timer_name, e))
    }
}

fn sibling_tmp(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}
