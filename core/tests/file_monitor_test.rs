use chrono::{DateTime, TimeZone, Utc};

#[cfg(test)]
mod tests {
    use super::*;
    use duratimer_core::monitor::{FileScheduleMonitor, ScheduleMonitor};
    use duratimer_core::status::{NEVER, ScheduleStatus};

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let root = tempfile::tempdir().unwrap();
        let monitor = FileScheduleMonitor::new(root.path());

        assert!(monitor.get_status("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_survives_a_write_read_cycle() {
        let root = tempfile::tempdir().unwrap();
        let monitor = FileScheduleMonitor::new(root.path());
        let status = ScheduleStatus {
            last: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            next: Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap(),
            last_updated: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 1).unwrap(),
        };

        monitor.update_status("cleanup", &status).await.unwrap();

        assert_eq!(
            monitor.get_status("cleanup").await.unwrap().unwrap(),
            status
        );
        // Replacement is in place, not additive
        let advanced = ScheduleStatus {
            last: status.next,
            next: Utc.with_ymd_and_hms(2020, 1, 1, 2, 0, 0).unwrap(),
            last_updated: status.next,
        };
        monitor.update_status("cleanup", &advanced).await.unwrap();
        assert_eq!(
            monitor.get_status("cleanup").await.unwrap().unwrap(),
            advanced
        );
    }

    // The on-disk document keeps the PascalCase layout, and the never-fired
    // sentinel round-trips through it
    #[tokio::test]
    async fn document_layout_is_the_persisted_format() {
        let root = tempfile::tempdir().unwrap();
        let monitor = FileScheduleMonitor::new(root.path());
        let status = ScheduleStatus::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 30, 0).unwrap(),
        );
        monitor.update_status("layout", &status).await.unwrap();

        let raw = std::fs::read(root.path().join("layout.status")).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        for key in ["Last", "Next", "LastUpdated"] {
            assert!(document.get(key).is_some(), "missing key {key}");
        }
        let last: DateTime<Utc> = serde_json::from_value(document["Last"].clone()).unwrap();
        assert_eq!(last, *NEVER);
    }

    #[tokio::test]
    async fn corrupt_document_is_a_read_error() {
        let root = tempfile::tempdir().unwrap();
        let monitor = FileScheduleMonitor::new(root.path());
        std::fs::write(root.path().join("broken.status"), b"not json").unwrap();

        assert!(monitor.get_status("broken").await.is_err());
    }

    #[tokio::test]
    async fn timers_do_not_share_documents() {
        let root = tempfile::tempdir().unwrap();
        let monitor = FileScheduleMonitor::new(root.path());
        let first = ScheduleStatus::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        );
        let second = ScheduleStatus::new(
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        );

        monitor.update_status("first", &first).await.unwrap();
        monitor.update_status("second", &second).await.unwrap();

        assert_eq!(monitor.get_status("first").await.unwrap().unwrap(), first);
        assert_eq!(monitor.get_status("second").await.unwrap().unwrap(), second);
    }
}
