use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

use crate::config::CleanupConfig;
use crate::runtime::store::BlobStore;
use crate::runtime::sweep::{run_sweep, DeletionFailure, SweepError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub status: &'static str,
    pub scanned: usize,
    pub marked: usize,
    pub deleted: usize,
    pub errors: usize,
    pub failures: Vec<DeletionFailure>,
    pub pages: usize,
    pub cancelled: bool,
    pub cutoff: String,
}

/// Runs one grace-period sweep and summarizes it for the scheduled invocation.
///
/// Per-object delete failures are reported in the summary. Only a listing
/// failure fails the invocation.
pub fn handle_cleanup<S, F>(
    store: &S,
    config: &CleanupConfig,
    now: DateTime<Utc>,
    should_stop: F,
) -> Result<CleanupSummary, SweepError>
where
    S: BlobStore + ?Sized,
    F: Fn() -> bool,
{
    let sweep_config = config.sweep_config();
    let now_ms = now.timestamp_millis();
    let cutoff_ms = sweep_config.cutoff_ms(now_ms);
    let cutoff = Utc
        .timestamp_millis_opt(cutoff_ms)
        .single()
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| cutoff_ms.to_string());

    tracing::info!(
        component = "cleanup_handler",
        bucket = %config.bucket,
        grace_period_days = config.grace_period_days,
        cutoff = %cutoff,
        "sweep_started"
    );

    let report = match run_sweep(store, &sweep_config, now_ms, should_stop) {
        Ok(report) => report,
        Err(error) => {
            tracing::error!(
                component = "cleanup_handler",
                %error,
                pages = error.report.pages,
                deleted = error.report.deleted,
                "sweep_failed"
            );
            return Err(error);
        }
    };

    let status = if report.cancelled {
        "partial"
    } else if report.errors > 0 {
        "completed_with_errors"
    } else {
        "completed"
    };
    tracing::info!(
        component = "cleanup_handler",
        status,
        scanned = report.scanned,
        marked = report.marked,
        deleted = report.deleted,
        errors = report.errors,
        pages = report.pages,
        "sweep_completed"
    );

    Ok(CleanupSummary {
        status,
        scanned: report.scanned,
        marked: report.marked,
        deleted: report.deleted,
        errors: report.errors,
        failures: report.failures,
        pages: report.pages,
        cancelled: report.cancelled,
        cutoff,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use mod_index_core::memory::MemoryBlobStore;

    use super::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn config(grace_period_days: i64) -> CleanupConfig {
        CleanupConfig {
            bucket: "mod-blobs".to_string(),
            grace_period_days,
            deadline_margin_ms: 10_000,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn deletes_expired_objects_and_reports_cutoff() {
        let now_ms = now().timestamp_millis();
        let store = MemoryBlobStore::new(2);
        store.insert_live("live.zip");
        store.insert_marked("old.zip", now_ms - 6 * DAY_MS);
        store.insert_marked("recent.zip", now_ms - DAY_MS);

        let summary =
            handle_cleanup(&store, &config(5), now(), || false).expect("sweep should succeed");

        assert_eq!(summary.status, "completed");
        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.marked, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.cutoff, "2026-02-24T12:00:00.000Z");
        assert_eq!(store.keys(), vec!["live.zip", "recent.zip"]);
    }

    #[test]
    fn delete_failures_complete_with_errors() {
        let now_ms = now().timestamp_millis();
        let store = MemoryBlobStore::new(10);
        store.insert_marked("a.zip", now_ms - 10 * DAY_MS);
        store.insert_marked("b.zip", now_ms - 10 * DAY_MS);
        store.fail_delete("a.zip");

        let summary =
            handle_cleanup(&store, &config(5), now(), || false).expect("sweep should succeed");

        assert_eq!(summary.status, "completed_with_errors");
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failures[0].key, "a.zip");
        assert!(store.contains("a.zip"));
    }

    #[test]
    fn stop_request_yields_partial_summary() {
        let now_ms = now().timestamp_millis();
        let store = MemoryBlobStore::new(1);
        for key in ["a.zip", "b.zip", "c.zip"] {
            store.insert_marked(key, now_ms - 10 * DAY_MS);
        }
        let pages_seen = Cell::new(0);

        let summary = handle_cleanup(&store, &config(5), now(), || {
            pages_seen.set(pages_seen.get() + 1);
            pages_seen.get() >= 2
        })
        .expect("sweep should succeed");

        assert_eq!(summary.status, "partial");
        assert!(summary.cancelled);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.deleted, 2);
        assert_eq!(store.keys(), vec!["c.zip"]);
    }

    #[test]
    fn listing_failure_fails_the_invocation() {
        let now_ms = now().timestamp_millis();
        let store = MemoryBlobStore::new(1);
        store.insert_marked("a.zip", now_ms - 10 * DAY_MS);
        store.insert_marked("b.zip", now_ms - 10 * DAY_MS);
        store.fail_listing_after(1);

        let error = handle_cleanup(&store, &config(5), now(), || false)
            .expect_err("listing failure should surface");

        assert_eq!(error.report.deleted, 1);
        assert!(error.to_string().contains("sweep aborted after 1 pages"));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let store = MemoryBlobStore::new(10);
        let summary =
            handle_cleanup(&store, &config(5), now(), || false).expect("sweep should succeed");

        let value = serde_json::to_value(&summary).expect("summary should serialize");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["scanned"], 0);
        assert_eq!(value["cancelled"], false);
    }
}
