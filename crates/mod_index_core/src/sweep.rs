//! Hard-deletes soft-deleted blob objects once their grace period elapsed.
//!
//! The sweep is one sequential walk over the blob listing. A failed delete is
//! recorded and the walk continues; only a failed listing aborts the sweep,
//! and the error carries the counts reached so far.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::walk_pages;
use crate::store::{BlobObject, BlobStore, StoreError};

pub const SWEEP_PAGE_SIZE: usize = 1000;
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 5;
pub const MARKER_FLAG_KEY: &str = "marked-for-deletion";
pub const MARKER_TIMESTAMP_KEY: &str = "deleted-at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    /// No marker, or the flag is not set.
    Live,
    Marked { deleted_at_ms: i64 },
    /// Flag set but the timestamp is missing or not an integer.
    MarkedUnreadable { raw: Option<String> },
}

fn metadata_value<'a>(metadata: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

pub fn inspect_marker(metadata: &BTreeMap<String, String>) -> MarkerState {
    let flagged = metadata_value(metadata, MARKER_FLAG_KEY)
        .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
    if !flagged {
        return MarkerState::Live;
    }

    let raw = metadata_value(metadata, MARKER_TIMESTAMP_KEY);
    match raw.map(str::parse::<i64>) {
        Some(Ok(deleted_at_ms)) => MarkerState::Marked { deleted_at_ms },
        _ => MarkerState::MarkedUnreadable {
            raw: raw.map(str::to_string),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub grace_period: Duration,
    pub page_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(DEFAULT_GRACE_PERIOD_DAYS),
            page_size: SWEEP_PAGE_SIZE,
        }
    }
}

impl SweepConfig {
    /// Objects marked at or before the cutoff are deleted.
    pub fn cutoff_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.grace_period.num_milliseconds())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionFailure {
    pub key: String,
    #[serde(rename = "errorMessage")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub marked: usize,
    pub deleted: usize,
    pub errors: usize,
    pub failures: Vec<DeletionFailure>,
    pub pages: usize,
    /// The stop check ended the sweep before the listing was exhausted.
    pub cancelled: bool,
}

#[derive(Debug, Error)]
#[error(
    "sweep aborted after {} pages ({} scanned, {} deleted, {} errors): {source}",
    report.pages,
    report.scanned,
    report.deleted,
    report.errors
)]
pub struct SweepError {
    #[source]
    pub source: StoreError,
    pub report: SweepReport,
}

/// Runs one sweep with a cutoff fixed at `now_ms - grace_period`.
///
/// `should_stop` is consulted after each page has been fully processed and
/// never in the middle of a page.
pub fn run_sweep<S, F>(
    store: &S,
    config: &SweepConfig,
    now_ms: i64,
    should_stop: F,
) -> Result<SweepReport, SweepError>
where
    S: BlobStore + ?Sized,
    F: Fn() -> bool,
{
    let cutoff_ms = config.cutoff_ms(now_ms);
    let mut report = SweepReport::default();

    let walked = walk_pages(
        |cursor| store.list(cursor, config.page_size),
        |objects| {
            report.pages += 1;
            for object in objects {
                sweep_object(store, object, cutoff_ms, now_ms, &mut report);
            }
            if should_stop() {
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        },
    );

    match walked {
        Ok(stats) => {
            // A stop request on the final page changes nothing.
            report.cancelled = stats.stopped_early;
            Ok(report)
        }
        Err(source) => Err(SweepError { source, report }),
    }
}

fn sweep_object<S>(
    store: &S,
    object: BlobObject,
    cutoff_ms: i64,
    now_ms: i64,
    report: &mut SweepReport,
) where
    S: BlobStore + ?Sized,
{
    report.scanned += 1;

    let deleted_at_ms = match inspect_marker(&object.metadata) {
        MarkerState::Live => return,
        MarkerState::MarkedUnreadable { raw } => {
            report.marked += 1;
            tracing::warn!(key = %object.key, raw = ?raw, "unreadable deletion timestamp; skipping");
            return;
        }
        MarkerState::Marked { deleted_at_ms } => {
            report.marked += 1;
            deleted_at_ms
        }
    };

    if deleted_at_ms > cutoff_ms {
        let remaining = Duration::milliseconds(deleted_at_ms.saturating_sub(cutoff_ms));
        tracing::debug!(
            key = %object.key,
            deleted_at_ms,
            marked_for_ms = now_ms.saturating_sub(deleted_at_ms),
            days_remaining = remaining.num_days(),
            "within grace period"
        );
        return;
    }

    match store.delete(&object.key) {
        Ok(()) => {
            report.deleted += 1;
            tracing::info!(key = %object.key, deleted_at_ms, "hard-deleted soft-deleted object");
        }
        Err(error) => {
            report.errors += 1;
            tracing::error!(key = %object.key, %error, "failed to delete object");
            report.failures.push(DeletionFailure {
                key: object.key,
                error: error.to_string(),
            });
        }
    }
}
