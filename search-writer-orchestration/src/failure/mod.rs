//! Failure reporting for orchestrated work.
//!
//! Per-work failures always reach the caller through the work's result
//! future. The failure handler is the second channel: background
//! orchestrators have no caller waiting on results, so every failed
//! changeset is additionally reported here, batched into one report per
//! changeset with the root cause first.

use std::sync::Arc;

use tracing::{error, warn};

use crate::errors::WorkError;
use search_writer_shared::WorkInfo;

/// A work that failed, with the error it failed with.
#[derive(Debug, Clone)]
pub struct FailedWork {
    /// Metadata identifying the work.
    pub info: WorkInfo,
    /// The error the work completed with.
    pub error: Arc<WorkError>,
}

/// Everything that went wrong in one changeset.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// The first failure, which triggered any skipping that followed.
    pub root_cause: Arc<WorkError>,
    /// Further failures in the same changeset, in occurrence order.
    pub additional_causes: Vec<Arc<WorkError>>,
    /// Every work that failed.
    pub failed_works: Vec<FailedWork>,
    /// Every work that was skipped because of an earlier failure.
    pub skipped_works: Vec<WorkInfo>,
}

/// Sink for changeset failure reports.
///
/// Handlers must not block: they are called from the task that executed the
/// changeset. Hand off to a channel if the report needs slow processing.
pub trait FailureHandler: Send + Sync {
    /// Handle one changeset's failure report. Called at most once per
    /// changeset, after all its works have completed.
    fn handle(&self, report: FailureReport);
}

/// Failure handler that writes reports to the tracing log.
///
/// The default handler. One error line summarizes the changeset, then one
/// line per failed and skipped work.
pub struct LoggingFailureHandler;

impl FailureHandler for LoggingFailureHandler {
    fn handle(&self, report: FailureReport) {
        error!(
            root_cause = %report.root_cause,
            failed = report.failed_works.len(),
            skipped = report.skipped_works.len(),
            "Changeset failed"
        );
        for failed in &report.failed_works {
            error!(work = %failed.info, error = %failed.error, "Work failed");
        }
        for skipped in &report.skipped_works {
            warn!(work = %skipped, "Work skipped after earlier failure");
        }
    }
}

/// Accumulates failures while a sequence runs and produces the report.
#[derive(Default)]
pub(crate) struct FailureCollector {
    root_cause: Option<Arc<WorkError>>,
    additional_causes: Vec<Arc<WorkError>>,
    failed_works: Vec<FailedWork>,
    skipped_works: Vec<WorkInfo>,
}

impl FailureCollector {
    pub(crate) fn record_failure(&mut self, info: WorkInfo, error: Arc<WorkError>) {
        if self.root_cause.is_none() {
            self.root_cause = Some(error.clone());
        } else {
            self.additional_causes.push(error.clone());
        }
        self.failed_works.push(FailedWork { info, error });
    }

    pub(crate) fn record_skipped(&mut self, info: WorkInfo) {
        self.skipped_works.push(info);
    }

    /// The report, if anything failed. Skips alone cannot happen: a work is
    /// only skipped after some work failed.
    pub(crate) fn finish(self) -> Option<FailureReport> {
        let root_cause = self.root_cause?;
        Some(FailureReport {
            root_cause,
            additional_causes: self.additional_causes,
            failed_works: self.failed_works,
            skipped_works: self.skipped_works,
        })
    }
}
