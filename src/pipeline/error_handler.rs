use log::{debug, warn};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ArchiveSummary;
use crate::error::ArchiveError;

/// First fatal error raised by any worker. Later errors are logged and dropped.
#[derive(Clone, Debug, Default)]
pub struct FirstError(Arc<Mutex<Option<ArchiveError>>>);

impl FirstError {
    /// Record `err` unless an earlier error is already held.
    pub fn record(&self, err: ArchiveError) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(first) => debug!("additional fatal error ({}); keeping first: {}", err, first),
            None => *slot = Some(err),
        }
    }

    pub fn take(&self) -> Option<ArchiveError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Outcome of the pipeline threads after they have been joined.
pub struct RunOutcome {
    pub write: io::Result<()>,
    pub flush: io::Result<()>,
    pub panicked: Option<&'static str>,
}

/// Turn a drained run into its result. Sink errors win over worker errors, which win over
/// the recorded fatal error; a clean run logs how many entries were skipped.
pub fn check_run_result(
    outcome: RunOutcome,
    first_error: &FirstError,
    summary: ArchiveSummary,
) -> Result<ArchiveSummary, ArchiveError> {
    outcome.write?;
    outcome.flush?;
    if let Some(role) = outcome.panicked {
        return Err(ArchiveError::WorkerPanicked { role });
    }
    if let Some(err) = first_error.take() {
        return Err(err);
    }
    if summary.skipped > 0 {
        warn!(
            "Skipped {} entries (unreadable, symlinks or special files)",
            summary.skipped
        );
    }
    if summary.truncated > 0 {
        warn!(
            "{} files were archived incomplete after read errors",
            summary.truncated
        );
    }
    Ok(summary)
}
