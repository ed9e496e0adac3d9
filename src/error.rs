//! Error types for archive runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end an archive run.
///
/// Per-item problems (unreadable directories, failed stats, symlinks, read errors) are not
/// represented here; they are logged and counted in the run summary.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A directory with an absolute path was registered. Archives only hold relative paths.
    #[error("unable to process archive with absolute path reference: {}", path.display())]
    AbsolutePath { path: PathBuf },

    /// Writing to the output sink failed.
    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),

    /// A root was registered after the run had already finished.
    #[error("archive run already finished; no more directories can be added")]
    Closed,

    /// A pipeline thread could not be started.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline thread panicked.
    #[error("{role} thread panicked")]
    WorkerPanicked { role: &'static str },
}

impl ArchiveError {
    /// True for configuration errors the caller can fix by changing its input.
    pub fn is_absolute_path(&self) -> bool {
        matches!(self, ArchiveError::AbsolutePath { .. })
    }
}
