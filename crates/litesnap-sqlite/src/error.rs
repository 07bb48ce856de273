//! Error types for snapshot operations

use std::path::PathBuf;

use litesnap_core::StageError;
use thiserror::Error;

/// Result type for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Errors that can occur while snapshotting a database
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The source database does not exist. Raised before any I/O.
    #[error("Source database not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The requested source/destination combination cannot work
    #[error("Invalid snapshot configuration: {reason}")]
    Configuration { reason: String },

    /// Strict mode was on and no staging round finished without a file changing
    #[error(
        "While in strict mode, failed to copy all database files without any of them changing \
         ({retries} retries, {rounds} attempts). Increase copy_retry or disable copy_retry_strict"
    )]
    StagingExhausted { retries: u32, rounds: u64 },

    /// Copying files into the staging directory failed
    #[error("Staging failed: {0}")]
    Staging(#[from] StageError),

    /// Error reported by SQLite, passed through unchanged
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The destination checkpoint ran but could not finish
    #[error("WAL checkpoint of {} did not complete: database busy", path.display())]
    CheckpointBusy { path: PathBuf },
}

impl SnapshotError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        SnapshotError::Configuration {
            reason: reason.into(),
        }
    }

    /// True for [`SnapshotError::SourceNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SnapshotError::SourceNotFound { .. })
    }
}
