//! Error types for staging operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for staging operations
pub type Result<T> = std::result::Result<T, StageError>;

/// Errors raised while enumerating or staging database files.
///
/// A staging round that observed concurrent modification is *not* an error;
/// it is reported through [`crate::StageReport::clean`].
#[derive(Debug, Error)]
pub enum StageError {
    /// The primary database file does not exist
    #[error("Database file not found: {}", path.display())]
    PrimaryNotFound { path: PathBuf },

    /// The staging target is missing or is not a directory
    #[error("Expected a staging directory, got {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Filesystem failure on a specific path
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }
}
