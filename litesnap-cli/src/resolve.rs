//! Source and destination path policy for the CLI
//!
//! The library accepts any destination path. The CLI is stricter: it never
//! overwrites an existing file, and a directory destination takes the
//! source's file name.

use std::io;
use std::path::{Path, PathBuf};

use litesnap::sqlite::SnapshotError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Source database '{}' does not exist or is not a file", path.display())]
    SourceNotAFile { path: PathBuf },

    #[error("Computed DESTINATION '{}' using SOURCE_DATABASE name already exists", path.display())]
    ComputedDestinationExists { path: PathBuf },

    #[error("Target DESTINATION already exists: '{}'", path.display())]
    DestinationExists { path: PathBuf },

    #[error("Target DESTINATION '{}' is not a directory or a file", path.display())]
    DestinationUnsupported { path: PathBuf },

    #[error("Parent directory '{}' does not exist", path.display())]
    MissingParent { path: PathBuf },

    #[error("Could not resolve path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The source must be an existing regular file
pub fn resolve_source(source: &Path) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(CliError::SourceNotAFile {
            path: source.to_path_buf(),
        });
    }
    absolute(source)
}

/// Work out the file the snapshot is written to.
///
/// - existing directory: `<dir>/<source file name>`, which must not exist
/// - existing file: rejected
/// - anything else that exists: rejected
/// - missing path: its parent directory must exist
pub fn resolve_destination(source: &Path, destination: &Path) -> Result<PathBuf> {
    if destination.exists() {
        if destination.is_dir() {
            let name = source
                .file_name()
                .ok_or_else(|| CliError::SourceNotAFile {
                    path: source.to_path_buf(),
                })?;
            let target = absolute(&destination.join(name))?;
            if target.exists() {
                return Err(CliError::ComputedDestinationExists { path: target });
            }
            return Ok(target);
        }
        if destination.is_file() {
            return Err(CliError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }
        return Err(CliError::DestinationUnsupported {
            path: destination.to_path_buf(),
        });
    }

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(CliError::MissingParent {
            path: parent.to_path_buf(),
        });
    }
    absolute(destination)
}
