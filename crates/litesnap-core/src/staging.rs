//! Staging: copying a database's files into a private directory
//!
//! A staging round copies every file of a [`DatabaseFileSet`] with a
//! [`CopyStrategy`]. The round is clean only if every copy was clean. Rounds
//! repeat until one is clean or the retry budget runs out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::copy::{CopyOutcome, CopyStrategy};
use crate::error::{Result, StageError};
use crate::files::DatabaseFileSet;

const STAGING_PREFIX: &str = "litesnap-";

/// Outcome of a staging run
#[derive(Debug, Clone)]
pub struct StageReport {
    /// A full round completed without any file changing underneath it
    pub clean: bool,
    /// Number of rounds that ran, between 1 and `retry + 1`
    pub rounds: u64,
    /// Per-file outcomes of the last round, in enumeration order
    pub outcomes: Vec<CopyOutcome>,
}

impl StageReport {
    /// Staged copy of the primary database file
    pub fn staged_primary(&self) -> Option<&Path> {
        self.outcomes.first().map(|o| o.staged.as_path())
    }
}

/// Process-private temporary directory holding staged copies.
///
/// The directory and everything in it is removed when the area is dropped,
/// whichever way the owning operation exits.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a staging directory under the system temp directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|e| StageError::io(std::env::temp_dir(), e))?;
        tracing::debug!(staging_dir = %dir.path().display(), "Created staging directory");
        Ok(Self { dir })
    }

    /// Create a staging directory under `parent`
    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| StageError::io(parent, e))?;
        tracing::debug!(staging_dir = %dir.path().display(), "Created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stage `files` into this area. See [`stage_files`].
    pub fn stage(
        &self,
        files: &DatabaseFileSet,
        strategy: &dyn CopyStrategy,
        retry: u32,
    ) -> Result<StageReport> {
        stage_files(files, self.path(), strategy, retry)
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| StageError::io(&path, e))?;
        tracing::debug!(staging_dir = %path.display(), "Removed staging directory");
        Ok(())
    }
}

/// Copy every file in `files` into `staging_dir`, retrying up to `retry` extra rounds.
///
/// Each file lands at `staging_dir/<file name>`, so sidecars keep the names
/// SQLite looks for next to the staged primary. A dirty result is not an
/// error: the files are copied either way, but may come from different
/// instants.
///
/// A sidecar that disappears between enumeration and copying is dropped from
/// the set and makes the round dirty. A missing primary is an error.
pub fn stage_files(
    files: &DatabaseFileSet,
    staging_dir: &Path,
    strategy: &dyn CopyStrategy,
    retry: u32,
) -> Result<StageReport> {
    if !staging_dir.is_dir() {
        return Err(StageError::NotADirectory {
            path: staging_dir.to_path_buf(),
        });
    }

    let mut files = files.clone();
    let max_rounds = u64::from(retry) + 1;
    let mut outcomes = Vec::new();

    for round in 1..=max_rounds {
        outcomes.clear();
        let mut clean = true;
        let mut vanished = Vec::new();

        for source in files.iter() {
            let staged = staged_path(staging_dir, source)?;
            match strategy.copy(source, &staged) {
                Ok(copied_clean) => {
                    clean &= copied_clean;
                    outcomes.push(CopyOutcome {
                        source: source.to_path_buf(),
                        staged,
                        clean: copied_clean,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound && source != files.primary() => {
                    tracing::debug!(
                        sidecar = %source.display(),
                        round,
                        "Sidecar disappeared while staging"
                    );
                    remove_stale(&staged)?;
                    vanished.push(source.to_path_buf());
                    clean = false;
                }
                Err(e) => return Err(StageError::io(source, e)),
            }
        }

        for sidecar in &vanished {
            files.remove_sidecar(sidecar);
        }

        if clean {
            tracing::debug!(rounds = round, files = files.len(), "Staged database files");
            return Ok(StageReport {
                clean: true,
                rounds: round,
                outcomes,
            });
        }

        tracing::debug!(round, max_rounds, "Staging round observed concurrent modification");
    }

    Ok(StageReport {
        clean: false,
        rounds: max_rounds,
        outcomes,
    })
}

fn staged_path(staging_dir: &Path, source: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        StageError::io(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    Ok(staging_dir.join(name))
}

fn remove_stale(staged: &Path) -> Result<()> {
    match fs::remove_file(staged) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageError::io(staged, e)),
    }
}
