//! Discovery of the on-disk files that make up one SQLite database

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StageError};

/// Suffix of the shared-memory index. It is tied to the processes that have
/// the database open and is rebuilt by whoever opens the copy, so it is never
/// copied.
const SHARED_MEMORY_SUFFIX: &[u8] = b"-shm";

/// The primary database file followed by its sidecar files.
///
/// The primary is always present and always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseFileSet {
    files: Vec<PathBuf>,
}

impl DatabaseFileSet {
    /// Build a set from a primary path and explicit sidecars
    pub fn new(primary: impl Into<PathBuf>, sidecars: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut files = vec![primary.into()];
        files.extend(sidecars);
        Self { files }
    }

    pub fn primary(&self) -> &Path {
        &self.files[0]
    }

    pub fn sidecars(&self) -> &[PathBuf] {
        &self.files[1..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// A file set always contains its primary
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Drop a sidecar that no longer exists. The primary cannot be removed.
    pub(crate) fn remove_sidecar(&mut self, path: &Path) -> bool {
        match self.files[1..].iter().position(|p| p == path) {
            Some(idx) => {
                self.files.remove(idx + 1);
                true
            }
            None => false,
        }
    }
}

/// List the primary database file plus every sibling named `<primary>-<suffix>`.
///
/// `-wal` and `-journal` files are included since they hold data not yet
/// merged into the primary. `-shm` files are skipped. Sidecars come back in
/// directory-listing order.
pub fn enumerate_database_files(primary: &Path) -> Result<DatabaseFileSet> {
    match fs::metadata(primary) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StageError::PrimaryNotFound {
                path: primary.to_path_buf(),
            });
        }
        Err(e) => return Err(StageError::io(primary, e)),
    }

    let Some(name) = primary.file_name() else {
        return Err(StageError::PrimaryNotFound {
            path: primary.to_path_buf(),
        });
    };

    let parent = match primary.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut prefix = name.as_encoded_bytes().to_vec();
    prefix.push(b'-');

    let mut sidecars = Vec::new();
    let entries = fs::read_dir(parent).map_err(|e| StageError::io(parent, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StageError::io(parent, e))?;
        let file_name = entry.file_name();
        if !is_sidecar_name(&file_name, &prefix) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        tracing::trace!(sidecar = %path.display(), "Found database sidecar");
        sidecars.push(path);
    }

    Ok(DatabaseFileSet::new(primary, sidecars))
}

fn is_sidecar_name(file_name: &OsStr, prefix: &[u8]) -> bool {
    let bytes = file_name.as_encoded_bytes();
    bytes.starts_with(prefix) && !bytes.ends_with(SHARED_MEMORY_SUFFIX)
}
