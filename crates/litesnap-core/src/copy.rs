//! Copy-then-verify file copying
//!
//! There is no lock shared with the process that owns the database, so a copy
//! can only be checked after the fact. [`AtomicCopy`] copies the file, compares
//! cheap metadata signatures and copies again until nothing moved underneath it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Copies one file and reports whether the copy is a single-instant image.
///
/// `Ok(true)` means the source was observed unchanged for the whole copy.
/// `Ok(false)` means the destination holds a complete copy but the source was
/// seen changing at some point during this call.
///
/// Implemented for closures, which is handy for tests and instrumentation:
///
/// ```rust
/// use litesnap_core::CopyStrategy;
/// use std::path::Path;
///
/// let plain_copy = |src: &Path, dst: &Path| std::fs::copy(src, dst).map(|_| true);
/// # let _: &dyn CopyStrategy = &plain_copy;
/// ```
pub trait CopyStrategy: Send + Sync {
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<bool>;
}

impl<F> CopyStrategy for F
where
    F: Fn(&Path, &Path) -> io::Result<bool> + Send + Sync,
{
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<bool> {
        self(src, dst)
    }
}

/// Shallow comparison key: size plus modification time.
///
/// Two reads with the same signature are treated as reads of the same
/// content. Writes that keep both size and mtime are not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileSignature {
    pub fn of(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Result of copying a single file during a staging round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub source: PathBuf,
    pub staged: PathBuf,
    /// Copied without observing a concurrent modification
    pub clean: bool,
}

/// Default copy strategy: copy, verify, and retry until the source holds still.
///
/// The loop inside a single call is unbounded. The stager's round budget is
/// what bounds the total work.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicCopy;

impl AtomicCopy {
    pub fn new() -> Self {
        Self
    }
}

impl CopyStrategy for AtomicCopy {
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<bool> {
        let mut attempts: u64 = 0;
        let mut changed = false;

        loop {
            attempts += 1;
            let before = FileSignature::of(src)?;
            fs::copy(src, dst)?;
            let after = FileSignature::of(src)?;
            let copied_len = fs::metadata(dst)?.len();

            if before == after && copied_len == after.len {
                if changed {
                    tracing::debug!(
                        source = %src.display(),
                        attempts,
                        "Source settled after concurrent modification"
                    );
                }
                return Ok(!changed);
            }

            changed = true;
            tracing::debug!(
                source = %src.display(),
                attempt = attempts,
                before_len = before.len,
                after_len = after.len,
                copied_len,
                "Source changed while copying, retrying"
            );
        }
    }
}
