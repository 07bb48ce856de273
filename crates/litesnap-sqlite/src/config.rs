//! Snapshot configuration

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use litesnap_core::{AtomicCopy, CopyStrategy};
use rusqlite::OpenFlags;
use rusqlite::backup::Progress;

/// Options for [`crate::backup`]
///
/// # Examples
///
/// ```
/// use litesnap_sqlite::SnapshotOptions;
///
/// // Use defaults: stage, retry 100 times, strict, checkpoint
/// let options = SnapshotOptions::default();
///
/// // Tolerate a source that never holds still
/// let options = SnapshotOptions::default()
///     .with_copy_retry(10)
///     .with_copy_retry_strict(false);
/// assert_eq!(options.copy_retry, 10);
/// ```
#[derive(Clone)]
pub struct SnapshotOptions {
    /// Run `PRAGMA wal_checkpoint(TRUNCATE)` on a file destination after the backup
    ///
    /// Default: true
    pub wal_checkpoint: bool,

    /// Copy the source files to a private staging directory before the backup
    ///
    /// Disabling this runs the backup directly against the live files, which
    /// is only safe when nothing else is writing to them.
    ///
    /// Default: true
    pub use_staging: bool,

    /// How many extra staging rounds to run when files change mid-copy
    ///
    /// Default: 100
    pub copy_retry: u32,

    /// Fail instead of continuing when no staging round was clean
    ///
    /// Default: true
    pub copy_retry_strict: bool,

    /// Parent directory for the staging area, system temp dir when unset
    pub staging_parent: Option<PathBuf>,

    /// How the backup source is opened
    pub open_options: OpenOptions,

    /// How pages are streamed to the destination
    pub backup_options: BackupOptions,

    /// Copy-and-verify algorithm used while staging
    ///
    /// Default: [`AtomicCopy`]
    pub copy_strategy: Arc<dyn CopyStrategy>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            wal_checkpoint: true,
            use_staging: true,
            copy_retry: 100,
            copy_retry_strict: true,
            staging_parent: None,
            open_options: OpenOptions::default(),
            backup_options: BackupOptions::default(),
            copy_strategy: Arc::new(AtomicCopy),
        }
    }
}

impl SnapshotOptions {
    /// Defaults, but a dirty staging run is logged and the backup proceeds
    pub fn lenient() -> Self {
        Self {
            copy_retry_strict: false,
            ..Self::default()
        }
    }

    pub fn with_wal_checkpoint(mut self, enabled: bool) -> Self {
        self.wal_checkpoint = enabled;
        self
    }

    pub fn with_staging(mut self, enabled: bool) -> Self {
        self.use_staging = enabled;
        self
    }

    pub fn with_copy_retry(mut self, retry: u32) -> Self {
        self.copy_retry = retry;
        self
    }

    pub fn with_copy_retry_strict(mut self, strict: bool) -> Self {
        self.copy_retry_strict = strict;
        self
    }

    pub fn with_staging_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.staging_parent = Some(parent.into());
        self
    }

    pub fn with_open_options(mut self, open_options: OpenOptions) -> Self {
        self.open_options = open_options;
        self
    }

    pub fn with_backup_options(mut self, backup_options: BackupOptions) -> Self {
        self.backup_options = backup_options;
        self
    }

    pub fn with_copy_strategy(mut self, strategy: Arc<dyn CopyStrategy>) -> Self {
        self.copy_strategy = strategy;
        self
    }
}

impl fmt::Debug for SnapshotOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotOptions")
            .field("wal_checkpoint", &self.wal_checkpoint)
            .field("use_staging", &self.use_staging)
            .field("copy_retry", &self.copy_retry)
            .field("copy_retry_strict", &self.copy_retry_strict)
            .field("staging_parent", &self.staging_parent)
            .field("open_options", &self.open_options)
            .field("backup_options", &self.backup_options)
            .finish_non_exhaustive()
    }
}

/// Connection settings for the backup source
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Explicit open flags. When unset, a staged copy is opened read-write and
    /// a live source read-only.
    pub flags: Option<OpenFlags>,

    /// Name of a registered VFS to open the source with
    pub vfs: Option<String>,

    /// Busy handler timeout for the source connection
    pub busy_timeout: Option<Duration>,
}

impl OpenOptions {
    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_vfs(mut self, vfs: impl Into<String>) -> Self {
        self.vfs = Some(vfs.into());
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub(crate) fn flags_for(&self, live: bool) -> OpenFlags {
        if let Some(flags) = self.flags {
            return flags;
        }
        let access = if live {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }
}

/// Page streaming settings for the backup step
#[derive(Debug, Clone, Copy)]
pub struct BackupOptions {
    /// Pages copied per step. Negative copies everything in one step; zero is rejected.
    ///
    /// Default: -1
    pub pages_per_step: i32,

    /// Sleep after a step that reported the source busy or locked
    ///
    /// Default: 250ms
    pub pause_between_steps: Duration,

    /// Called after every step with the remaining and total page counts
    pub progress: Option<fn(Progress)>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            pages_per_step: -1,
            pause_between_steps: Duration::from_millis(250),
            progress: None,
        }
    }
}

impl BackupOptions {
    pub fn with_pages_per_step(mut self, pages: i32) -> Self {
        self.pages_per_step = pages;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between_steps = pause;
        self
    }

    pub fn with_progress(mut self, progress: fn(Progress)) -> Self {
        self.progress = Some(progress);
        self
    }
}
