//! # litesnap-sqlite
//!
//! Point-in-time snapshots of SQLite databases that another process may be
//! writing to, including changes still sitting in the `-wal` or `-journal`
//! sidecar files.
//!
//! ## Steps
//!
//! 1. Enumerate the database file and its sidecars (`-shm` is skipped)
//! 2. Copy them into a private staging directory, retrying until no file
//!    changed during a round
//! 3. Open the staged copy normally, so SQLite replays the sidecars, and
//!    stream it into the destination with the backup API
//! 4. For file destinations, `PRAGMA wal_checkpoint(TRUNCATE)` so the result
//!    is one self-contained file
//!
//! ## Example
//!
//! ```no_run
//! use litesnap_sqlite::{SnapshotOptions, backup_to_file, backup_to_memory};
//!
//! let options = SnapshotOptions::default();
//!
//! // Copy into memory and query the snapshot
//! let conn = backup_to_memory("/var/lib/app/state.db", &options)?;
//!
//! // Or write a standalone copy to disk
//! backup_to_file("/var/lib/app/state.db", "/backups/state.db", &options)?;
//! # Ok::<(), litesnap_sqlite::SnapshotError>(())
//! ```

mod checkpoint;
mod config;
mod engine;
mod error;
mod snapshot;

pub use checkpoint::{CheckpointResult, checkpoint_truncate};
pub use config::{BackupOptions, OpenOptions, SnapshotOptions};
pub use engine::{BackupSession, BackupStats, SourceKind, open_source};
pub use error::{Result, SnapshotError};
pub use snapshot::{Destination, Snapshot, backup, backup_to_file, backup_to_memory};

pub use litesnap_core::{AtomicCopy, CopyOutcome, CopyStrategy, FileSignature};
pub use rusqlite::backup::Progress;
pub use rusqlite::{Connection, OpenFlags};
