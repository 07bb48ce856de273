//! # litesnap
//!
//! Consistent snapshots of SQLite databases that are in use by another
//! process, including changes that exist only in the `-wal` or `-journal`
//! sidecar files.
//!
//! - [`stage`]: file enumeration, copy-and-verify and staging (`litesnap-core`)
//! - [`sqlite`]: backup, checkpoint and the [`backup`] entry point (`litesnap-sqlite`)
//!
//! The most common entry points are re-exported at the top level.

pub use litesnap_core as stage;
pub use litesnap_sqlite as sqlite;

pub use litesnap_sqlite::{
    AtomicCopy, BackupOptions, Connection, CopyStrategy, Destination, OpenOptions, Snapshot,
    SnapshotError, SnapshotOptions, backup, backup_to_file, backup_to_memory,
};
