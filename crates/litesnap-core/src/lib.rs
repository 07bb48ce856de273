//! # litesnap-core
//!
//! Filesystem primitives for snapshotting a database that another process
//! may be writing to.
//!
//! ## Components
//!
//! - **[`DatabaseFileSet`]**: the primary database file and the sidecars
//!   (`-wal`, `-journal`) that must travel with it
//! - **[`CopyStrategy`]** / **[`AtomicCopy`]**: copy one file and report whether
//!   the source changed while it was being read
//! - **[`StagingArea`]** / **[`stage_files`]**: copy a whole file set into a
//!   private directory, retrying rounds until none of the files moved
//!
//! Nothing here talks to SQLite. The `litesnap-sqlite` crate opens the staged
//! copy and runs the backup.

pub mod copy;
pub mod error;
pub mod files;
pub mod staging;

pub use copy::{AtomicCopy, CopyOutcome, CopyStrategy, FileSignature};
pub use error::{Result, StageError};
pub use files::{DatabaseFileSet, enumerate_database_files};
pub use staging::{StageReport, StagingArea, stage_files};
