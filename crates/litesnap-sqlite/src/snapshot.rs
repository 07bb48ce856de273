//! Snapshot orchestration
//!
//! One call moves through `Init -> Staging -> Staged -> BackingUp ->
//! Finalizing -> Done`, or to `Failed` from any of them. The staging area and
//! both connections are owned values, so they are released on every exit
//! path, early validation failures included.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use litesnap_core::{StageError, StagingArea, enumerate_database_files};
use rusqlite::Connection;

use crate::checkpoint::{CheckpointResult, checkpoint_truncate};
use crate::config::SnapshotOptions;
use crate::engine::{BackupSession, SourceKind, open_source};
use crate::error::{Result, SnapshotError};

const LIVE_SOURCE_WARNING: &str = "Copying a database in use by another application without \
     staging it first could result in corrupt data or incorrect results. Only use this if you \
     know the source database is not being modified";

/// Where the snapshot is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A fresh in-memory database handed back to the caller
    Memory,
    /// A database file; the path must not hold a database already
    File(PathBuf),
}

impl Destination {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Destination::File(path.into())
    }
}

impl From<Option<PathBuf>> for Destination {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(Destination::Memory, Destination::File)
    }
}

/// A finished snapshot
#[derive(Debug)]
pub enum Snapshot {
    /// Open in-memory connection; the caller owns it from here on
    Memory(Connection),
    /// Written to disk with every handle already closed
    File {
        path: PathBuf,
        /// Result of the destination checkpoint, when one ran
        checkpoint: Option<CheckpointResult>,
    },
}

impl Snapshot {
    /// The in-memory connection, if this snapshot has one
    pub fn into_connection(self) -> Option<Connection> {
        match self {
            Snapshot::Memory(conn) => Some(conn),
            Snapshot::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Staging,
    Staged,
    BackingUp,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Init => "init",
            State::Staging => "staging",
            State::Staged => "staged",
            State::BackingUp => "backing_up",
            State::Finalizing => "finalizing",
            State::Done => "done",
            State::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(state: State, source: &Path) {
    tracing::debug!(%state, source = %source.display(), "Snapshot state");
}

/// Snapshot `source`, including uncommitted WAL and journal state, into `destination`.
///
/// With staging enabled (the default) the source's files are first copied
/// into a private temporary directory, retrying until a round completes
/// without any file changing. The staged copy is then streamed into the
/// destination with SQLite's backup API. The source itself is never written.
///
/// # Examples
///
/// ```no_run
/// use litesnap_sqlite::{Destination, Snapshot, SnapshotOptions, backup};
///
/// let snapshot = backup("app.db", Destination::Memory, &SnapshotOptions::default())?;
/// if let Snapshot::Memory(conn) = snapshot {
///     let rows: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
///     println!("{rows} events");
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn backup(
    source: impl AsRef<Path>,
    destination: Destination,
    options: &SnapshotOptions,
) -> Result<Snapshot> {
    let source = source.as_ref();
    match run(source, destination, options) {
        Ok(snapshot) => {
            enter(State::Done, source);
            match &snapshot {
                Snapshot::Memory(_) => {
                    tracing::info!(source = %source.display(), "Snapshot copied into memory");
                }
                Snapshot::File { path, checkpoint } => {
                    tracing::info!(
                        source = %source.display(),
                        destination = %path.display(),
                        checkpointed = checkpoint.is_some(),
                        "Snapshot written"
                    );
                }
            }
            Ok(snapshot)
        }
        Err(e) => {
            tracing::debug!(
                state = %State::Failed,
                source = %source.display(),
                error = %e,
                "Snapshot state"
            );
            Err(e)
        }
    }
}

/// Snapshot into a new in-memory database and return the open connection
pub fn backup_to_memory(source: impl AsRef<Path>, options: &SnapshotOptions) -> Result<Connection> {
    match backup(source, Destination::Memory, options)? {
        Snapshot::Memory(conn) => Ok(conn),
        Snapshot::File { .. } => Err(SnapshotError::configuration(
            "file snapshot returned for a memory destination",
        )),
    }
}

/// Snapshot into the database file at `destination`; no handle is kept open
pub fn backup_to_file(
    source: impl AsRef<Path>,
    destination: impl Into<PathBuf>,
    options: &SnapshotOptions,
) -> Result<()> {
    backup(source, Destination::File(destination.into()), options).map(|_| ())
}

fn run(source: &Path, destination: Destination, options: &SnapshotOptions) -> Result<Snapshot> {
    enter(State::Init, source);
    validate(source, &destination, options)?;

    enter(State::Staging, source);
    let staging = if options.use_staging {
        Some(match &options.staging_parent {
            Some(parent) => StagingArea::new_in(parent)?,
            None => StagingArea::new()?,
        })
    } else {
        None
    };

    let (copy_from, kind) = match &staging {
        Some(area) => (stage(source, area, options)?, SourceKind::Staged),
        None => {
            tracing::warn!(source = %source.display(), "{}", LIVE_SOURCE_WARNING);
            (source.to_path_buf(), SourceKind::Live)
        }
    };
    enter(State::Staged, source);

    enter(State::BackingUp, source);
    let destination_conn = match &destination {
        Destination::Memory => Connection::open_in_memory()?,
        Destination::File(path) => Connection::open(path)?,
    };
    let source_conn = open_source(&copy_from, kind, &options.open_options)?;
    let mut session = BackupSession::new(source_conn, destination_conn);
    let stats = session.run(&options.backup_options)?;
    tracing::debug!(steps = stats.steps, pages = stats.pages, "Backup finished");
    let destination_conn = session.into_destination()?;

    enter(State::Finalizing, source);
    let checkpoint = match &destination {
        Destination::File(path) if options.wal_checkpoint => {
            let result = checkpoint_truncate(&destination_conn)?;
            if result.busy {
                return Err(SnapshotError::CheckpointBusy { path: path.clone() });
            }
            Some(result)
        }
        _ => None,
    };

    if let Some(area) = staging {
        let staging_dir = area.path().to_path_buf();
        if let Err(e) = area.close() {
            tracing::warn!(
                staging_dir = %staging_dir.display(),
                error = %e,
                "Failed to remove staging directory"
            );
        }
    }

    match destination {
        Destination::Memory => Ok(Snapshot::Memory(destination_conn)),
        Destination::File(path) => {
            destination_conn.close().map_err(|(_, e)| e)?;
            Ok(Snapshot::File { path, checkpoint })
        }
    }
}

fn stage(source: &Path, area: &StagingArea, options: &SnapshotOptions) -> Result<PathBuf> {
    let files = enumerate_database_files(source).map_err(|e| match e {
        StageError::PrimaryNotFound { path } => SnapshotError::SourceNotFound { path },
        other => other.into(),
    })?;
    tracing::debug!(
        source = %source.display(),
        sidecars = files.sidecars().len(),
        staging_dir = %area.path().display(),
        "Staging database files"
    );

    let report = area.stage(&files, options.copy_strategy.as_ref(), options.copy_retry)?;
    if !report.clean {
        if options.copy_retry_strict {
            return Err(SnapshotError::StagingExhausted {
                retries: options.copy_retry,
                rounds: report.rounds,
            });
        }
        tracing::warn!(
            source = %source.display(),
            rounds = report.rounds,
            "Database files kept changing while staging; continuing with a possibly mixed copy"
        );
    }

    match report.staged_primary() {
        Some(staged) => Ok(staged.to_path_buf()),
        None => Err(StageError::PrimaryNotFound {
            path: source.to_path_buf(),
        }
        .into()),
    }
}

fn validate(source: &Path, destination: &Destination, options: &SnapshotOptions) -> Result<()> {
    match fs::metadata(source) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(SnapshotError::configuration(format!(
                "source {} is a directory",
                source.display()
            )));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SnapshotError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(StageError::Io {
                path: source.to_path_buf(),
                source: e,
            }
            .into());
        }
    }

    if let Destination::File(path) = destination {
        if path.is_dir() {
            return Err(SnapshotError::configuration(format!(
                "destination {} is a directory",
                path.display()
            )));
        }
        if same_file(source, path) {
            return Err(SnapshotError::configuration(format!(
                "destination {} is the source database",
                path.display()
            )));
        }
    }

    if options.backup_options.pages_per_step == 0 {
        return Err(SnapshotError::configuration(
            "backup pages_per_step must be non-zero",
        ));
    }

    Ok(())
}

/// Compare two paths after resolving symlinks and relative components.
/// `destination` may not exist yet.
fn same_file(source: &Path, destination: &Path) -> bool {
    let Ok(source) = source.canonicalize() else {
        return false;
    };
    if let Ok(destination) = destination.canonicalize() {
        return source == destination;
    }

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), destination.file_name()) {
        (Ok(parent), Some(name)) => source == parent.join(name),
        _ => false,
    }
}
