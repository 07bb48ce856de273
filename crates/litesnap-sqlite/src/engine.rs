//! SQLite connections and the page-level backup step

use std::path::Path;
use std::thread;

use rusqlite::Connection;
use rusqlite::backup::{Backup, StepResult};

use crate::config::{BackupOptions, OpenOptions};
use crate::error::Result;

/// Where the backup source lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Private copy in the staging area
    Staged,
    /// The live database, possibly in use by another process
    Live,
}

/// Open the backup source with a normal (non-immutable) connection.
///
/// A regular connection is what makes SQLite replay the `-wal`/`-journal`
/// sidecars, so the backup sees the merged logical database.
pub fn open_source(path: &Path, kind: SourceKind, options: &OpenOptions) -> Result<Connection> {
    let flags = options.flags_for(kind == SourceKind::Live);
    let conn = match options.vfs.as_deref() {
        Some(vfs) => Connection::open_with_flags_and_vfs(path, flags, vfs)?,
        None => Connection::open_with_flags(path, flags)?,
    };
    if let Some(timeout) = options.busy_timeout {
        conn.busy_timeout(timeout)?;
    }
    tracing::debug!(source = %path.display(), ?kind, "Opened backup source");
    Ok(conn)
}

/// Page counts reported by the last backup step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackupStats {
    pub steps: u64,
    pub pages: i32,
}

/// Source and destination connections paired for the duration of one backup
pub struct BackupSession {
    source: Connection,
    destination: Connection,
}

impl BackupSession {
    pub fn new(source: Connection, destination: Connection) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Stream every page of the source's main database into the destination.
    ///
    /// Engine errors are returned as-is. Busy and locked steps sleep for
    /// `pause_between_steps` and try the step again.
    pub fn run(&mut self, options: &BackupOptions) -> Result<BackupStats> {
        let backup = Backup::new(&self.source, &mut self.destination)?;
        let mut stats = BackupStats::default();

        loop {
            let step = backup.step(options.pages_per_step)?;
            stats.steps += 1;

            let progress = backup.progress();
            stats.pages = progress.pagecount;
            tracing::debug!(
                step = stats.steps,
                remaining = progress.remaining,
                pagecount = progress.pagecount,
                "Backup step"
            );
            if let Some(callback) = options.progress {
                callback(progress);
            }

            match step {
                StepResult::Done => break,
                StepResult::More => {}
                StepResult::Busy | StepResult::Locked => {
                    thread::sleep(options.pause_between_steps);
                }
                #[allow(unreachable_patterns)]
                _ => thread::sleep(options.pause_between_steps),
            }
        }

        Ok(stats)
    }

    /// Close the source and hand back the destination connection
    pub fn into_destination(self) -> Result<Connection> {
        self.source.close().map_err(|(_, e)| e)?;
        Ok(self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn seeded(rows: i64) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, body TEXT)")
            .unwrap();
        for i in 0..rows {
            conn.execute(
                "INSERT INTO items (body) VALUES (?1)",
                [format!("row-{i}-{}", "x".repeat(200))],
            )
            .unwrap();
        }
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_session_copies_all_rows() {
        let mut session = BackupSession::new(seeded(50), Connection::open_in_memory().unwrap());
        let stats = session.run(&BackupOptions::default()).unwrap();
        assert_eq!(stats.steps, 1);
        assert!(stats.pages > 0);

        let dest = session.into_destination().unwrap();
        assert_eq!(count(&dest), 50);
    }

    static PROGRESS_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn record_progress(_: rusqlite::backup::Progress) {
        PROGRESS_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_session_steps_in_batches() {
        let options = BackupOptions::default()
            .with_pages_per_step(1)
            .with_progress(record_progress);
        let mut session = BackupSession::new(seeded(200), Connection::open_in_memory().unwrap());
        let stats = session.run(&options).unwrap();

        assert!(stats.steps > 1);
        assert!(PROGRESS_CALLS.load(Ordering::SeqCst) as u64 >= stats.steps);
        assert_eq!(count(&session.into_destination().unwrap()), 200);
    }

    #[test]
    fn test_open_source_live_is_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (x)")
            .unwrap();

        let conn = open_source(&path, SourceKind::Live, &OpenOptions::default()).unwrap();
        assert!(conn.execute("INSERT INTO t VALUES (1)", []).is_err());
    }

    #[test]
    fn test_open_source_does_not_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(open_source(&path, SourceKind::Staged, &OpenOptions::default()).is_err());
        assert!(!path.exists());
    }
}
