//! WAL checkpoint of the destination database

use rusqlite::Connection;

/// Row returned by `PRAGMA wal_checkpoint`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointResult {
    /// The checkpoint could not take the locks it needed and did not finish
    pub busy: bool,
    /// Frames in the WAL, or -1 when the database is not in WAL mode
    pub log_frames: i64,
    /// Frames moved into the database file, or -1 when not in WAL mode
    pub checkpointed_frames: i64,
}

impl CheckpointResult {
    /// The database was not in WAL mode, so there was nothing to merge
    pub fn not_wal(&self) -> bool {
        self.log_frames < 0
    }
}

/// Merge the WAL into the main file and truncate the WAL to zero bytes.
///
/// A busy checkpoint is reported in the result rather than as an error.
pub fn checkpoint_truncate(conn: &Connection) -> rusqlite::Result<CheckpointResult> {
    let result = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
        Ok(CheckpointResult {
            busy: row.get::<_, i64>(0)? != 0,
            log_frames: row.get(1)?,
            checkpointed_frames: row.get(2)?,
        })
    })?;
    tracing::debug!(
        busy = result.busy,
        log_frames = result.log_frames,
        checkpointed_frames = result.checkpointed_frames,
        "WAL checkpoint"
    );
    Ok(result)
}
