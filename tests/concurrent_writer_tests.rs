//! Snapshots taken while another connection keeps writing to the source

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use litesnap::{SnapshotOptions, backup_to_file, backup_to_memory};
use rusqlite::Connection;
use tempfile::tempdir;

const SEED_ROWS: i64 = 10;

fn create_wal_database(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode, "wal");
    conn.execute_batch(
        "PRAGMA wal_autocheckpoint=0;
         CREATE TABLE events (id INTEGER PRIMARY KEY, payload TEXT NOT NULL);",
    )
    .unwrap();
    for i in 0..SEED_ROWS {
        conn.execute("INSERT INTO events (payload) VALUES (?1)", [format!("seed-{i}")])
            .unwrap();
    }
    conn
}

fn count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .unwrap()
}

fn integrity(conn: &Connection) -> String {
    conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .unwrap()
}

fn spawn_writer(path: PathBuf, stop: Arc<AtomicBool>, max_rows: i64) -> thread::JoinHandle<i64> {
    thread::spawn(move || {
        let conn = Connection::open(&path).unwrap();
        conn.busy_timeout(Duration::from_secs(5)).unwrap();
        conn.execute_batch("PRAGMA wal_autocheckpoint=0").unwrap();

        let mut written = 0;
        while !stop.load(Ordering::SeqCst) && written < max_rows {
            conn.execute(
                "INSERT INTO events (payload) VALUES (?1)",
                [format!("live-{written}-{}", "p".repeat(64))],
            )
            .unwrap();
            written += 1;
            thread::sleep(Duration::from_millis(5));
        }
        written
    })
}

#[test]
fn test_snapshots_stay_consistent_under_concurrent_writer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.db");
    let _owner = create_wal_database(&path);

    let stop = Arc::new(AtomicBool::new(false));
    let writer = spawn_writer(path.clone(), Arc::clone(&stop), 200);

    let options = SnapshotOptions::default();
    let mut previous = SEED_ROWS;
    for _ in 0..8 {
        let snapshot = backup_to_memory(&path, &options).unwrap();
        assert_eq!(integrity(&snapshot), "ok");

        let rows = count(&snapshot);
        assert!(rows >= previous, "snapshot went back in time: {rows} < {previous}");
        previous = rows;
        thread::sleep(Duration::from_millis(20));
    }

    stop.store(true, Ordering::SeqCst);
    let written = writer.join().unwrap();
    assert!(previous <= SEED_ROWS + written);

    let out = tempdir().unwrap();
    let destination = out.path().join("final.db");
    backup_to_file(&path, &destination, &options).unwrap();
    let copy = Connection::open(&destination).unwrap();
    assert_eq!(integrity(&copy), "ok");
    assert_eq!(count(&copy), SEED_ROWS + written);
}

#[test]
fn test_parallel_snapshots_of_different_sources() {
    let dir = tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..4)
        .map(|i| dir.path().join(format!("source-{i}.db")))
        .collect();
    let owners: Vec<Connection> = paths.iter().map(|p| create_wal_database(p)).collect();

    let options = Arc::new(SnapshotOptions::default());
    let handles: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| {
            let options = Arc::clone(&options);
            thread::spawn(move || {
                let snapshot = backup_to_memory(&path, &options).unwrap();
                count(&snapshot)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), SEED_ROWS);
    }
    drop(owners);
}
