//! Schema migrations for the snapshot database.
//!
//! Applied versions are tracked in `schema_version`; each migration runs once.

use rusqlite::Connection;

/// Bump when adding a migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Highest applied version, 0 on a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs every pending migration. Safe to call on each open.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "snapshots table")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "snapshot item counts and saved_at index")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
             name TEXT PRIMARY KEY,
             state TEXT NOT NULL,
             saved_at INTEGER NOT NULL
         );",
    )
}

fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "ALTER TABLE snapshots ADD COLUMN bookmark_count INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE snapshots ADD COLUMN folder_count INTEGER NOT NULL DEFAULT 0;
         CREATE INDEX IF NOT EXISTS idx_snapshots_saved_at ON snapshots(saved_at);",
    )
}
