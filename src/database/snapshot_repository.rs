//! Named snapshots of [`PersistedState`], stored as JSON text.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::types::errors::PersistenceError;
use crate::types::history::PersistedState;

/// Listing entry for a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub name: String,
    pub bookmark_count: i64,
    pub folder_count: i64,
    pub saved_at: i64,
}

pub struct SnapshotRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Stores `state` under `name`, replacing any previous snapshot.
    pub fn save(&self, name: &str, state: &PersistedState) -> Result<(), PersistenceError> {
        if name.trim().is_empty() {
            return Err(PersistenceError::InvalidName(name.to_string()));
        }
        let json = serde_json::to_string(state)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO snapshots (name, state, saved_at, bookmark_count, folder_count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 state = excluded.state,
                 saved_at = excluded.saved_at,
                 bookmark_count = excluded.bookmark_count,
                 folder_count = excluded.folder_count",
            params![
                name,
                json,
                Self::now(),
                state.bookmarks.len() as i64,
                state.folders.len() as i64
            ],
        )?;
        tracing::info!(snapshot = name, bookmarks = state.bookmarks.len(), "snapshot saved");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<PersistedState, PersistenceError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| PersistenceError::NotFound(name.to_string()))?;
        serde_json::from_str(&json).map_err(|e| PersistenceError::SerializationError(e.to_string()))
    }

    /// Returns whether a snapshot was removed.
    pub fn delete(&self, name: &str) -> Result<bool, PersistenceError> {
        let removed = self
            .conn
            .execute("DELETE FROM snapshots WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    }

    /// All snapshots, most recently saved first.
    pub fn list(&self) -> Result<Vec<SnapshotInfo>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, bookmark_count, folder_count, saved_at
             FROM snapshots ORDER BY saved_at DESC, name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SnapshotInfo {
                name: row.get(0)?,
                bookmark_count: row.get(1)?,
                folder_count: row.get(2)?,
                saved_at: row.get(3)?,
            })
        })?;
        let mut infos = Vec::new();
        for info in rows {
            infos.push(info?);
        }
        Ok(infos)
    }
}
