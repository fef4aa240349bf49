//! Unit tests for the markstore snapshot database (connection + migrations + repository).

use markstore::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use markstore::database::{Database, SnapshotRepository};
use markstore::types::bookmark::{Bookmark, Folder, ROOT_FOLDER_ID};
use markstore::types::errors::PersistenceError;
use markstore::types::history::{PersistedState, UndoneSet};
use tempfile::TempDir;

/// Helper: a state with one bookmark and the root folder.
fn sample_state() -> PersistedState {
    PersistedState {
        bookmarks: vec![Bookmark {
            id: "bm-1".to_string(),
            name: "Example".to_string(),
            url: "https://example.com/".to_string(),
            description: String::new(),
            folder_id: ROOT_FOLDER_ID.to_string(),
            order: Some(0),
            is_expanded: None,
            created_at: 1_700_000_000_000,
        }],
        folders: vec![Folder::root()],
        history: Vec::new(),
        current_history_index: -1,
        undone_operation_ids: UndoneSet::new(),
    }
}

// ─── Schema ───

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_tables_and_index() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    for (kind, name) in [
        ("table", "schema_version"),
        ("table", "snapshots"),
        ("index", "idx_snapshots_saved_at"),
    ] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
                [kind, name],
                |row| row.get(0),
            )
            .unwrap_or(false);
        assert!(exists, "{} '{}' should exist after migrations", kind, name);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    run_all(db.connection()).expect("second run failed");
    let rows: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);
}

#[test]
fn test_open_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("snapshots.db");
    let db = Database::open(&path);
    assert!(db.is_ok());
    assert!(path.exists());
}

// ─── Snapshot repository ───

#[test]
fn test_save_and_load_snapshot() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    let state = sample_state();
    repo.save("default", &state).unwrap();
    assert_eq!(repo.load("default").unwrap(), state);
}

#[test]
fn test_save_overwrites_existing_name() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    repo.save("default", &sample_state()).unwrap();
    repo.save("default", &PersistedState::default()).unwrap();

    let loaded = repo.load("default").unwrap();
    assert!(loaded.bookmarks.is_empty());
    let infos = repo.list().unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].bookmark_count, 0);
    assert_eq!(infos[0].folder_count, 1);
}

#[test]
fn test_load_missing_snapshot() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    assert!(matches!(repo.load("nope"), Err(PersistenceError::NotFound(name)) if name == "nope"));
}

#[test]
fn test_blank_name_rejected() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    assert!(matches!(
        repo.save("  ", &sample_state()),
        Err(PersistenceError::InvalidName(_))
    ));
}

#[test]
fn test_delete_snapshot() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    repo.save("a", &sample_state()).unwrap();
    assert!(repo.delete("a").unwrap());
    assert!(!repo.delete("a").unwrap());
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn test_list_reports_counts() {
    let db = Database::open_in_memory().unwrap();
    let repo = SnapshotRepository::new(db.connection());
    repo.save("b", &sample_state()).unwrap();
    repo.save("a", &sample_state()).unwrap();
    let infos = repo.list().unwrap();
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|i| i.bookmark_count == 1 && i.folder_count == 1));
    assert!(infos[0].saved_at >= infos[1].saved_at);
}

#[test]
fn test_corrupt_snapshot_is_serialization_error() {
    let db = Database::open_in_memory().unwrap();
    db.connection()
        .execute(
            "INSERT INTO snapshots (name, state, saved_at) VALUES ('bad', 'not json', 0)",
            [],
        )
        .unwrap();
    let repo = SnapshotRepository::new(db.connection());
    assert!(matches!(
        repo.load("bad"),
        Err(PersistenceError::SerializationError(_))
    ));
}

#[test]
fn test_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots.db");
    {
        let db = Database::open(&path).unwrap();
        SnapshotRepository::new(db.connection())
            .save("default", &sample_state())
            .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let loaded = SnapshotRepository::new(db.connection()).load("default").unwrap();
    assert_eq!(loaded.bookmarks.len(), 1);
}
