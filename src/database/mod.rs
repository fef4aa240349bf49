//! markstore snapshot database.
//!
//! SQLite persistence for named snapshots of the whole store.
//!
//! ```no_run
//! use markstore::database::{Database, SnapshotRepository};
//! use markstore::types::history::PersistedState;
//!
//! let db = Database::open_in_memory().expect("failed to open database");
//! let repo = SnapshotRepository::new(db.connection());
//! repo.save("default", &PersistedState::default()).expect("save failed");
//! ```

pub mod connection;
pub mod migrations;
pub mod snapshot_repository;

pub use connection::Database;
pub use snapshot_repository::{SnapshotInfo, SnapshotRepository};
