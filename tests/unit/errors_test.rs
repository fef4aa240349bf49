use markstore::types::errors::*;

// === ValidationError Tests ===

#[test]
fn validation_issue_display_variants() {
    assert_eq!(
        ValidationIssue::InvalidId("a b".to_string()).to_string(),
        "invalid id: a b"
    );
    assert_eq!(ValidationIssue::EmptyName.to_string(), "name must not be empty");
    assert_eq!(
        ValidationIssue::NameTooLong(50).to_string(),
        "name must not exceed 50 characters"
    );
    assert_eq!(
        ValidationIssue::DescriptionTooLong(500).to_string(),
        "description must not exceed 500 characters"
    );
    assert_eq!(
        ValidationIssue::InvalidUrl("javascript:alert(1)".to_string()).to_string(),
        "invalid url: javascript:alert(1)"
    );
    assert_eq!(
        ValidationIssue::InvalidFolderId("../x".to_string()).to_string(),
        "invalid folder id: ../x"
    );
}

#[test]
fn validation_error_joins_issues() {
    let err = ValidationError {
        issues: vec![ValidationIssue::EmptyName, ValidationIssue::InvalidUrl("x".to_string())],
    };
    assert_eq!(
        err.to_string(),
        "Validation failed: name must not be empty, invalid url: x"
    );
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::NotFound("bm-1".to_string()).to_string(),
        "Bookmark not found: bm-1"
    );
    assert_eq!(
        StoreError::FolderNotFound("f-1".to_string()).to_string(),
        "Folder not found: f-1"
    );
    assert_eq!(
        StoreError::CycleDetected("f-2".to_string()).to_string(),
        "Moving folder f-2 would create a cycle"
    );
    assert_eq!(
        StoreError::RootImmutable.to_string(),
        "The root folder cannot be modified"
    );
}

#[test]
fn store_error_wraps_validation_as_source() {
    let err: StoreError = ValidationError::single(ValidationIssue::EmptyName).into();
    assert_eq!(err.to_string(), "Validation failed: name must not be empty");
    let boxed: Box<dyn std::error::Error> = Box::new(err);
    assert!(boxed.source().is_some());
}

#[test]
fn store_error_plain_variants_have_no_source() {
    let err: Box<dyn std::error::Error> = Box::new(StoreError::RootImmutable);
    assert!(err.source().is_none());
}

// === HistoryError Tests ===

#[test]
fn history_error_display_variants() {
    assert_eq!(HistoryError::NothingToUndo.to_string(), "Nothing to undo");
    assert_eq!(HistoryError::NothingToRedo.to_string(), "Nothing to redo");
    assert_eq!(
        HistoryError::AlreadyUndone("op-1".to_string()).to_string(),
        "Operation already undone: op-1"
    );
    assert_eq!(
        HistoryError::UnregisteredType("sort".to_string()).to_string(),
        "No handler registered for operation type: sort"
    );
    assert_eq!(
        HistoryError::InvalidPayload("missing field".to_string()).to_string(),
        "Invalid operation payload: missing field"
    );
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("disk full".to_string()).to_string(),
        "Settings I/O error: disk full"
    );
    assert_eq!(
        SettingsError::InvalidKey("a.b".to_string()).to_string(),
        "Invalid settings key: a.b"
    );
}

// === PersistenceError Tests ===

#[test]
fn persistence_error_display_variants() {
    assert_eq!(
        PersistenceError::NotFound("default".to_string()).to_string(),
        "Snapshot not found: default"
    );
    assert_eq!(
        PersistenceError::InvalidName(" ".to_string()).to_string(),
        "Invalid snapshot name: ' '"
    );
    assert_eq!(
        PersistenceError::SerializationError("eof".to_string()).to_string(),
        "Snapshot serialization error: eof"
    );
}

#[test]
fn persistence_error_from_rusqlite() {
    let err: PersistenceError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, PersistenceError::DatabaseError(_)));
}

// === ProbeError Tests ===

#[test]
fn probe_error_display_variants() {
    assert_eq!(
        ProbeError::Timeout("https://slow.test".to_string()).to_string(),
        "Probe timed out: https://slow.test"
    );
    assert_eq!(
        ProbeError::Network("connection refused".to_string()).to_string(),
        "Probe network error: connection refused"
    );
}
