use std::fmt;

// === ValidationError ===

/// A single reason an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The id is blank, too long, or uses characters outside `[A-Za-z0-9_-]`.
    InvalidId(String),
    /// A required name is empty or whitespace.
    EmptyName,
    /// The name exceeds the configured limit.
    NameTooLong(usize),
    /// The description exceeds the configured limit.
    DescriptionTooLong(usize),
    /// The URL does not parse or uses a protocol other than http, https or ftp.
    InvalidUrl(String),
    /// The referenced folder id is malformed.
    InvalidFolderId(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidId(id) => write!(f, "invalid id: {}", id),
            ValidationIssue::EmptyName => write!(f, "name must not be empty"),
            ValidationIssue::NameTooLong(max) => {
                write!(f, "name must not exceed {} characters", max)
            }
            ValidationIssue::DescriptionTooLong(max) => {
                write!(f, "description must not exceed {} characters", max)
            }
            ValidationIssue::InvalidUrl(url) => write!(f, "invalid url: {}", url),
            ValidationIssue::InvalidFolderId(id) => write!(f, "invalid folder id: {}", id),
        }
    }
}

/// Malformed input to a mutation. Collects every issue found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "Validation failed: {}", joined.join(", "))
    }
}

impl std::error::Error for ValidationError {}

// === StoreError ===

/// Errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Bookmark with the given ID was not found.
    NotFound(String),
    /// The referenced folder does not exist.
    FolderNotFound(String),
    /// The input failed validation.
    Validation(ValidationError),
    /// Reparenting the folder would make it its own ancestor.
    CycleDetected(String),
    /// The root folder cannot be deleted or reparented.
    RootImmutable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            StoreError::FolderNotFound(id) => write!(f, "Folder not found: {}", id),
            StoreError::Validation(err) => write!(f, "{}", err),
            StoreError::CycleDetected(id) => {
                write!(f, "Moving folder {} would create a cycle", id)
            }
            StoreError::RootImmutable => write!(f, "The root folder cannot be modified"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

// === HistoryError ===

/// Protocol errors of the undo/redo history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// No applied operation to undo.
    NothingToUndo,
    /// No undone operation to redo.
    NothingToRedo,
    /// The operation at the cursor is already marked undone.
    AlreadyUndone(String),
    /// No handler pair is registered for the operation type.
    UnregisteredType(String),
    /// The payload could not be decoded by its handler.
    InvalidPayload(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::NothingToUndo => write!(f, "Nothing to undo"),
            HistoryError::NothingToRedo => write!(f, "Nothing to redo"),
            HistoryError::AlreadyUndone(id) => write!(f, "Operation already undone: {}", id),
            HistoryError::UnregisteredType(t) => {
                write!(f, "No handler registered for operation type: {}", t)
            }
            HistoryError::InvalidPayload(msg) => write!(f, "Invalid operation payload: {}", msg),
        }
    }
}

impl std::error::Error for HistoryError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === PersistenceError ===

/// Errors raised by the snapshot persistence collaborator.
#[derive(Debug)]
pub enum PersistenceError {
    /// Database operation failed.
    DatabaseError(String),
    /// Failed to serialize or deserialize a snapshot.
    SerializationError(String),
    /// No snapshot is stored under the given name.
    NotFound(String),
    /// Snapshot names must not be blank.
    InvalidName(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::DatabaseError(msg) => write!(f, "Snapshot database error: {}", msg),
            PersistenceError::SerializationError(msg) => {
                write!(f, "Snapshot serialization error: {}", msg)
            }
            PersistenceError::NotFound(name) => write!(f, "Snapshot not found: {}", name),
            PersistenceError::InvalidName(name) => write!(f, "Invalid snapshot name: '{}'", name),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::DatabaseError(err.to_string())
    }
}

// === ProbeError ===

/// Failures while probing a URL for liveness. Always classified as invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe did not finish within the per-item timeout.
    Timeout(String),
    /// The request failed before a response arrived.
    Network(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout(url) => write!(f, "Probe timed out: {}", url),
            ProbeError::Network(msg) => write!(f, "Probe network error: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}
