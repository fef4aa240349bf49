use serde::{Deserialize, Serialize};

/// Fixed id of the sentinel root folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// Display name given to the root folder.
pub const ROOT_FOLDER_NAME: &str = "Bookmarks";

/// Represents a saved bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub folder_id: String,
    /// Relative position among siblings. Missing values are backfilled with
    /// the positional index the first time the folder is reordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
    #[serde(default)]
    pub created_at: i64,
}

impl Bookmark {
    /// Order used for comparisons; a missing order sorts as zero.
    pub fn sort_order(&self) -> u32 {
        self.order.unwrap_or(0)
    }
}

/// Represents a folder. Every folder except root has a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub created_at: i64,
}

impl Folder {
    /// Builds the sentinel root folder.
    pub fn root() -> Self {
        Self {
            id: ROOT_FOLDER_ID.to_string(),
            name: ROOT_FOLDER_NAME.to_string(),
            parent_id: None,
            is_expanded: true,
            order: None,
            created_at: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_FOLDER_ID
    }
}

/// Caller-supplied fields for a new bookmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Caller-supplied fields for a new folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_expanded: bool,
}

/// Allow-listed bookmark fields that may be changed after creation.
/// Any other field in an incoming update payload is dropped on deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub order: Option<u32>,
    pub is_expanded: Option<bool>,
}

/// Allow-listed folder fields that may be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    pub name: Option<String>,
    pub parent_id: Option<String>,
    pub is_expanded: Option<bool>,
    pub order: Option<u32>,
}

/// Which collection a batch operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Bookmark,
    Folder,
}

impl ItemType {
    pub fn label(&self) -> &'static str {
        match self {
            ItemType::Bookmark => "bookmark",
            ItemType::Folder => "folder",
        }
    }
}

/// Closed set of comparators available for sorting a folder's bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKind {
    ByName,
    ByUrl,
    ByDateAscending,
    ByDateDescending,
}

impl SortKind {
    pub fn label(&self) -> &'static str {
        match self {
            SortKind::ByName => "name",
            SortKind::ByUrl => "URL",
            SortKind::ByDateAscending => "oldest first",
            SortKind::ByDateDescending => "newest first",
        }
    }
}

/// How a reorder was requested; only affects the history description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReorderKind {
    Up,
    Down,
    Drag,
    #[default]
    Reorder,
}

/// A bookmark together with the folder chain it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkWithPath {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub folder_path: Vec<Folder>,
    pub path_string: String,
}

/// An `(id, order)` pair captured before a sort so it can be restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    pub id: String,
    pub order: Option<u32>,
}

/// Entities removed by a cascading folder delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub folder_ids: Vec<String>,
    pub bookmark_ids: Vec<String>,
}

/// Data handed over by an import collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// Outcome of merging an [`ImportBatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub bookmarks_added: usize,
    pub bookmarks_skipped: usize,
    pub folders_added: usize,
    pub folders_merged: usize,
    pub folders_skipped: usize,
}
