use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::bookmark::{Bookmark, Folder, ItemType, OrderEntry, SortKind};

/// Operation type tags with a registered undo/redo handler pair.
pub mod op_types {
    pub const MOVE_ITEMS: &str = "moveItems";
    pub const REORDER_BOOKMARKS: &str = "reorderBookmarks";
    pub const SORT_BOOKMARKS: &str = "sortBookmarks";
    pub const DELETE_BOOKMARKS: &str = "deleteBookmarks";
}

/// A history entry. `data` is a plain payload understood by the handler
/// registered for `op_type`; it never holds behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: String,
    pub description: String,
    pub data: Value,
    pub timestamp: i64,
}

/// Where an item lived before a `moveItems` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveItemsData {
    pub item_ids: Vec<String>,
    pub target_folder_id: String,
    pub item_type: ItemType,
    pub original_state: BTreeMap<String, OriginalPlacement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderData {
    pub folder_id: String,
    pub bookmark_id: String,
    pub target_index: usize,
    pub original_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortData {
    pub folder_id: String,
    pub kind: SortKind,
    pub original_order: Vec<OrderEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBookmarksData {
    pub bookmarks: Vec<Bookmark>,
}

/// Ids of operations currently in the undone state.
///
/// Serialized as a JSON array of strings. Deserialization accepts only that
/// shape; anything else (an object left behind by a runtime set, a number)
/// rehydrates to an empty set instead of failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UndoneSet(BTreeSet<String>);

impl UndoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the set from an arbitrary persisted JSON value.
    pub fn rehydrate(raw: Value) -> Self {
        match raw {
            Value::Null => Self::new(),
            Value::Array(items) => {
                let mut set = BTreeSet::new();
                for item in items {
                    match item {
                        Value::String(id) => {
                            set.insert(id);
                        }
                        other => {
                            tracing::warn!(entry = %other, "dropping non-string undone operation id");
                        }
                    }
                }
                Self(set)
            }
            other => {
                tracing::warn!(
                    found = %other,
                    "undoneOperationIds is not an array; reinitializing to an empty set"
                );
                Self::new()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: String) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn retain<F: FnMut(&String) -> bool>(&mut self, f: F) {
        self.0.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for UndoneSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::rehydrate(raw))
    }
}

impl FromIterator<String> for UndoneSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything an external persistence collaborator stores and hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub history: Vec<Operation>,
    #[serde(default = "no_history_index")]
    pub current_history_index: i64,
    #[serde(default)]
    pub undone_operation_ids: UndoneSet,
}

fn no_history_index() -> i64 {
    -1
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            bookmarks: Vec::new(),
            folders: vec![Folder::root()],
            history: Vec::new(),
            current_history_index: -1,
            undone_operation_ids: UndoneSet::new(),
        }
    }
}
