//! Undo/redo handlers for recorded operations.
//!
//! A handler turns an operation's JSON payload back into tree mutations. Each
//! inverse replays the same primitive the forward action used, with the
//! parameters captured in the payload, so history never holds tree snapshots.
//! Payload decode failures are errors; targets that vanished since the
//! operation was recorded are logged and skipped.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::managers::tree_store::{TreeStore, TreeStoreTrait};
use crate::types::bookmark::ItemType;
use crate::types::errors::HistoryError;
use crate::types::history::{op_types, DeleteBookmarksData, MoveItemsData, ReorderData, SortData};

/// Inverse and replay of one operation type.
pub trait OperationHandler: Send + Sync {
    fn undo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError>;
    fn redo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError>;
}

fn decode<T: DeserializeOwned>(data: &Value) -> Result<T, HistoryError> {
    serde_json::from_value(data.clone()).map_err(|e| HistoryError::InvalidPayload(e.to_string()))
}

pub struct MoveItemsHandler;

impl OperationHandler for MoveItemsHandler {
    /// Sends every item back to the folder it occupied before the move.
    fn undo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: MoveItemsData = decode(data)?;
        for (id, placement) in &payload.original_state {
            let home = match payload.item_type {
                ItemType::Bookmark => placement.folder_id.as_deref(),
                ItemType::Folder => placement.parent_id.as_deref(),
            };
            let Some(home) = home else {
                continue;
            };
            if let Err(err) = tree.move_items(std::slice::from_ref(id), home, payload.item_type) {
                tracing::warn!(item = %id, error = %err, "could not return item to its original folder");
            }
        }
        Ok(())
    }

    fn redo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: MoveItemsData = decode(data)?;
        if let Err(err) = tree.move_items(&payload.item_ids, &payload.target_folder_id, payload.item_type) {
            tracing::warn!(error = %err, "could not replay move");
        }
        Ok(())
    }
}

pub struct ReorderBookmarksHandler;

impl OperationHandler for ReorderBookmarksHandler {
    fn undo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: ReorderData = decode(data)?;
        match payload.original_index {
            Some(index) => {
                tree.reorder_bookmark(&payload.folder_id, &payload.bookmark_id, index);
            }
            None => {
                tracing::warn!(bookmark = %payload.bookmark_id, "reorder has no original index; nothing to restore");
            }
        }
        Ok(())
    }

    fn redo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: ReorderData = decode(data)?;
        tree.reorder_bookmark(&payload.folder_id, &payload.bookmark_id, payload.target_index);
        Ok(())
    }
}

pub struct SortBookmarksHandler;

impl OperationHandler for SortBookmarksHandler {
    fn undo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: SortData = decode(data)?;
        tree.restore_order(&payload.original_order);
        Ok(())
    }

    fn redo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: SortData = decode(data)?;
        tree.sort_bookmarks(&payload.folder_id, payload.kind);
        Ok(())
    }
}

pub struct DeleteBookmarksHandler;

impl OperationHandler for DeleteBookmarksHandler {
    /// Re-inserts the deleted records unchanged, ids included.
    fn undo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: DeleteBookmarksData = decode(data)?;
        tree.restore_bookmarks(&payload.bookmarks);
        Ok(())
    }

    fn redo(&self, data: &Value, tree: &mut TreeStore) -> Result<(), HistoryError> {
        let payload: DeleteBookmarksData = decode(data)?;
        let ids: Vec<String> = payload.bookmarks.iter().map(|b| b.id.clone()).collect();
        tree.delete_bookmarks_bulk(&ids);
        Ok(())
    }
}

/// Maps an operation type tag to its handler.
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry holding a handler for every built-in operation type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(op_types::MOVE_ITEMS, Box::new(MoveItemsHandler));
        registry.register(op_types::REORDER_BOOKMARKS, Box::new(ReorderBookmarksHandler));
        registry.register(op_types::SORT_BOOKMARKS, Box::new(SortBookmarksHandler));
        registry.register(op_types::DELETE_BOOKMARKS, Box::new(DeleteBookmarksHandler));
        registry
    }

    /// Registers `handler` for `op_type`, replacing any previous one.
    pub fn register(&mut self, op_type: &str, handler: Box<dyn OperationHandler>) {
        if self.handlers.insert(op_type.to_string(), handler).is_some() {
            tracing::debug!(op_type, "replaced operation handler");
        }
    }

    pub fn get(&self, op_type: &str) -> Option<&dyn OperationHandler> {
        self.handlers.get(op_type).map(|h| h.as_ref())
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.handlers.contains_key(op_type)
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
