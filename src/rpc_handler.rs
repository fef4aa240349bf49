//! RPC method handler for the markstore JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdio.
//! `handle_method` decodes params, calls into `App`, and encodes the result.
//! Store-level failures come back as sentinel results (`null`, `false`, `0`);
//! only malformed requests and persistence failures are RPC errors.

use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::App;
use crate::types::bookmark::{
    BookmarkUpdate, FolderUpdate, ImportBatch, ItemType, NewBookmark, NewFolder, ReorderKind,
    SortKind,
};
use crate::types::history::PersistedState;

fn lock(app: &Mutex<App>) -> Result<MutexGuard<'_, App>, String> {
    app.lock().map_err(|e| e.to_string())
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn opt_str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Decodes `params[key]` into `T`.
fn typed_param<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, String> {
    let raw = params.get(key).cloned().ok_or_else(|| format!("missing {}", key))?;
    serde_json::from_value(raw).map_err(|e| format!("invalid {}: {}", key, e))
}

/// Decodes the whole params object into `T`.
fn params_as<T: DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Bookmarks ───
        "bookmark.add" => {
            let data: NewBookmark = params_as(params)?;
            encode(&lock(app)?.add_bookmark(data))
        }
        "bookmark.update" => {
            let id = str_param(params, "id")?;
            let updates: BookmarkUpdate = typed_param(params, "updates")?;
            encode(&lock(app)?.update_bookmark(id, updates))
        }
        "bookmark.delete" => {
            let id = str_param(params, "id")?;
            Ok(json!(lock(app)?.delete_bookmark(id)))
        }
        "bookmark.deleteBulk" => {
            let ids: Vec<String> = typed_param(params, "ids")?;
            Ok(json!(lock(app)?.delete_bookmarks_bulk(&ids)))
        }
        "bookmark.list" => {
            let mut a = lock(app)?;
            match opt_str_param(params, "folderId") {
                Some(folder_id) => encode(&a.tree.bookmarks_by_folder(folder_id)),
                None => encode(a.bookmarks_with_path().as_ref()),
            }
        }
        "bookmark.search" => {
            let query = str_param(params, "query")?;
            encode(&lock(app)?.search_bookmarks(query))
        }
        "bookmark.reorder" => {
            let folder_id = str_param(params, "folderId")?;
            let bookmark_id = str_param(params, "bookmarkId")?;
            let target_index: usize = typed_param(params, "targetIndex")?;
            let kind: ReorderKind = match params.get("kind") {
                Some(_) => typed_param(params, "kind")?,
                None => ReorderKind::default(),
            };
            Ok(json!(lock(app)?.reorder_bookmark(folder_id, bookmark_id, target_index, kind)))
        }
        "bookmark.moveUp" => {
            let id = str_param(params, "id")?;
            Ok(json!(lock(app)?.move_bookmark_up(id)))
        }
        "bookmark.moveDown" => {
            let id = str_param(params, "id")?;
            Ok(json!(lock(app)?.move_bookmark_down(id)))
        }
        "bookmark.sort" => {
            let folder_id = str_param(params, "folderId")?;
            let kind: SortKind = typed_param(params, "kind")?;
            Ok(json!(lock(app)?.sort_bookmarks(folder_id, kind)))
        }

        // ─── Folders ───
        "folder.add" => {
            let data: NewFolder = params_as(params)?;
            encode(&lock(app)?.add_folder(data))
        }
        "folder.update" => {
            let id = str_param(params, "id")?;
            let updates: FolderUpdate = typed_param(params, "updates")?;
            encode(&lock(app)?.update_folder(id, updates))
        }
        "folder.delete" => {
            let id = str_param(params, "id")?;
            encode(&lock(app)?.delete_folder(id))
        }
        "folder.toggle" => {
            let id = str_param(params, "id")?;
            encode(&lock(app)?.toggle_folder_expansion(id))
        }
        "folder.path" => {
            let id = str_param(params, "id")?;
            let path = lock(app)?.folder_path(id);
            encode(path.as_ref())
        }
        "folder.children" => {
            let parent_id = str_param(params, "parentId")?;
            let a = lock(app)?;
            if params.get("recursive").and_then(|v| v.as_bool()).unwrap_or(false) {
                encode(&a.tree.all_child_folders(parent_id))
            } else {
                encode(&a.tree.folders_by_parent(parent_id))
            }
        }
        "folder.sort" => {
            let parent_id = str_param(params, "parentId")?;
            Ok(json!(lock(app)?.sort_folders_by_name(parent_id)))
        }

        // ─── Batch ───
        "items.move" => {
            let ids: Vec<String> = typed_param(params, "itemIds")?;
            let target = str_param(params, "targetFolderId")?;
            let item_type: ItemType = typed_param(params, "itemType")?;
            Ok(json!(lock(app)?.move_items(&ids, target, item_type)))
        }
        "import" => {
            let batch: ImportBatch = params_as(params)?;
            encode(&lock(app)?.import_bookmarks(batch))
        }
        "duplicates.check" => encode(&lock(app)?.check_duplicate_bookmarks()),
        "paths.search" => {
            let query = str_param(params, "query")?;
            encode(&lock(app)?.search_paths_now(query))
        }

        // ─── History ───
        "history.undo" => encode(&lock(app)?.undo()),
        "history.redo" => encode(&lock(app)?.redo()),
        "history.list" => {
            let a = lock(app)?;
            Ok(json!({
                "entries": a.history.entries(),
                "currentIndex": a.history.current_index(),
                "canUndo": a.history.can_undo(),
                "canRedo": a.history.can_redo(),
                "lastOperation": a.history.last_operation(),
            }))
        }
        "history.reset" => {
            lock(app)?.reset_history();
            Ok(json!(true))
        }

        // ─── State ───
        "state.export" => encode(&lock(app)?.snapshot()),
        "state.import" => {
            let state: PersistedState = typed_param(params, "state")?;
            lock(app)?.restore(state);
            Ok(json!(true))
        }
        "state.save" => {
            let name = opt_str_param(params, "name").unwrap_or("default");
            lock(app)?.save_snapshot(name).map_err(|e| e.to_string())?;
            Ok(json!(true))
        }
        "state.load" => {
            let name = opt_str_param(params, "name").unwrap_or("default");
            lock(app)?.load_snapshot(name).map_err(|e| e.to_string())?;
            Ok(json!(true))
        }
        "state.list" => encode(&lock(app)?.list_snapshots().map_err(|e| e.to_string())?),
        "state.delete" => {
            let name = str_param(params, "name")?;
            let removed = lock(app)?.delete_snapshot(name).map_err(|e| e.to_string())?;
            Ok(json!(removed))
        }
        "store.reset" => {
            let mut a = lock(app)?;
            match opt_str_param(params, "scope").unwrap_or("all") {
                "bookmarks" => a.reset_bookmarks(),
                "folders" => a.reset_folders(),
                "history" => a.reset_history(),
                "all" => a.reset_all(),
                other => return Err(format!("unknown reset scope: {}", other)),
            }
            Ok(json!(true))
        }
        "cache.stats" => encode(&lock(app)?.cache_stats()),
        "settings.get" => encode(lock(app)?.settings()),

        _ => Err(format!("unknown method: {}", method)),
    }
}
