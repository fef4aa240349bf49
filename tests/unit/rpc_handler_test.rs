//! Unit tests for the RPC handler: JSON-RPC methods dispatched by `handle_method`.
//!
//! These go through the same code path as the `markstore-rpc` binary, with a
//! temporary on-disk snapshot database.

use serde_json::{json, Value};
use std::sync::Mutex;
use tempfile::TempDir;

use markstore::app::App;
use markstore::database::Database;
use markstore::rpc_handler::handle_method;

/// Create a fresh App backed by a temp directory DB.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(tmp.path().join("snapshots.db")).expect("Failed to open DB");
    let app = App::default().with_database(db);
    (Mutex::new(app), tmp)
}

/// Helper: add a bookmark and return its id.
fn add_bookmark(app: &Mutex<App>, name: &str, url: &str, folder_id: Option<&str>) -> String {
    let mut params = json!({"name": name, "url": url});
    if let Some(folder_id) = folder_id {
        params["folderId"] = json!(folder_id);
    }
    let res = handle_method(app, "bookmark.add", &params).unwrap();
    res["id"].as_str().unwrap().to_string()
}

fn add_folder(app: &Mutex<App>, name: &str, parent_id: Option<&str>) -> String {
    let res = handle_method(app, "folder.add", &json!({"name": name, "parentId": parent_id})).unwrap();
    res["id"].as_str().unwrap().to_string()
}

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect()
}

// ─── Ping / unknown ───

#[test]
fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Bookmarks ───

#[test]
fn test_bookmark_add_and_list() {
    let (app, _tmp) = setup();
    let res = handle_method(
        &app,
        "bookmark.add",
        &json!({"name": "Example", "url": "https://example.com"}),
    )
    .unwrap();
    assert!(res.get("id").is_some());
    assert_eq!(res["url"], "https://example.com/");
    assert_eq!(res["folderId"], "root");

    let list = handle_method(&app, "bookmark.list", &json!({})).unwrap();
    let arr = list.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["name"], "Example");
    assert_eq!(arr[0]["pathString"], "Bookmarks");
}

#[test]
fn test_bookmark_add_invalid_returns_null() {
    let (app, _tmp) = setup();
    let res = handle_method(
        &app,
        "bookmark.add",
        &json!({"name": "Bad", "url": "javascript:alert(1)"}),
    )
    .unwrap();
    assert!(res.is_null());
}

#[test]
fn test_bookmark_add_missing_params() {
    let (app, _tmp) = setup();
    assert!(handle_method(&app, "bookmark.add", &json!({"url": "https://x.com"})).is_err());
    assert!(handle_method(&app, "bookmark.add", &json!({"name": "X"})).is_err());
}

#[test]
fn test_bookmark_update_ignores_unknown_fields() {
    let (app, _tmp) = setup();
    let id = add_bookmark(&app, "Old", "https://old.test", None);
    let res = handle_method(
        &app,
        "bookmark.update",
        &json!({"id": id, "updates": {"name": "New", "createdAt": 1, "id": "hijack"}}),
    )
    .unwrap();
    assert_eq!(res["name"], "New");
    assert_eq!(res["id"], id.as_str());
    assert_ne!(res["createdAt"], 1);
}

#[test]
fn test_bookmark_delete() {
    let (app, _tmp) = setup();
    let id = add_bookmark(&app, "X", "https://x.test", None);
    assert_eq!(handle_method(&app, "bookmark.delete", &json!({"id": id})).unwrap(), json!(true));
    assert_eq!(handle_method(&app, "bookmark.delete", &json!({"id": id})).unwrap(), json!(false));
    assert!(handle_method(&app, "bookmark.delete", &json!({})).is_err());
}

#[test]
fn test_bookmark_list_by_folder_in_order() {
    let (app, _tmp) = setup();
    let f = add_folder(&app, "F", None);
    add_bookmark(&app, "a", "https://a.test", Some(&f));
    add_bookmark(&app, "b", "https://b.test", Some(&f));
    let c = add_bookmark(&app, "c", "https://c.test", Some(&f));

    let moved = handle_method(
        &app,
        "bookmark.reorder",
        &json!({"folderId": f, "bookmarkId": c, "targetIndex": 0, "kind": "drag"}),
    )
    .unwrap();
    assert_eq!(moved, json!(true));

    let list = handle_method(&app, "bookmark.list", &json!({"folderId": f})).unwrap();
    assert_eq!(names(&list), vec!["c", "a", "b"]);
}

#[test]
fn test_bookmark_move_up_down_and_sort() {
    let (app, _tmp) = setup();
    let b = add_bookmark(&app, "beta", "https://b.test", None);
    add_bookmark(&app, "alpha", "https://a.test", None);

    assert_eq!(handle_method(&app, "bookmark.moveDown", &json!({"id": b})).unwrap(), json!(true));
    assert_eq!(handle_method(&app, "bookmark.moveDown", &json!({"id": b})).unwrap(), json!(false));
    assert_eq!(handle_method(&app, "bookmark.moveUp", &json!({"id": b})).unwrap(), json!(true));

    let sorted = handle_method(
        &app,
        "bookmark.sort",
        &json!({"folderId": "root", "kind": "byName"}),
    )
    .unwrap();
    assert_eq!(sorted, json!(true));
    let list = handle_method(&app, "bookmark.list", &json!({"folderId": "root"})).unwrap();
    assert_eq!(names(&list), vec!["alpha", "beta"]);

    assert!(handle_method(&app, "bookmark.sort", &json!({"folderId": "root", "kind": "byMagic"})).is_err());
}

#[test]
fn test_bookmark_delete_bulk_and_undo() {
    let (app, _tmp) = setup();
    let a = add_bookmark(&app, "a", "https://a.test", None);
    let b = add_bookmark(&app, "b", "https://b.test", None);
    let res = handle_method(&app, "bookmark.deleteBulk", &json!({"ids": [a, b]})).unwrap();
    assert_eq!(res, json!(2));

    let op = handle_method(&app, "history.undo", &json!({})).unwrap();
    assert_eq!(op["type"], "deleteBookmarks");
    let list = handle_method(&app, "bookmark.list", &json!({})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_bookmark_search() {
    let (app, _tmp) = setup();
    add_bookmark(&app, "Rust Lang", "https://rust-lang.org", None);
    add_bookmark(&app, "Other", "https://other.test", None);
    let res = handle_method(&app, "bookmark.search", &json!({"query": "RUST"})).unwrap();
    assert_eq!(names(&res), vec!["Rust Lang"]);
}

// ─── Folders ───

#[test]
fn test_folder_add_children_path() {
    let (app, _tmp) = setup();
    let a = add_folder(&app, "A", None);
    let b = add_folder(&app, "B", Some(&a));

    let children = handle_method(&app, "folder.children", &json!({"parentId": "root"})).unwrap();
    assert_eq!(children.as_array().unwrap().len(), 1);
    let all = handle_method(
        &app,
        "folder.children",
        &json!({"parentId": "root", "recursive": true}),
    )
    .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let path = handle_method(&app, "folder.path", &json!({"id": b})).unwrap();
    assert_eq!(names(&path), vec!["Bookmarks", "A", "B"]);
}

#[test]
fn test_folder_delete_cascade_and_root() {
    let (app, _tmp) = setup();
    let a = add_folder(&app, "A", None);
    let b = add_folder(&app, "B", Some(&a));
    let z = add_bookmark(&app, "Z", "https://z.test", Some(&b));

    let res = handle_method(&app, "folder.delete", &json!({"id": a})).unwrap();
    assert_eq!(res["bookmarkIds"], json!([z]));
    assert_eq!(res["folderIds"].as_array().unwrap().len(), 2);

    let root = handle_method(&app, "folder.delete", &json!({"id": "root"})).unwrap();
    assert!(root.is_null());
}

#[test]
fn test_folder_update_cycle_returns_null() {
    let (app, _tmp) = setup();
    let a = add_folder(&app, "A", None);
    let b = add_folder(&app, "B", Some(&a));
    let res = handle_method(
        &app,
        "folder.update",
        &json!({"id": a, "updates": {"parentId": b}}),
    )
    .unwrap();
    assert!(res.is_null());
}

#[test]
fn test_folder_toggle_and_sort() {
    let (app, _tmp) = setup();
    let f = add_folder(&app, "F", None);
    assert_eq!(handle_method(&app, "folder.toggle", &json!({"id": f})).unwrap(), json!(true));
    assert!(handle_method(&app, "folder.toggle", &json!({"id": "ghost"})).unwrap().is_null());
    assert_eq!(handle_method(&app, "folder.sort", &json!({"parentId": "root"})).unwrap(), json!(1));
}

// ─── Batch ───

#[test]
fn test_items_move_skips_cycle() {
    let (app, _tmp) = setup();
    let a = add_folder(&app, "A", None);
    let b = add_folder(&app, "B", Some(&a));
    let res = handle_method(
        &app,
        "items.move",
        &json!({"itemIds": [a], "targetFolderId": b, "itemType": "folder"}),
    )
    .unwrap();
    assert_eq!(res, json!(0));
}

#[test]
fn test_items_move_and_undo() {
    let (app, _tmp) = setup();
    let f = add_folder(&app, "F", None);
    let x = add_bookmark(&app, "x", "https://x.test", None);
    let res = handle_method(
        &app,
        "items.move",
        &json!({"itemIds": [x], "targetFolderId": f, "itemType": "bookmark"}),
    )
    .unwrap();
    assert_eq!(res, json!(1));

    let history = handle_method(&app, "history.list", &json!({})).unwrap();
    assert_eq!(history["currentIndex"], 0);
    assert_eq!(history["canUndo"], true);
    assert_eq!(history["lastOperation"]["type"], "moveItems");

    handle_method(&app, "history.undo", &json!({})).unwrap();
    let history = handle_method(&app, "history.list", &json!({})).unwrap();
    assert_eq!(history["canRedo"], true);
    assert!(history["lastOperation"].is_null());

    let redo = handle_method(&app, "history.redo", &json!({})).unwrap();
    assert_eq!(redo["type"], "moveItems");
    assert!(handle_method(&app, "history.redo", &json!({})).unwrap().is_null());
}

#[test]
fn test_import_and_duplicates() {
    let (app, _tmp) = setup();
    add_bookmark(&app, "X", "https://example.com", None);
    let summary = handle_method(
        &app,
        "import",
        &json!({
            "bookmarks": [
                {"id": "y", "name": "Y", "url": "https://example.com", "folderId": "root"},
                {"id": "z", "name": "Z", "url": "https://z.test", "folderId": "ext"}
            ],
            "folders": [{"id": "ext", "name": "Imported", "parentId": null}]
        }),
    )
    .unwrap();
    assert_eq!(summary["bookmarksAdded"], 1);
    assert_eq!(summary["bookmarksSkipped"], 1);
    assert_eq!(summary["foldersAdded"], 1);

    let dups = handle_method(&app, "duplicates.check", &json!({})).unwrap();
    assert!(dups.as_array().unwrap().is_empty());
}

#[test]
fn test_paths_search() {
    let (app, _tmp) = setup();
    let work = add_folder(&app, "Work", None);
    let res = handle_method(&app, "paths.search", &json!({"query": "work"})).unwrap();
    let arr = res.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], work.as_str());
    assert_eq!(arr[0]["pathString"], "Bookmarks / Work");
}

// ─── State ───

#[test]
fn test_state_export_import() {
    let (app, _tmp) = setup();
    add_bookmark(&app, "Kept", "https://kept.test", None);
    let exported = handle_method(&app, "state.export", &json!({})).unwrap();
    assert_eq!(exported["currentHistoryIndex"], -1);
    assert!(exported["undoneOperationIds"].is_array());

    handle_method(&app, "store.reset", &json!({"scope": "all"})).unwrap();
    assert!(handle_method(&app, "bookmark.list", &json!({})).unwrap().as_array().unwrap().is_empty());

    handle_method(&app, "state.import", &json!({"state": exported})).unwrap();
    let list = handle_method(&app, "bookmark.list", &json!({})).unwrap();
    assert_eq!(names(&list), vec!["Kept"]);
}

#[test]
fn test_state_save_load_list_delete() {
    let (app, _tmp) = setup();
    add_bookmark(&app, "Saved", "https://saved.test", None);
    assert_eq!(handle_method(&app, "state.save", &json!({})).unwrap(), json!(true));

    handle_method(&app, "store.reset", &json!({"scope": "bookmarks"})).unwrap();
    handle_method(&app, "state.load", &json!({"name": "default"})).unwrap();
    assert_eq!(
        handle_method(&app, "bookmark.list", &json!({})).unwrap().as_array().unwrap().len(),
        1
    );

    let list = handle_method(&app, "state.list", &json!({})).unwrap();
    assert_eq!(list[0]["name"], "default");
    assert_eq!(list[0]["bookmarkCount"], 1);

    assert_eq!(handle_method(&app, "state.delete", &json!({"name": "default"})).unwrap(), json!(true));
    let missing = handle_method(&app, "state.load", &json!({"name": "default"}));
    assert!(missing.unwrap_err().contains("Snapshot not found"));
}

#[test]
fn test_store_reset_unknown_scope() {
    let (app, _tmp) = setup();
    assert!(handle_method(&app, "store.reset", &json!({"scope": "everything"})).is_err());
}

// ─── Misc ───

#[test]
fn test_cache_stats_and_settings() {
    let (app, _tmp) = setup();
    let stats = handle_method(&app, "cache.stats", &json!({})).unwrap();
    assert_eq!(stats.as_array().unwrap().len(), 2);

    let settings = handle_method(&app, "settings.get", &json!({})).unwrap();
    assert_eq!(settings["search"]["debounce_ms"], 300);
    assert_eq!(settings["cache"]["staleness"], "Version");
}
