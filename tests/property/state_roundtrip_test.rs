//! Property-based tests for persisted store state.
//!
//! A snapshot serialized to JSON and restored into a fresh store must
//! reproduce the same state, and undone-id rehydration must tolerate any
//! JSON shape.

use std::collections::BTreeSet;

use markstore::app::App;
use markstore::types::bookmark::{ItemType, NewBookmark, NewFolder, ROOT_FOLDER_ID};
use markstore::types::history::{PersistedState, UndoneSet};
use markstore::types::settings::StoreSettings;
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{0,20}[a-zA-Z0-9]"
}

/// Strategy for JSON values that are not arrays.
fn arb_non_array() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,10}".prop_map(Value::String),
        prop::collection::btree_map("[a-z]{1,5}", "[a-z]{1,5}", 0..4)
            .prop_map(|m| json!(m)),
    ]
}

/// Helper: a store with some folders, bookmarks and tracked moves, a few of
/// them undone so the redo branch is non-empty.
fn populated_app(
    folder_names: &[String],
    bookmark_names: &[String],
    moves: usize,
    undos: usize,
) -> App {
    let mut app = App::new(StoreSettings::default());
    let mut folder_ids = vec![ROOT_FOLDER_ID.to_string()];
    for (i, name) in folder_names.iter().enumerate() {
        let parent = folder_ids[i % folder_ids.len()].clone();
        if let Some(folder) = app.add_folder(NewFolder {
            name: name.clone(),
            parent_id: Some(parent),
            is_expanded: i % 2 == 0,
        }) {
            folder_ids.push(folder.id);
        }
    }

    let mut bookmark_ids = Vec::new();
    for (i, name) in bookmark_names.iter().enumerate() {
        if let Some(bookmark) = app.add_bookmark(NewBookmark {
            name: name.clone(),
            url: format!("https://site{}.test/page", i),
            description: format!("entry {}", i),
            folder_id: Some(folder_ids[i % folder_ids.len()].clone()),
        }) {
            bookmark_ids.push(bookmark.id);
        }
    }

    for m in 0..moves {
        if bookmark_ids.is_empty() {
            break;
        }
        let id = bookmark_ids[m % bookmark_ids.len()].clone();
        let target = folder_ids[(m + 1) % folder_ids.len()].clone();
        app.move_items(&[id], &target, ItemType::Bookmark);
    }
    for _ in 0..undos {
        app.undo();
    }
    app
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn snapshot_survives_json_and_restore(
        folder_names in prop::collection::vec(arb_name(), 0..6),
        bookmark_names in prop::collection::vec(arb_name(), 1..12),
        moves in 0usize..6,
        undos in 0usize..4,
    ) {
        let app = populated_app(&folder_names, &bookmark_names, moves, undos);
        let state = app.snapshot();

        let json = serde_json::to_string(&state).expect("state serializes");
        let decoded: PersistedState = serde_json::from_str(&json).expect("state deserializes");
        prop_assert_eq!(&decoded, &state);

        let mut restored = App::new(StoreSettings::default());
        restored.restore(decoded);
        prop_assert_eq!(restored.snapshot(), state);
    }

    #[test]
    fn restored_store_can_redo_undone_moves(
        bookmark_names in prop::collection::vec(arb_name(), 1..8),
        moves in 1usize..5,
    ) {
        let folders = vec!["Inbox".to_string()];
        let app = populated_app(&folders, &bookmark_names, moves, 1);
        let mut redone = app.snapshot();

        let mut restored = App::new(StoreSettings::default());
        restored.restore(redone.clone());
        prop_assert!(restored.redo().is_some());

        redone = restored.snapshot();
        prop_assert!(redone.undone_operation_ids.is_empty());
        prop_assert_eq!(redone.current_history_index, redone.history.len() as i64 - 1);
    }

    #[test]
    fn non_array_undone_ids_rehydrate_empty(raw in arb_non_array()) {
        prop_assert!(UndoneSet::rehydrate(raw.clone()).is_empty());

        let state = json!({
            "bookmarks": [],
            "folders": [],
            "history": [],
            "currentHistoryIndex": -1,
            "undoneOperationIds": raw,
        });
        let decoded: PersistedState = serde_json::from_value(state).expect("state deserializes");
        prop_assert!(decoded.undone_operation_ids.is_empty());
    }

    #[test]
    fn array_undone_ids_keep_only_strings(
        ids in prop::collection::vec("[a-f0-9]{4,8}", 0..8),
        numbers in prop::collection::vec(any::<i32>(), 0..4),
    ) {
        let mut items: Vec<Value> = ids.iter().map(|s| json!(s)).collect();
        items.extend(numbers.iter().map(|n| json!(n)));

        let set = UndoneSet::rehydrate(Value::Array(items));
        let expected: BTreeSet<String> = ids.into_iter().collect();
        let actual: BTreeSet<String> = set.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
    }
}
