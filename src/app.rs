//! App Core for markstore.
//!
//! `App` is the store context: it owns one instance of every manager and
//! service and is the only place where they meet. Tracked actions record
//! history here, derived views are cached here, and every inner error is
//! turned into a sentinel (`None`, `false`, `0`, empty) and logged.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::database::{Database, SnapshotInfo, SnapshotRepository};
use crate::managers::operation_handlers::HandlerRegistry;
use crate::managers::operation_history::{OperationHistory, OperationHistoryTrait};
use crate::managers::tree_store::{path_to_string, FolderSnapshot, TreeStore, TreeStoreTrait};
use crate::services::cache_manager::{cache_names, CacheManager, CacheStats};
use crate::services::link_checker::{LinkChecker, LinkProbe};
use crate::services::search_service::{FolderSource, PathEntry, SearchService};
use crate::services::validation::Validator;
use crate::types::bookmark::{
    Bookmark, BookmarkUpdate, BookmarkWithPath, CascadeSummary, Folder, FolderUpdate, ImportBatch,
    ImportSummary, ItemType, NewBookmark, NewFolder, ReorderKind, SortKind,
};
use crate::types::errors::PersistenceError;
use crate::types::history::{
    op_types, DeleteBookmarksData, MoveItemsData, Operation, OriginalPlacement, PersistedState,
    ReorderData, SortData,
};
use crate::types::settings::{StalenessPolicy, StoreSettings};

/// Cache key of the full path-augmented bookmark list.
const ALL_BOOKMARKS_KEY: &str = "all";

/// Central store context holding the tree, its history and derived-data services.
pub struct App {
    pub tree: TreeStore,
    pub history: OperationHistory,
    pub cache: CacheManager,
    pub search: SearchService,
    settings: StoreSettings,
    selected_items: Vec<String>,
    invalid_bookmarks: Vec<Bookmark>,
    duplicate_bookmarks: Vec<Bookmark>,
    folder_snapshot: Option<Arc<FolderSnapshot>>,
    db: Option<Database>,
}

fn to_payload<T: serde::Serialize>(data: &T) -> Option<Value> {
    match serde_json::to_value(data) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "could not encode history payload");
            None
        }
    }
}

impl App {
    pub fn new(settings: StoreSettings) -> Self {
        Self::with_registry(settings, HandlerRegistry::with_defaults())
    }

    /// Builds a store whose history dispatches through `registry`.
    pub fn with_registry(settings: StoreSettings, registry: HandlerRegistry) -> Self {
        let ttl = settings.cache.ttl_secs.map(Duration::from_secs);
        let mut cache = CacheManager::new();
        cache.create_cache(cache_names::FOLDER_PATHS, settings.cache.max_path_cache_size, ttl);
        cache.create_cache(
            cache_names::BOOKMARKS_WITH_PATH,
            settings.cache.max_bookmark_cache_size,
            ttl,
        );

        Self {
            tree: TreeStore::new(Validator::new(settings.limits.clone())),
            history: OperationHistory::new(registry),
            cache,
            search: SearchService::new(
                settings.search.clone(),
                settings.limits.bookmark_name,
                settings.cache.max_search_cache_size,
            ),
            settings,
            selected_items: Vec::new(),
            invalid_bookmarks: Vec::new(),
            duplicate_bookmarks: Vec::new(),
            folder_snapshot: None,
            db: None,
        }
    }

    /// Attaches the snapshot database used by the `*_snapshot` methods.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Staleness signal for derived views under the configured policy.
    pub fn stamp(&self) -> u64 {
        match self.settings.cache.staleness {
            StalenessPolicy::ItemCount => self.tree.item_count() as u64,
            StalenessPolicy::Version => self.tree.version(),
        }
    }

    // --- derived views ---

    /// Cached root-to-folder chain.
    pub fn folder_path(&mut self, folder_id: &str) -> Arc<Vec<Folder>> {
        let stamp = self.stamp();
        if let Some(hit) = self
            .cache
            .get_fresh::<Vec<Folder>>(cache_names::FOLDER_PATHS, folder_id, stamp)
        {
            return hit;
        }
        let path = Arc::new(self.tree.folder_path(folder_id));
        self.cache
            .set_stamped(cache_names::FOLDER_PATHS, folder_id, Arc::clone(&path), stamp);
        path
    }

    /// Every bookmark with its folder chain, recomputed only when stale.
    pub fn bookmarks_with_path(&mut self) -> Arc<Vec<BookmarkWithPath>> {
        let stamp = self.stamp();
        if let Some(hit) = self.cache.get_fresh::<Vec<BookmarkWithPath>>(
            cache_names::BOOKMARKS_WITH_PATH,
            ALL_BOOKMARKS_KEY,
            stamp,
        ) {
            return hit;
        }

        let bookmarks: Vec<Bookmark> = self.tree.bookmarks().to_vec();
        let mut view = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            let folder_path = self.folder_path(&bookmark.folder_id);
            view.push(BookmarkWithPath {
                path_string: path_to_string(&folder_path),
                folder_path: folder_path.as_ref().clone(),
                bookmark,
            });
        }
        let view = Arc::new(view);
        self.cache.set_stamped(
            cache_names::BOOKMARKS_WITH_PATH,
            ALL_BOOKMARKS_KEY,
            Arc::clone(&view),
            stamp,
        );
        view
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.cache.all_stats()
    }

    // --- untracked mutations ---

    pub fn add_bookmark(&mut self, data: NewBookmark) -> Option<Bookmark> {
        self.tree
            .add_bookmark(data)
            .map_err(|e| tracing::warn!(error = %e, "add bookmark rejected"))
            .ok()
    }

    pub fn update_bookmark(&mut self, id: &str, updates: BookmarkUpdate) -> Option<Bookmark> {
        self.tree
            .update_bookmark(id, updates)
            .map_err(|e| tracing::warn!(bookmark = id, error = %e, "update bookmark rejected"))
            .ok()
    }

    pub fn delete_bookmark(&mut self, id: &str) -> bool {
        self.tree.delete_bookmark(id)
    }

    pub fn add_folder(&mut self, data: NewFolder) -> Option<Folder> {
        self.tree
            .add_folder(data)
            .map_err(|e| tracing::warn!(error = %e, "add folder rejected"))
            .ok()
    }

    pub fn update_folder(&mut self, id: &str, updates: FolderUpdate) -> Option<Folder> {
        self.tree
            .update_folder(id, updates)
            .map_err(|e| tracing::warn!(folder = id, error = %e, "update folder rejected"))
            .ok()
    }

    /// Cascading delete. Deleting root is refused and returns `None`.
    pub fn delete_folder(&mut self, id: &str) -> Option<CascadeSummary> {
        self.tree
            .delete_folder(id)
            .map_err(|e| tracing::warn!(folder = id, error = %e, "delete folder rejected"))
            .ok()
    }

    pub fn toggle_folder_expansion(&mut self, id: &str) -> Option<bool> {
        self.tree.toggle_folder_expansion(id)
    }

    pub fn sort_folders_by_name(&mut self, parent_id: &str) -> usize {
        self.tree.sort_folders_by_name(parent_id)
    }

    pub fn import_bookmarks(&mut self, batch: ImportBatch) -> ImportSummary {
        self.tree.import_bookmarks(batch)
    }

    // --- tracked mutations ---

    /// Deletes several bookmarks as one undoable step. Returns how many went.
    pub fn delete_bookmarks_bulk(&mut self, ids: &[String]) -> usize {
        let removed = self.tree.delete_bookmarks_bulk(ids);
        let count = removed.len();
        if count == 0 {
            return 0;
        }
        let data = DeleteBookmarksData { bookmarks: removed };
        if let Some(payload) = to_payload(&data) {
            self.history.record(
                op_types::DELETE_BOOKMARKS,
                &format!("Delete {} bookmark(s)", count),
                payload,
            );
        }
        count
    }

    /// Moves items into `target_folder_id` as one undoable step.
    pub fn move_items(&mut self, item_ids: &[String], target_folder_id: &str, item_type: ItemType) -> usize {
        let mut original_state = std::collections::BTreeMap::new();
        for id in item_ids {
            let placement = match item_type {
                ItemType::Bookmark => self.tree.bookmark(id).map(|b| OriginalPlacement {
                    folder_id: Some(b.folder_id.clone()),
                    parent_id: None,
                }),
                ItemType::Folder => self.tree.folder(id).map(|f| OriginalPlacement {
                    folder_id: None,
                    parent_id: f.parent_id.clone(),
                }),
            };
            if let Some(placement) = placement {
                original_state.insert(id.clone(), placement);
            }
        }

        let moved = match self.tree.move_items(item_ids, target_folder_id, item_type) {
            Ok(moved) => moved,
            Err(err) => {
                tracing::warn!(target = target_folder_id, error = %err, "move rejected");
                return 0;
            }
        };
        if moved == 0 {
            return 0;
        }

        let target_name = self
            .tree
            .folder(target_folder_id)
            .map(|f| f.name.clone())
            .unwrap_or_default();
        let data = MoveItemsData {
            item_ids: item_ids.to_vec(),
            target_folder_id: target_folder_id.to_string(),
            item_type,
            original_state,
        };
        if let Some(payload) = to_payload(&data) {
            self.history.record(
                op_types::MOVE_ITEMS,
                &format!("Move {} {}(s) to \"{}\"", moved, item_type.label(), target_name),
                payload,
            );
        }
        moved
    }

    /// Moves a bookmark to `target_index` within its folder as one undoable step.
    pub fn reorder_bookmark(
        &mut self,
        folder_id: &str,
        bookmark_id: &str,
        target_index: usize,
        kind: ReorderKind,
    ) -> bool {
        let original_index = self.tree.position_in_folder(folder_id, bookmark_id);
        if !self.tree.reorder_bookmark(folder_id, bookmark_id, target_index) {
            return false;
        }

        let name = self
            .tree
            .bookmark(bookmark_id)
            .map(|b| b.name.clone())
            .unwrap_or_default();
        let description = match kind {
            ReorderKind::Up => format!("Move bookmark \"{}\" up", name),
            ReorderKind::Down => format!("Move bookmark \"{}\" down", name),
            ReorderKind::Drag => format!("Drag bookmark \"{}\" to a new position", name),
            ReorderKind::Reorder => format!("Reposition bookmark \"{}\"", name),
        };
        let data = ReorderData {
            folder_id: folder_id.to_string(),
            bookmark_id: bookmark_id.to_string(),
            target_index,
            original_index,
        };
        if let Some(payload) = to_payload(&data) {
            self.history
                .record(op_types::REORDER_BOOKMARKS, &description, payload);
        }
        true
    }

    pub fn move_bookmark_up(&mut self, bookmark_id: &str) -> bool {
        let Some(folder_id) = self.tree.bookmark(bookmark_id).map(|b| b.folder_id.clone()) else {
            return false;
        };
        match self.tree.position_in_folder(&folder_id, bookmark_id) {
            Some(current) if current > 0 => {
                self.reorder_bookmark(&folder_id, bookmark_id, current - 1, ReorderKind::Up)
            }
            _ => false,
        }
    }

    pub fn move_bookmark_down(&mut self, bookmark_id: &str) -> bool {
        let Some(folder_id) = self.tree.bookmark(bookmark_id).map(|b| b.folder_id.clone()) else {
            return false;
        };
        let last = self.tree.sibling_count(&folder_id).saturating_sub(1);
        match self.tree.position_in_folder(&folder_id, bookmark_id) {
            Some(current) if current < last => {
                self.reorder_bookmark(&folder_id, bookmark_id, current + 1, ReorderKind::Down)
            }
            _ => false,
        }
    }

    /// Sorts one folder's bookmarks as one undoable step.
    pub fn sort_bookmarks(&mut self, folder_id: &str, kind: SortKind) -> bool {
        let original_order = self.tree.sort_bookmarks(folder_id, kind);
        if original_order.is_empty() {
            return false;
        }
        let folder_name = self
            .tree
            .folder(folder_id)
            .map(|f| f.name.clone())
            .unwrap_or_default();
        let data = SortData {
            folder_id: folder_id.to_string(),
            kind,
            original_order,
        };
        if let Some(payload) = to_payload(&data) {
            self.history.record(
                op_types::SORT_BOOKMARKS,
                &format!("Sort \"{}\" by {}", folder_name, kind.label()),
                payload,
            );
        }
        true
    }

    // --- history ---

    pub fn undo(&mut self) -> Option<Operation> {
        self.history
            .undo(&mut self.tree)
            .map_err(|e| tracing::warn!(error = %e, "undo skipped"))
            .ok()
    }

    pub fn redo(&mut self) -> Option<Operation> {
        self.history
            .redo(&mut self.tree)
            .map_err(|e| tracing::warn!(error = %e, "redo skipped"))
            .ok()
    }

    pub fn reset_history(&mut self) {
        self.history.reset();
    }

    pub fn reset_bookmarks(&mut self) {
        self.tree.reset_bookmarks();
    }

    pub fn reset_folders(&mut self) {
        self.tree.reset_folders();
    }

    /// Clears the tree, its history and every cache.
    pub fn reset_all(&mut self) {
        self.tree.reset_all();
        self.history.reset();
        self.cache.clear_all();
        self.search.clear_cache();
        self.selected_items.clear();
        self.invalid_bookmarks.clear();
        self.duplicate_bookmarks.clear();
    }

    // --- search ---

    pub fn search_bookmarks(&mut self, query: &str) -> Vec<BookmarkWithPath> {
        self.search
            .search_bookmarks(query, self.tree.bookmarks(), &self.tree)
    }

    /// Debounced folder-path search; see [`SearchService::search_paths`].
    pub fn search_paths<F>(&mut self, query: &str, callback: F)
    where
        F: FnOnce(Vec<PathEntry>) + Send + 'static,
    {
        let snapshot = self.shared_folder_snapshot();
        self.search.search_paths(query, snapshot, callback);
    }

    /// Owned folder copy for background path search, rebuilt only when the
    /// tree version moves.
    pub fn shared_folder_snapshot(&mut self) -> Arc<FolderSnapshot> {
        let version = self.tree.version();
        if let Some(snapshot) = self.folder_snapshot.as_ref() {
            if snapshot.stamp() == version {
                return Arc::clone(snapshot);
            }
        }
        let snapshot = Arc::new(self.tree.folder_snapshot());
        self.folder_snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn search_paths_now(&self, query: &str) -> Vec<PathEntry> {
        self.search.search_paths_now(query, &self.tree)
    }

    // --- selection and scans ---

    pub fn set_selected_items(&mut self, ids: Vec<String>) {
        self.selected_items = ids;
    }

    pub fn clear_selected_items(&mut self) {
        self.selected_items.clear();
    }

    pub fn selected_items(&self) -> &[String] {
        &self.selected_items
    }

    /// Records and returns bookmarks whose URL appeared earlier.
    pub fn check_duplicate_bookmarks(&mut self) -> Vec<Bookmark> {
        self.duplicate_bookmarks = self.tree.find_duplicates();
        self.duplicate_bookmarks.clone()
    }

    pub fn duplicate_bookmarks(&self) -> &[Bookmark] {
        &self.duplicate_bookmarks
    }

    pub fn set_invalid_bookmarks(&mut self, bookmarks: Vec<Bookmark>) {
        self.invalid_bookmarks = bookmarks;
    }

    pub fn invalid_bookmarks(&self) -> &[Bookmark] {
        &self.invalid_bookmarks
    }

    // --- persistence ---

    /// Everything a persistence collaborator needs to rebuild this store.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            bookmarks: self.tree.bookmarks().to_vec(),
            folders: self.tree.folders().to_vec(),
            history: self.history.entries().to_vec(),
            current_history_index: self.history.current_index(),
            undone_operation_ids: self.history.undone_ids().clone(),
        }
    }

    /// Replaces the whole store with persisted state, repairing it as needed.
    pub fn restore(&mut self, state: PersistedState) {
        let repairs = self.tree.replace_contents(state.bookmarks, state.folders);
        self.history.restore(
            state.history,
            state.current_history_index,
            state.undone_operation_ids,
        );
        self.cache.clear_all();
        self.search.clear_cache();
        self.invalid_bookmarks.clear();
        self.duplicate_bookmarks.clear();
        tracing::info!(
            bookmarks = self.tree.bookmarks().len(),
            folders = self.tree.folders().len(),
            history = self.history.len(),
            repairs,
            "store restored"
        );
    }

    fn snapshots(&self) -> Result<SnapshotRepository<'_>, PersistenceError> {
        self.db
            .as_ref()
            .map(|db| SnapshotRepository::new(db.connection()))
            .ok_or_else(|| PersistenceError::DatabaseError("no snapshot database attached".to_string()))
    }

    pub fn save_snapshot(&self, name: &str) -> Result<(), PersistenceError> {
        self.snapshots()?.save(name, &self.snapshot())
    }

    pub fn load_snapshot(&mut self, name: &str) -> Result<(), PersistenceError> {
        let state = self.snapshots()?.load(name)?;
        self.restore(state);
        Ok(())
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<bool, PersistenceError> {
        self.snapshots()?.delete(name)
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, PersistenceError> {
        self.snapshots()?.list()
    }

    /// Sweeps expired cache entries and cancels pending searches.
    pub fn cleanup(&mut self) {
        self.cache.cleanup();
        self.search.cleanup();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

/// Scans every bookmark for liveness without holding the store lock while
/// probes are in flight. The tree may change during the scan; the result
/// describes the bookmarks as they were when it started.
pub async fn check_invalid_bookmarks<P: LinkProbe + Sync>(
    app: &Mutex<App>,
    checker: &LinkChecker<P>,
) -> Vec<Bookmark> {
    let bookmarks = match app.lock() {
        Ok(app) => app.tree.bookmarks().to_vec(),
        Err(poisoned) => poisoned.into_inner().tree.bookmarks().to_vec(),
    };

    let invalid = checker.find_invalid(&bookmarks).await;

    match app.lock() {
        Ok(mut app) => app.set_invalid_bookmarks(invalid.clone()),
        Err(poisoned) => poisoned.into_inner().set_invalid_bookmarks(invalid.clone()),
    }
    invalid
}
