//! Search Service for markstore.
//!
//! Substring search over bookmarks and over an index of folder paths. Both
//! result sets are cached and dropped automatically once the tree they were
//! computed from changes. Path search is debounced: a new request preempts
//! a pending one instead of queueing behind it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::services::cache_manager::BoundedCache;
use crate::services::validation::{is_blank, sanitize_input};
use crate::types::bookmark::{Bookmark, BookmarkWithPath, Folder, ROOT_FOLDER_ID};
use crate::types::settings::SearchSettings;

/// Read access to the folder tree needed by search.
pub trait FolderSource {
    /// Folder chain from root down to `folder_id`.
    fn folder_path(&self, folder_id: &str) -> Vec<Folder>;
    /// Direct children of `parent_id`.
    fn folders_by_parent(&self, parent_id: &str) -> Vec<Folder>;
    /// Changes whenever the tree changes.
    fn stamp(&self) -> u64;
}

impl<T: FolderSource + ?Sized> FolderSource for Arc<T> {
    fn folder_path(&self, folder_id: &str) -> Vec<Folder> {
        (**self).folder_path(folder_id)
    }

    fn folders_by_parent(&self, parent_id: &str) -> Vec<Folder> {
        (**self).folders_by_parent(parent_id)
    }

    fn stamp(&self) -> u64 {
        (**self).stamp()
    }
}

/// One folder in the path index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub id: String,
    pub path_string: String,
    pub path: Vec<Folder>,
}

#[derive(Debug)]
struct PathIndex {
    stamp: u64,
    entries: Arc<Vec<PathEntry>>,
}

type SharedIndex = Arc<Mutex<Option<PathIndex>>>;

pub struct SearchService {
    settings: SearchSettings,
    query_limit: usize,
    query_cache: BoundedCache<Arc<Vec<BookmarkWithPath>>>,
    cache_stamp: Option<u64>,
    path_index: SharedIndex,
    pending: Option<JoinHandle<()>>,
}

fn lock_index(index: &SharedIndex) -> MutexGuard<'_, Option<PathIndex>> {
    match index.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn join_names(path: &[Folder]) -> String {
    path.iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Depth-first walk from root collecting every reachable folder's path.
fn build_path_index<S: FolderSource + ?Sized>(
    source: &S,
    max_depth: usize,
    max_entries: usize,
) -> Vec<PathEntry> {
    fn visit<S: FolderSource + ?Sized>(
        source: &S,
        folder_id: &str,
        depth: usize,
        max_depth: usize,
        max_entries: usize,
        out: &mut Vec<PathEntry>,
        limited: &mut bool,
    ) {
        if depth > max_depth || out.len() >= max_entries {
            *limited = true;
            return;
        }
        let path = source.folder_path(folder_id);
        out.push(PathEntry {
            id: folder_id.to_string(),
            path_string: join_names(&path),
            path,
        });
        for child in source.folders_by_parent(folder_id) {
            visit(source, &child.id, depth + 1, max_depth, max_entries, out, limited);
        }
    }

    let mut entries = Vec::new();
    let mut limited = false;
    visit(
        source,
        ROOT_FOLDER_ID,
        0,
        max_depth,
        max_entries,
        &mut entries,
        &mut limited,
    );
    if limited {
        tracing::warn!(
            entries = entries.len(),
            max_depth,
            max_entries,
            "path index hit its depth or size limit; index is partial"
        );
    }
    entries
}

/// Returns the memoized index for `source`, rebuilding it if the stamp moved.
fn index_for<S: FolderSource + ?Sized>(
    memo: &SharedIndex,
    source: &S,
    settings: &SearchSettings,
) -> Arc<Vec<PathEntry>> {
    let stamp = source.stamp();
    let mut guard = lock_index(memo);
    if let Some(index) = guard.as_ref() {
        if index.stamp == stamp {
            return Arc::clone(&index.entries);
        }
    }
    let entries = Arc::new(build_path_index(
        source,
        settings.max_path_depth,
        settings.max_path_index,
    ));
    *guard = Some(PathIndex {
        stamp,
        entries: Arc::clone(&entries),
    });
    entries
}

fn scan_index(entries: &[PathEntry], needle: &str, max_results: usize) -> Vec<PathEntry> {
    entries
        .iter()
        .filter(|e| e.path_string.to_lowercase().contains(needle))
        .take(max_results)
        .cloned()
        .collect()
}

impl SearchService {
    /// `query_limit` caps query length; `cache_size` bounds the query cache.
    pub fn new(settings: SearchSettings, query_limit: usize, cache_size: usize) -> Self {
        Self {
            settings,
            query_limit,
            query_cache: BoundedCache::new(cache_size, None),
            cache_stamp: None,
            path_index: Arc::new(Mutex::new(None)),
            pending: None,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Truncates to the query limit, then strips unsafe fragments.
    pub fn sanitize_query(&self, query: &str) -> String {
        if is_blank(query) {
            return String::new();
        }
        let truncated: String = query.chars().take(self.query_limit).collect();
        sanitize_input(&truncated)
    }

    fn sync_stamp(&mut self, stamp: u64) {
        if self.cache_stamp != Some(stamp) {
            self.query_cache.clear();
            self.cache_stamp = Some(stamp);
        }
    }

    /// Case-insensitive substring match on name, url and description.
    pub fn search_bookmarks<S: FolderSource + ?Sized>(
        &mut self,
        query: &str,
        bookmarks: &[Bookmark],
        source: &S,
    ) -> Vec<BookmarkWithPath> {
        let clean = self.sanitize_query(query);
        if is_blank(&clean) {
            return Vec::new();
        }

        self.sync_stamp(source.stamp());
        let key = clean.to_lowercase();
        if let Some(hit) = self.query_cache.get(&key) {
            return hit.as_ref().clone();
        }

        let needle = key.trim();
        let results: Vec<BookmarkWithPath> = bookmarks
            .iter()
            .filter(|b| {
                b.name.to_lowercase().contains(needle)
                    || b.url.to_lowercase().contains(needle)
                    || b.description.to_lowercase().contains(needle)
            })
            .map(|b| {
                let folder_path = source.folder_path(&b.folder_id);
                BookmarkWithPath {
                    bookmark: b.clone(),
                    path_string: join_names(&folder_path),
                    folder_path,
                }
            })
            .collect();

        self.query_cache.set(&key, Arc::new(results.clone()));
        results
    }

    /// Debounced folder-path search. `callback` fires once with up to
    /// `max_results` matches, unless a later call preempts this one first.
    /// A blank query cancels the pending search and answers immediately.
    ///
    /// Outside a tokio runtime the search runs inline without debouncing.
    pub fn search_paths<S, F>(&mut self, query: &str, source: S, callback: F)
    where
        S: FolderSource + Send + 'static,
        F: FnOnce(Vec<PathEntry>) + Send + 'static,
    {
        self.cancel_pending();
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            callback(Vec::new());
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!("no async runtime; running path search inline");
                callback(self.search_paths_now(&needle, &source));
                return;
            }
        };

        let memo = Arc::clone(&self.path_index);
        let settings = self.settings.clone();
        let delay = Duration::from_millis(settings.debounce_ms);
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let entries = index_for(&memo, &source, &settings);
            callback(scan_index(&entries, &needle, settings.max_results));
        }));
    }

    /// Undebounced path search against the memoized index.
    pub fn search_paths_now<S: FolderSource + ?Sized>(&self, query: &str, source: &S) -> Vec<PathEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let entries = index_for(&self.path_index, source, &self.settings);
        scan_index(&entries, &needle, self.settings.max_results)
    }

    /// True while a debounced path search has not yet fired.
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn cached_queries(&self) -> usize {
        self.query_cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.query_cache.clear();
        self.cache_stamp = None;
        *lock_index(&self.path_index) = None;
    }

    /// Cancels any pending path search and drops every cache.
    pub fn cleanup(&mut self) {
        self.cancel_pending();
        self.clear_cache();
    }
}

impl Drop for SearchService {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
