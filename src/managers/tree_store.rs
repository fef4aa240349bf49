//! Tree Store for markstore.
//!
//! Implements `TreeStoreTrait`: CRUD, move, reorder and import for the
//! bookmark/folder tree, held in memory. Every mutation validates first,
//! applies completely, then bumps the store version so derived caches can
//! detect staleness.
//!
//! Invariants kept by this module:
//! - folder parent links form a tree rooted at [`ROOT_FOLDER_ID`];
//! - every `folder_id` / `parent_id` names an existing folder;
//! - ids are unique within their own collection.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::services::search_service::FolderSource;
use crate::services::validation::{sanitize_url, Validator};
use crate::types::bookmark::{
    Bookmark, BookmarkUpdate, CascadeSummary, Folder, FolderUpdate, ImportBatch, ImportSummary,
    ItemType, NewBookmark, NewFolder, OrderEntry, SortKind, ROOT_FOLDER_ID,
};
use crate::types::errors::{StoreError, ValidationError, ValidationIssue};

/// Trait defining tree mutation operations.
pub trait TreeStoreTrait {
    fn add_bookmark(&mut self, data: NewBookmark) -> Result<Bookmark, StoreError>;
    fn add_folder(&mut self, data: NewFolder) -> Result<Folder, StoreError>;
    fn update_bookmark(&mut self, id: &str, updates: BookmarkUpdate) -> Result<Bookmark, StoreError>;
    fn update_folder(&mut self, id: &str, updates: FolderUpdate) -> Result<Folder, StoreError>;
    fn delete_bookmark(&mut self, id: &str) -> bool;
    fn delete_bookmarks_bulk(&mut self, ids: &[String]) -> Vec<Bookmark>;
    fn delete_folder(&mut self, id: &str) -> Result<CascadeSummary, StoreError>;
    /// Moves items into `target_folder_id`. Returns how many actually moved.
    fn move_items(
        &mut self,
        item_ids: &[String],
        target_folder_id: &str,
        item_type: ItemType,
    ) -> Result<usize, StoreError>;
    /// Returns whether the sibling order changed.
    fn reorder_bookmark(&mut self, folder_id: &str, bookmark_id: &str, target_index: usize) -> bool;
    fn import_bookmarks(&mut self, batch: ImportBatch) -> ImportSummary;
}

/// In-memory bookmark tree.
#[derive(Debug, Clone)]
pub struct TreeStore {
    bookmarks: Vec<Bookmark>,
    folders: Vec<Folder>,
    validator: Validator,
    version: u64,
}

/// Walks parent links from `start` up to root and returns the chain
/// root-first. Stops early on a dangling link or after `limit` steps.
pub(crate) fn walk_folder_path<'a, F>(start: &str, lookup: F, limit: usize) -> Vec<Folder>
where
    F: Fn(&str) -> Option<&'a Folder>,
{
    let mut path = Vec::new();
    let mut current = lookup(start);
    while let Some(folder) = current {
        if path.len() > limit {
            tracing::warn!(folder = start, "folder path exceeds the folder count; parent links are cyclic");
            break;
        }
        path.push(folder.clone());
        current = match folder.parent_id.as_deref() {
            Some(pid) => lookup(pid),
            None => None,
        };
    }
    path.reverse();
    path
}

/// Joins folder names with `" / "`.
pub fn path_to_string(path: &[Folder]) -> String {
    path.iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

impl TreeStore {
    /// Creates an empty tree holding only the root folder.
    pub fn new(validator: Validator) -> Self {
        Self {
            bookmarks: Vec::new(),
            folders: vec![Folder::root()],
            validator,
            version: 0,
        }
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Records that the tree changed.
    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Monotonic counter bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of bookmarks plus folders.
    pub fn item_count(&self) -> usize {
        self.bookmarks.len() + self.folders.len()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn bookmark(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn folder_exists(&self, id: &str) -> bool {
        self.folders.iter().any(|f| f.id == id)
    }

    fn bookmark_index(&self, id: &str) -> Option<usize> {
        self.bookmarks.iter().position(|b| b.id == id)
    }

    fn folder_index(&self, id: &str) -> Option<usize> {
        self.folders.iter().position(|f| f.id == id)
    }

    /// Direct children of `parent_id`.
    pub fn folders_by_parent(&self, parent_id: &str) -> Vec<&Folder> {
        self.folders
            .iter()
            .filter(|f| f.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Every folder below `parent_id`, depth-first pre-order.
    pub fn all_child_folders(&self, parent_id: &str) -> Vec<&Folder> {
        self.descendant_folder_ids(parent_id)
            .iter()
            .filter_map(|id| self.folder(id))
            .collect()
    }

    /// Bookmarks of one folder in display order.
    pub fn bookmarks_by_folder(&self, folder_id: &str) -> Vec<&Bookmark> {
        self.sorted_sibling_indices(folder_id)
            .into_iter()
            .map(|i| &self.bookmarks[i])
            .collect()
    }

    /// Folder chain from root down to `folder_id`; empty if it does not exist.
    pub fn folder_path(&self, folder_id: &str) -> Vec<Folder> {
        walk_folder_path(folder_id, |id| self.folder(id), self.folders.len())
    }

    pub fn path_string(&self, folder_id: &str) -> String {
        path_to_string(&self.folder_path(folder_id))
    }

    /// Ids of all folders below `folder_id`, found depth-first over parent links.
    pub fn descendant_folder_ids(&self, folder_id: &str) -> Vec<String> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for folder in &self.folders {
            if let Some(pid) = folder.parent_id.as_deref() {
                children.entry(pid).or_default().push(folder.id.as_str());
            }
        }

        let mut result = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(folder_id);
        let mut stack: Vec<&str> = children
            .get(folder_id)
            .map(|c| c.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            result.push(id.to_string());
            if let Some(grandchildren) = children.get(id) {
                stack.extend(grandchildren.iter().rev().copied());
            }
        }
        result
    }

    /// True if `needle` lies on the ancestor chain starting at `start`
    /// (including `start` itself). Root never matches.
    fn chain_contains(&self, start: &str, needle: &str) -> bool {
        let mut current = self.folder(start);
        let mut steps = 0;
        while let Some(folder) = current {
            if folder.parent_id.is_none() {
                return false;
            }
            if folder.id == needle {
                return true;
            }
            steps += 1;
            if steps > self.folders.len() {
                // Corrupt links; refuse rather than loop.
                return true;
            }
            current = folder.parent_id.as_deref().and_then(|pid| self.folder(pid));
        }
        false
    }

    /// Indices into `bookmarks` for one folder, stably sorted by order.
    /// A missing order counts as the bookmark's position among its siblings.
    fn sorted_sibling_indices(&self, folder_id: &str) -> Vec<usize> {
        let mut keyed: Vec<(u32, usize)> = self
            .bookmarks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.folder_id == folder_id)
            .enumerate()
            .map(|(pos, (idx, b))| (b.order.unwrap_or(pos as u32), idx))
            .collect();
        keyed.sort_by_key(|(order, _)| *order);
        keyed.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Display position of a bookmark within its folder.
    pub fn position_in_folder(&self, folder_id: &str, bookmark_id: &str) -> Option<usize> {
        self.sorted_sibling_indices(folder_id)
            .into_iter()
            .position(|i| self.bookmarks[i].id == bookmark_id)
    }

    /// Number of bookmarks directly inside `folder_id`.
    pub fn sibling_count(&self, folder_id: &str) -> usize {
        self.bookmarks.iter().filter(|b| b.folder_id == folder_id).count()
    }

    fn next_order(&self, folder_id: &str) -> u32 {
        let max = self
            .bookmarks
            .iter()
            .filter(|b| b.folder_id == folder_id)
            .map(|b| i64::from(b.sort_order()))
            .fold(-1_i64, i64::max);
        (max + 1) as u32
    }

    fn reject_invalid_id(&self, id: &str) -> Result<(), StoreError> {
        if self.validator.is_valid_id(id) {
            Ok(())
        } else {
            Err(ValidationError::single(ValidationIssue::InvalidId(id.to_string())).into())
        }
    }

    /// Bookmarks whose URL already appeared earlier in the collection.
    pub fn find_duplicates(&self) -> Vec<Bookmark> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.bookmarks
            .iter()
            .filter(|b| !seen.insert(b.url.as_str()))
            .cloned()
            .collect()
    }

    pub fn toggle_folder_expansion(&mut self, id: &str) -> Option<bool> {
        let idx = self.folder_index(id)?;
        let folder = &mut self.folders[idx];
        folder.is_expanded = !folder.is_expanded;
        let expanded = folder.is_expanded;
        self.touch();
        Some(expanded)
    }

    /// Stable-sorts a folder's bookmarks and renumbers them 0..n-1.
    /// Returns the orders held before the sort, in collection order.
    pub fn sort_bookmarks(&mut self, folder_id: &str, kind: SortKind) -> Vec<OrderEntry> {
        let before: Vec<OrderEntry> = self
            .bookmarks
            .iter()
            .filter(|b| b.folder_id == folder_id)
            .map(|b| OrderEntry {
                id: b.id.clone(),
                order: b.order,
            })
            .collect();
        if before.is_empty() {
            return before;
        }

        let mut indices = self.sorted_sibling_indices(folder_id);
        let bookmarks = &self.bookmarks;
        indices.sort_by(|&a, &b| compare_bookmarks(&bookmarks[a], &bookmarks[b], kind));
        for (position, idx) in indices.into_iter().enumerate() {
            self.bookmarks[idx].order = Some(position as u32);
        }
        self.touch();
        before
    }

    /// Writes back orders captured by [`sort_bookmarks`](Self::sort_bookmarks).
    pub fn restore_order(&mut self, entries: &[OrderEntry]) -> usize {
        let mut restored = 0;
        for entry in entries {
            if let Some(idx) = self.bookmark_index(&entry.id) {
                self.bookmarks[idx].order = entry.order;
                restored += 1;
            }
        }
        if restored > 0 {
            self.touch();
        }
        restored
    }

    /// Re-inserts previously removed bookmarks unchanged. Ids already present
    /// are skipped; a bookmark whose folder is gone lands in root.
    pub fn restore_bookmarks(&mut self, bookmarks: &[Bookmark]) -> usize {
        let mut restored = 0;
        for bookmark in bookmarks {
            if self.bookmark_index(&bookmark.id).is_some() {
                continue;
            }
            let mut bookmark = bookmark.clone();
            if !self.folder_exists(&bookmark.folder_id) {
                bookmark.folder_id = ROOT_FOLDER_ID.to_string();
            }
            self.bookmarks.push(bookmark);
            restored += 1;
        }
        if restored > 0 {
            self.touch();
        }
        restored
    }

    /// Renumbers the child folders of `parent_id` alphabetically.
    pub fn sort_folders_by_name(&mut self, parent_id: &str) -> usize {
        let mut indices: Vec<usize> = self
            .folders
            .iter()
            .enumerate()
            .filter(|(_, f)| f.parent_id.as_deref() == Some(parent_id))
            .map(|(i, _)| i)
            .collect();
        let folders = &self.folders;
        indices.sort_by(|&a, &b| {
            folders[a]
                .name
                .to_lowercase()
                .cmp(&folders[b].name.to_lowercase())
        });
        let count = indices.len();
        for (position, idx) in indices.into_iter().enumerate() {
            self.folders[idx].order = Some(position as u32);
        }
        if count > 0 {
            self.touch();
        }
        count
    }

    /// Gives every bookmark without an order its position among its siblings.
    pub fn initialize_bookmark_order(&mut self) -> usize {
        let mut positions: HashMap<String, u32> = HashMap::new();
        let mut filled = 0;
        for bookmark in &mut self.bookmarks {
            let next = positions.entry(bookmark.folder_id.clone()).or_insert(0);
            if bookmark.order.is_none() {
                bookmark.order = Some(*next);
                filled += 1;
            }
            *next += 1;
        }
        if filled > 0 {
            self.touch();
        }
        filled
    }

    pub fn reset_bookmarks(&mut self) {
        self.bookmarks.clear();
        self.touch();
    }

    /// Removes every folder except root. Bookmarks outside root move to root.
    pub fn reset_folders(&mut self) {
        self.folders = vec![Folder::root()];
        for bookmark in &mut self.bookmarks {
            bookmark.folder_id = ROOT_FOLDER_ID.to_string();
        }
        self.touch();
    }

    pub fn reset_all(&mut self) {
        self.bookmarks.clear();
        self.folders = vec![Folder::root()];
        self.touch();
    }

    /// Replaces the whole tree with persisted contents, repairing anything
    /// that breaks the tree invariants. Every record passes the validator;
    /// rejected records are dropped and sanitized ones replace the original.
    /// Returns the number of repairs.
    pub fn replace_contents(&mut self, bookmarks: Vec<Bookmark>, folders: Vec<Folder>) -> usize {
        let mut repairs = 0;

        let mut seen_folders: HashSet<String> = HashSet::new();
        let mut kept_folders: Vec<Folder> = Vec::with_capacity(folders.len() + 1);
        for mut folder in folders {
            if !seen_folders.insert(folder.id.clone()) {
                repairs += 1;
                continue;
            }
            if folder.is_root() {
                folder.parent_id = None;
            } else if folder.parent_id.is_none() {
                folder.parent_id = Some(ROOT_FOLDER_ID.to_string());
                repairs += 1;
            }
            match self.validator.validate_folder(&folder) {
                Ok(clean) => {
                    if clean != folder {
                        repairs += 1;
                    }
                    kept_folders.push(clean);
                }
                Err(err) => {
                    tracing::warn!(folder = %folder.id, error = %err, "dropping invalid persisted folder");
                    seen_folders.remove(&folder.id);
                    repairs += 1;
                }
            }
        }
        if !seen_folders.contains(ROOT_FOLDER_ID) {
            kept_folders.insert(0, Folder::root());
            repairs += 1;
        }
        self.folders = kept_folders;

        // Reattach folders whose chain does not reach root.
        let ids: Vec<String> = self.folders.iter().map(|f| f.id.clone()).collect();
        for id in ids {
            if !self.reaches_root(&id) {
                if let Some(idx) = self.folder_index(&id) {
                    self.folders[idx].parent_id = Some(ROOT_FOLDER_ID.to_string());
                    repairs += 1;
                }
            }
        }

        let mut seen_bookmarks: HashSet<String> = HashSet::new();
        let mut kept_bookmarks = Vec::with_capacity(bookmarks.len());
        for mut bookmark in bookmarks {
            if !seen_bookmarks.insert(bookmark.id.clone()) {
                repairs += 1;
                continue;
            }
            bookmark = match self.validator.validate_bookmark(&bookmark) {
                Ok(clean) => {
                    if clean != bookmark {
                        repairs += 1;
                    }
                    clean
                }
                Err(err) => {
                    tracing::warn!(bookmark = %bookmark.id, error = %err, "dropping invalid persisted bookmark");
                    repairs += 1;
                    continue;
                }
            };
            if !self.folder_exists(&bookmark.folder_id) {
                bookmark.folder_id = ROOT_FOLDER_ID.to_string();
                repairs += 1;
            }
            kept_bookmarks.push(bookmark);
        }
        self.bookmarks = kept_bookmarks;

        if repairs > 0 {
            tracing::warn!(repairs, "persisted tree repaired on load");
        }
        self.initialize_bookmark_order();
        self.touch();
        repairs
    }

    fn reaches_root(&self, id: &str) -> bool {
        let mut current = self.folder(id);
        let mut steps = 0;
        while let Some(folder) = current {
            match folder.parent_id.as_deref() {
                None => return folder.is_root(),
                Some(pid) => current = self.folder(pid),
            }
            steps += 1;
            if steps > self.folders.len() {
                return false;
            }
        }
        false
    }

    /// Owned copy of the folder collection for work that outlives a borrow.
    pub fn folder_snapshot(&self) -> FolderSnapshot {
        FolderSnapshot::new(self.folders.clone(), self.version)
    }

    fn import_folders(
        &mut self,
        incoming: Vec<Folder>,
        summary: &mut ImportSummary,
    ) -> HashMap<String, String> {
        // imported id -> id in this store
        let mut remap: HashMap<String, String> = HashMap::new();
        remap.insert(ROOT_FOLDER_ID.to_string(), ROOT_FOLDER_ID.to_string());

        let mut keys: HashMap<(String, String), String> = self
            .folders
            .iter()
            .filter(|f| !f.is_root())
            .map(|f| {
                let parent = f.parent_id.clone().unwrap_or_default();
                ((f.name.clone(), parent), f.id.clone())
            })
            .collect();

        let mut pending: Vec<Folder> = incoming.into_iter().filter(|f| !f.is_root()).collect();
        let batch_ids: HashSet<String> = pending.iter().map(|f| f.id.clone()).collect();

        let mut force_root = false;
        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let before = pending.len();

            for folder in pending {
                let raw_parent = folder
                    .parent_id
                    .clone()
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| ROOT_FOLDER_ID.to_string());
                let parent = if let Some(mapped) = remap.get(&raw_parent) {
                    mapped.clone()
                } else if batch_ids.contains(&raw_parent) && !force_root {
                    deferred.push(folder);
                    continue;
                } else if self.folder_exists(&raw_parent) {
                    raw_parent
                } else {
                    tracing::debug!(folder = %folder.id, parent = %raw_parent, "imported folder parent unresolved; attaching to root");
                    ROOT_FOLDER_ID.to_string()
                };

                let candidate = Folder {
                    parent_id: Some(parent.clone()),
                    ..folder.clone()
                };
                let candidate = if self.validator.is_valid_id(&candidate.id)
                    && !self.folder_exists(&candidate.id)
                {
                    candidate
                } else {
                    Folder {
                        id: Self::generate_id(),
                        ..candidate
                    }
                };

                let mut clean = match self.validator.validate_folder(&candidate) {
                    Ok(clean) => clean,
                    Err(err) => {
                        tracing::warn!(folder = %folder.id, error = %err, "skipping invalid imported folder");
                        remap.insert(folder.id.clone(), parent);
                        summary.folders_skipped += 1;
                        continue;
                    }
                };

                let key = (clean.name.clone(), parent.clone());
                if let Some(existing) = keys.get(&key) {
                    remap.insert(folder.id.clone(), existing.clone());
                    summary.folders_merged += 1;
                    continue;
                }

                if clean.created_at <= 0 {
                    clean.created_at = Self::now();
                }
                keys.insert(key, clean.id.clone());
                remap.insert(folder.id.clone(), clean.id.clone());
                self.folders.push(clean);
                summary.folders_added += 1;
            }

            if deferred.len() == before {
                // Remaining folders only reference each other.
                force_root = true;
            }
            pending = deferred;
        }
        remap
    }
}

fn compare_bookmarks(a: &Bookmark, b: &Bookmark, kind: SortKind) -> Ordering {
    match kind {
        SortKind::ByName => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKind::ByUrl => a.url.to_lowercase().cmp(&b.url.to_lowercase()),
        SortKind::ByDateAscending => a.created_at.cmp(&b.created_at),
        SortKind::ByDateDescending => b.created_at.cmp(&a.created_at),
    }
}

impl TreeStoreTrait for TreeStore {
    /// Adds a bookmark at the end of its folder.
    fn add_bookmark(&mut self, data: NewBookmark) -> Result<Bookmark, StoreError> {
        let folder_id = data
            .folder_id
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| ROOT_FOLDER_ID.to_string());
        let draft = Bookmark {
            id: Self::generate_id(),
            name: data.name,
            url: data.url,
            description: data.description,
            folder_id,
            order: None,
            is_expanded: None,
            created_at: Self::now(),
        };

        let mut bookmark = self.validator.validate_bookmark(&draft)?;
        if !self.folder_exists(&bookmark.folder_id) {
            return Err(StoreError::FolderNotFound(bookmark.folder_id));
        }
        bookmark.order = Some(self.next_order(&bookmark.folder_id));

        self.bookmarks.push(bookmark.clone());
        self.touch();
        Ok(bookmark)
    }

    fn add_folder(&mut self, data: NewFolder) -> Result<Folder, StoreError> {
        let draft = Folder {
            id: Self::generate_id(),
            name: data.name,
            parent_id: data.parent_id.filter(|p| !p.is_empty()),
            is_expanded: data.is_expanded,
            order: None,
            created_at: Self::now(),
        };

        let folder = self.validator.validate_folder(&draft)?;
        let parent = folder.parent_id.as_deref().unwrap_or(ROOT_FOLDER_ID);
        if !self.folder_exists(parent) {
            return Err(StoreError::FolderNotFound(parent.to_string()));
        }

        self.folders.push(folder.clone());
        self.touch();
        Ok(folder)
    }

    /// Validates the merged record, then applies only the fields present in
    /// `updates`.
    fn update_bookmark(&mut self, id: &str, updates: BookmarkUpdate) -> Result<Bookmark, StoreError> {
        self.reject_invalid_id(id)?;
        let idx = self
            .bookmark_index(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let current = &self.bookmarks[idx];
        let merged = Bookmark {
            name: updates.name.clone().unwrap_or_else(|| current.name.clone()),
            url: updates.url.clone().unwrap_or_else(|| current.url.clone()),
            description: updates
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            folder_id: updates
                .folder_id
                .clone()
                .unwrap_or_else(|| current.folder_id.clone()),
            ..current.clone()
        };
        let clean = self.validator.validate_bookmark(&merged)?;
        if updates.folder_id.is_some() && !self.folder_exists(&clean.folder_id) {
            return Err(StoreError::FolderNotFound(clean.folder_id));
        }

        let target = &mut self.bookmarks[idx];
        if updates.name.is_some() {
            target.name = clean.name;
        }
        if updates.url.is_some() {
            target.url = clean.url;
        }
        if updates.description.is_some() {
            target.description = clean.description;
        }
        if updates.folder_id.is_some() {
            target.folder_id = clean.folder_id;
        }
        if let Some(order) = updates.order {
            target.order = Some(order);
        }
        if let Some(expanded) = updates.is_expanded {
            target.is_expanded = Some(expanded);
        }
        let updated = target.clone();
        self.touch();
        Ok(updated)
    }

    fn update_folder(&mut self, id: &str, updates: FolderUpdate) -> Result<Folder, StoreError> {
        self.reject_invalid_id(id)?;
        let idx = self
            .folder_index(id)
            .ok_or_else(|| StoreError::FolderNotFound(id.to_string()))?;

        let name = match updates.name.as_ref() {
            Some(name) => {
                let merged = Folder {
                    name: name.clone(),
                    ..self.folders[idx].clone()
                };
                Some(self.validator.validate_folder(&merged)?.name)
            }
            None => None,
        };

        if let Some(pid) = updates.parent_id.as_deref() {
            if self.folders[idx].is_root() {
                return Err(StoreError::RootImmutable);
            }
            self.reject_invalid_id(pid)?;
            if !self.folder_exists(pid) {
                return Err(StoreError::FolderNotFound(pid.to_string()));
            }
            if self.chain_contains(pid, id) {
                return Err(StoreError::CycleDetected(id.to_string()));
            }
        }

        let target = &mut self.folders[idx];
        if let Some(name) = name {
            target.name = name;
        }
        if let Some(pid) = updates.parent_id {
            target.parent_id = Some(pid);
        }
        if let Some(expanded) = updates.is_expanded {
            target.is_expanded = expanded;
        }
        if let Some(order) = updates.order {
            target.order = Some(order);
        }
        let updated = target.clone();
        self.touch();
        Ok(updated)
    }

    fn delete_bookmark(&mut self, id: &str) -> bool {
        if !self.validator.is_valid_id(id) {
            return false;
        }
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        let removed = self.bookmarks.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Removes every listed bookmark and returns the removed records.
    fn delete_bookmarks_bulk(&mut self, ids: &[String]) -> Vec<Bookmark> {
        let wanted: HashSet<&str> = ids
            .iter()
            .map(|s| s.as_str())
            .filter(|id| self.validator.is_valid_id(id))
            .collect();
        if wanted.is_empty() {
            return Vec::new();
        }

        let (removed, kept): (Vec<Bookmark>, Vec<Bookmark>) = std::mem::take(&mut self.bookmarks)
            .into_iter()
            .partition(|b| wanted.contains(b.id.as_str()));
        self.bookmarks = kept;
        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    /// Deletes a folder, every folder below it, and every bookmark inside
    /// any of them.
    fn delete_folder(&mut self, id: &str) -> Result<CascadeSummary, StoreError> {
        if id == ROOT_FOLDER_ID {
            return Err(StoreError::RootImmutable);
        }
        if !self.folder_exists(id) {
            return Err(StoreError::FolderNotFound(id.to_string()));
        }

        let mut doomed: HashSet<String> = self.descendant_folder_ids(id).into_iter().collect();
        doomed.insert(id.to_string());

        let mut summary = CascadeSummary::default();
        self.bookmarks.retain(|b| {
            let keep = !doomed.contains(&b.folder_id);
            if !keep {
                summary.bookmark_ids.push(b.id.clone());
            }
            keep
        });
        self.folders.retain(|f| {
            let keep = !doomed.contains(&f.id);
            if !keep {
                summary.folder_ids.push(f.id.clone());
            }
            keep
        });

        self.touch();
        Ok(summary)
    }

    /// Folder moves that would place a folder under itself are skipped
    /// individually; the rest of the batch still applies.
    fn move_items(
        &mut self,
        item_ids: &[String],
        target_folder_id: &str,
        item_type: ItemType,
    ) -> Result<usize, StoreError> {
        if !self.folder_exists(target_folder_id) {
            return Err(StoreError::FolderNotFound(target_folder_id.to_string()));
        }

        let mut moved = 0;
        match item_type {
            ItemType::Bookmark => {
                for id in item_ids {
                    if let Some(idx) = self.bookmark_index(id) {
                        self.bookmarks[idx].folder_id = target_folder_id.to_string();
                        moved += 1;
                    }
                }
            }
            ItemType::Folder => {
                for id in item_ids {
                    if id == ROOT_FOLDER_ID {
                        tracing::warn!("refusing to move the root folder");
                        continue;
                    }
                    if self.chain_contains(target_folder_id, id) {
                        tracing::warn!(folder = %id, target = target_folder_id, "skipping move that would create a cycle");
                        continue;
                    }
                    if let Some(idx) = self.folder_index(id) {
                        self.folders[idx].parent_id = Some(target_folder_id.to_string());
                        moved += 1;
                    }
                }
            }
        }

        if moved > 0 {
            self.touch();
        }
        Ok(moved)
    }

    /// Moves a bookmark to `target_index` among its siblings and renumbers
    /// every sibling to its new position.
    fn reorder_bookmark(&mut self, folder_id: &str, bookmark_id: &str, target_index: usize) -> bool {
        let siblings: Vec<usize> = self
            .bookmarks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.folder_id == folder_id)
            .map(|(i, _)| i)
            .collect();

        let mut backfilled = false;
        for (position, &idx) in siblings.iter().enumerate() {
            if self.bookmarks[idx].order.is_none() {
                self.bookmarks[idx].order = Some(position as u32);
                backfilled = true;
            }
        }

        let mut ordered = self.sorted_sibling_indices(folder_id);
        let current = match ordered.iter().position(|&i| self.bookmarks[i].id == bookmark_id) {
            Some(current) => current,
            None => {
                if backfilled {
                    self.touch();
                }
                return false;
            }
        };
        let target = target_index.min(ordered.len() - 1);
        if current == target {
            if backfilled {
                self.touch();
            }
            return false;
        }

        let moving = ordered.remove(current);
        ordered.insert(target, moving);
        for (position, idx) in ordered.into_iter().enumerate() {
            self.bookmarks[idx].order = Some(position as u32);
        }
        self.touch();
        true
    }

    /// Merges imported data. Bookmarks whose URL already exists are dropped;
    /// folders matching an existing `(name, parent)` pair are merged into it.
    fn import_bookmarks(&mut self, batch: ImportBatch) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let remap = self.import_folders(batch.folders, &mut summary);

        let existing_urls: HashSet<String> = self
            .bookmarks
            .iter()
            .map(|b| sanitize_url(&b.url).unwrap_or_else(|| b.url.clone()))
            .collect();
        let mut taken_ids: HashSet<String> = self.bookmarks.iter().map(|b| b.id.clone()).collect();

        for incoming in batch.bookmarks {
            let folder_id = if let Some(mapped) = remap.get(&incoming.folder_id) {
                mapped.clone()
            } else if self.folder_exists(&incoming.folder_id) {
                incoming.folder_id.clone()
            } else {
                ROOT_FOLDER_ID.to_string()
            };
            let id = if self.validator.is_valid_id(&incoming.id) && !taken_ids.contains(&incoming.id) {
                incoming.id.clone()
            } else {
                Self::generate_id()
            };
            let candidate = Bookmark {
                id,
                folder_id,
                ..incoming
            };

            let mut clean = match self.validator.validate_bookmark(&candidate) {
                Ok(clean) => clean,
                Err(err) => {
                    tracing::warn!(bookmark = %candidate.id, error = %err, "skipping invalid imported bookmark");
                    summary.bookmarks_skipped += 1;
                    continue;
                }
            };
            if existing_urls.contains(&clean.url) {
                summary.bookmarks_skipped += 1;
                continue;
            }

            if clean.order.is_none() {
                clean.order = Some(self.next_order(&clean.folder_id));
            }
            if clean.created_at <= 0 {
                clean.created_at = Self::now();
            }
            taken_ids.insert(clean.id.clone());
            self.bookmarks.push(clean);
            summary.bookmarks_added += 1;
        }

        if summary.bookmarks_added > 0 || summary.folders_added > 0 {
            self.touch();
        }
        tracing::info!(
            bookmarks_added = summary.bookmarks_added,
            bookmarks_skipped = summary.bookmarks_skipped,
            folders_added = summary.folders_added,
            folders_merged = summary.folders_merged,
            "import merged"
        );
        summary
    }
}

impl FolderSource for TreeStore {
    fn folder_path(&self, folder_id: &str) -> Vec<Folder> {
        TreeStore::folder_path(self, folder_id)
    }

    fn folders_by_parent(&self, parent_id: &str) -> Vec<Folder> {
        TreeStore::folders_by_parent(self, parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    fn stamp(&self) -> u64 {
        self.version
    }
}

/// Owned, indexed copy of the folder collection at one version.
#[derive(Debug, Clone)]
pub struct FolderSnapshot {
    folders: Vec<Folder>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    version: u64,
}

impl FolderSnapshot {
    pub fn new(folders: Vec<Folder>, version: u64) -> Self {
        let mut by_id = HashMap::with_capacity(folders.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, folder) in folders.iter().enumerate() {
            by_id.insert(folder.id.clone(), idx);
            if let Some(pid) = folder.parent_id.as_ref() {
                children.entry(pid.clone()).or_default().push(idx);
            }
        }
        Self {
            folders,
            by_id,
            children,
            version,
        }
    }

    fn get(&self, id: &str) -> Option<&Folder> {
        self.by_id.get(id).map(|&idx| &self.folders[idx])
    }
}

impl FolderSource for FolderSnapshot {
    fn folder_path(&self, folder_id: &str) -> Vec<Folder> {
        walk_folder_path(folder_id, |id| self.get(id), self.folders.len())
    }

    fn folders_by_parent(&self, parent_id: &str) -> Vec<Folder> {
        self.children
            .get(parent_id)
            .map(|idxs| idxs.iter().map(|&i| self.folders[i].clone()).collect())
            .unwrap_or_default()
    }

    fn stamp(&self) -> u64 {
        self.version
    }
}
