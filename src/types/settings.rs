use serde::{Deserialize, Serialize};

/// Top-level store settings container. Sections missing from a settings
/// file fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StoreSettings {
    pub limits: TextLimits,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub link_check: LinkCheckSettings,
}

/// Maximum lengths accepted by validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLimits {
    pub folder_name: usize,
    pub bookmark_name: usize,
    pub bookmark_description: usize,
    pub id: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            folder_name: 50,
            bookmark_name: 500,
            bookmark_description: 500,
            id: 50,
        }
    }
}

/// Signal used to decide whether a derived view must be recomputed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StalenessPolicy {
    /// Valid while the number of bookmarks plus folders is unchanged.
    /// Same-count edits such as a rename leave the view stale.
    ItemCount,
    /// Valid while the tree's mutation counter is unchanged.
    #[default]
    Version,
}

/// Cache capacities and expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    pub max_search_cache_size: usize,
    pub max_path_cache_size: usize,
    pub max_bookmark_cache_size: usize,
    /// Time-to-live for derived view entries; `None` never expires.
    pub ttl_secs: Option<u64>,
    pub staleness: StalenessPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_search_cache_size: 1000,
            max_path_cache_size: 10_000,
            max_bookmark_cache_size: 5000,
            ttl_secs: None,
            staleness: StalenessPolicy::default(),
        }
    }
}

/// Search behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub max_path_depth: usize,
    pub max_path_index: usize,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_path_depth: 20,
            max_path_index: 10_000,
            max_results: 50,
        }
    }
}

/// Bulk URL liveness checking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkCheckSettings {
    pub batch_size: usize,
    pub timeout_ms: u64,
    pub batch_pause_ms: u64,
}

impl Default for LinkCheckSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            timeout_ms: 3000,
            batch_pause_ms: 100,
        }
    }
}
