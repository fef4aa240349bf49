//! Unit tests for the named bounded caches.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use markstore::services::cache_manager::{BoundedCache, CacheManager};

// === BoundedCache ===

#[test]
fn test_evicts_oldest_inserted_when_full() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(2, None);
    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.keys(), vec!["b", "c"]);
}

#[test]
fn test_overwrite_does_not_evict_or_reorder() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(2, None);
    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("a", 10);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some(10));
    assert_eq!(cache.keys(), vec!["a", "b"]);

    cache.set("c", 3);
    assert_eq!(cache.keys(), vec!["b", "c"]);
}

#[test]
fn test_zero_capacity_still_holds_one() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(0, None);
    assert_eq!(cache.max_size(), 1);
    cache.set("a", 1);
    cache.set("b", 2);
    assert_eq!(cache.keys(), vec!["b"]);
}

#[test]
fn test_ttl_expiry_on_read_and_purge() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(10, Some(Duration::from_millis(20)));
    cache.set("a", 1);
    cache.set("b", 2);
    assert_eq!(cache.get("a"), Some(1));
    sleep(Duration::from_millis(40));
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.purge_expired(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_purge_without_ttl_is_noop() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(10, None);
    cache.set("a", 1);
    assert_eq!(cache.purge_expired(), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_stamp_mismatch_evicts() {
    let mut cache: BoundedCache<&str> = BoundedCache::new(10, None);
    cache.set_stamped("k", "v1", 1);
    assert_eq!(cache.get_fresh("k", 1), Some("v1"));
    assert_eq!(cache.get_fresh("k", 2), None);
    assert!(cache.is_empty());

    cache.set("plain", "v");
    assert_eq!(cache.get_fresh("plain", 0), None);
}

#[test]
fn test_remove_and_clear() {
    let mut cache: BoundedCache<u32> = BoundedCache::new(10, None);
    cache.set("a", 1);
    assert!(cache.remove("a"));
    assert!(!cache.remove("a"));
    cache.set("b", 2);
    cache.clear();
    assert!(cache.is_empty());
}

// === CacheManager ===

#[test]
fn test_manager_typed_round_trip() {
    let mut manager = CacheManager::new();
    manager.create_cache("paths", 10, None);
    assert!(manager.set("paths", "f1", Arc::new(vec!["root".to_string()])));
    let value: Arc<Vec<String>> = manager.get("paths", "f1").unwrap();
    assert_eq!(*value, vec!["root".to_string()]);
}

#[test]
fn test_manager_wrong_type_reads_as_none() {
    let mut manager = CacheManager::new();
    manager.create_cache("c", 10, None);
    manager.set("c", "k", Arc::new(5_u32));
    assert!(manager.get::<String>("c", "k").is_none());
    assert!(manager.get::<u32>("c", "k").is_some());
}

#[test]
fn test_manager_missing_cache() {
    let mut manager = CacheManager::new();
    assert!(!manager.has_cache("nope"));
    assert!(!manager.set("nope", "k", Arc::new(1_u8)));
    assert!(manager.get::<u8>("nope", "k").is_none());
    assert!(!manager.delete("nope", "k"));
    assert!(!manager.clear("nope"));
    assert_eq!(manager.size("nope"), 0);
    assert!(manager.stats("nope").is_none());
}

#[test]
fn test_create_existing_cache_keeps_contents() {
    let mut manager = CacheManager::new();
    manager.create_cache("c", 10, None);
    manager.set("c", "k", Arc::new(1_u8));
    manager.create_cache("c", 1, None);
    assert_eq!(manager.size("c"), 1);
    assert_eq!(manager.stats("c").unwrap().max_size, 10);
}

#[test]
fn test_stats_sorted_by_name() {
    let mut manager = CacheManager::new();
    manager.create_cache("zeta", 5, None);
    manager.create_cache("alpha", 3, None);
    manager.set("alpha", "k1", Arc::new(1_u8));
    let stats = manager.all_stats();
    let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert_eq!(stats[0].size, 1);
    assert_eq!(stats[0].keys, vec!["k1"]);
}

#[test]
fn test_stamped_manager_lookup() {
    let mut manager = CacheManager::new();
    manager.create_cache("c", 10, None);
    manager.set_stamped("c", "k", Arc::new(1_u32), 7);
    assert!(manager.get_fresh::<u32>("c", "k", 7).is_some());
    assert!(manager.get_fresh::<u32>("c", "k", 8).is_none());
    assert_eq!(manager.size("c"), 0);
}

#[test]
fn test_cleanup_clear_all_destroy() {
    let mut manager = CacheManager::new();
    manager.create_cache("short", 10, Some(Duration::from_millis(10)));
    manager.create_cache("long", 10, None);
    manager.set("short", "a", Arc::new(1_u8));
    manager.set("long", "b", Arc::new(2_u8));
    sleep(Duration::from_millis(30));
    assert_eq!(manager.cleanup(), 1);
    assert_eq!(manager.size("long"), 1);

    manager.clear_all();
    assert!(manager.has_cache("long"));
    assert_eq!(manager.size("long"), 0);

    manager.destroy();
    assert!(!manager.has_cache("long"));
}
