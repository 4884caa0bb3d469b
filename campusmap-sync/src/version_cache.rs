//! Per-map version cache: the version whose snapshot was last written.
//!
//! Persists one [`LocalVersionCacheEntry`] per map at
//! `version_cache_{mapId}.json` in the cache store.

use campusmap_core::types::version_cache_file;
use campusmap_core::{LocalVersionCacheEntry, MapId};

use crate::cache_store::{load_json, save_json, CacheStore, WriteOutcome};
use crate::error::SyncError;

/// Load the cache entry for `map_id`.
///
/// Missing and malformed files both return `None`; an entry stored under a
/// different map id is ignored as well.
pub async fn load(cache: &dyn CacheStore, map_id: &MapId) -> Option<LocalVersionCacheEntry> {
    let entry: LocalVersionCacheEntry = load_json(cache, &version_cache_file(map_id)).await?;
    if &entry.map_id != map_id {
        tracing::warn!(
            map_id = %map_id,
            stored = %entry.map_id,
            "version cache entry belongs to another map; ignoring",
        );
        return None;
    }
    Some(entry)
}

/// Persist the cache entry for its map.
pub async fn save(
    cache: &dyn CacheStore,
    entry: &LocalVersionCacheEntry,
) -> Result<WriteOutcome, SyncError> {
    save_json(cache, &version_cache_file(&entry.map_id), entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::cache_store::FsCacheStore;

    fn entry(map: &str, version: &str) -> LocalVersionCacheEntry {
        LocalVersionCacheEntry {
            map_id: MapId::from(map),
            cached_version: version.to_string(),
            map_name: "Main".to_string(),
            cache_timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_entry_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsCacheStore::new(tmp.path());
        assert!(load(&store, &MapId::from("main")).await.is_none());
    }

    #[tokio::test]
    async fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let store = FsCacheStore::new(tmp.path());
        let saved = entry("main", "v3");
        save(&store, &saved).await.unwrap();
        assert!(tmp.path().join("version_cache_main.json").exists());
        assert_eq!(load(&store, &MapId::from("main")).await, Some(saved));
    }

    #[tokio::test]
    async fn malformed_entry_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsCacheStore::new(tmp.path());
        std::fs::write(tmp.path().join("version_cache_main.json"), "[]").unwrap();
        assert!(load(&store, &MapId::from("main")).await.is_none());
    }

    #[tokio::test]
    async fn entry_for_other_map_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let store = FsCacheStore::new(tmp.path());
        let json = serde_json::to_string(&entry("other", "v1")).unwrap();
        std::fs::write(tmp.path().join("version_cache_main.json"), json).unwrap();
        assert!(load(&store, &MapId::from("main")).await.is_none());
    }
}
