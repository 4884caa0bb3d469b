//! Read-only view of the local cache.
//!
//! Classification per cached map:
//! 1. `NeverSynced` (no version cache entry)
//! 2. `Incomplete` (entry present but a versioned collection file is missing)
//! 3. `Cached`

use chrono::{DateTime, Utc};
use serde::Serialize;

use campusmap_core::types::STATIC_CACHE_FILE;
use campusmap_core::{LocalStaticDataCache, MapId, StaticCollection, VersionedCollection};

use crate::cache_store::{load_json, CacheStore};
use crate::catalog::load_cached_catalog;
use crate::error::SyncError;
use crate::version_cache;

/// Cache state of one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MapCacheState {
    NeverSynced,
    Incomplete { missing: Vec<VersionedCollection> },
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapCacheStatus {
    pub map_id: MapId,
    pub map_name: String,
    pub cached_version: Option<String>,
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: MapCacheState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticCollectionStatus {
    pub collection: StaticCollection,
    pub synced: bool,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub maps: Vec<MapCacheStatus>,
    pub static_collections: Vec<StaticCollectionStatus>,
    pub static_cached_at: Option<DateTime<Utc>>,
}

/// Inspect the cache: every cataloged map plus the static collections.
pub async fn collect(cache: &dyn CacheStore) -> Result<CacheStatus, SyncError> {
    let mut maps = Vec::new();
    for map in load_cached_catalog(cache).await {
        let entry = version_cache::load(cache, &map.map_id).await;
        let state = match &entry {
            None => MapCacheState::NeverSynced,
            Some(_) => {
                let mut missing = Vec::new();
                for collection in VersionedCollection::all() {
                    if cache.read(&collection.file_name(&map.map_id)).await?.is_none() {
                        missing.push(*collection);
                    }
                }
                if missing.is_empty() {
                    MapCacheState::Cached
                } else {
                    MapCacheState::Incomplete { missing }
                }
            }
        };
        maps.push(MapCacheStatus {
            map_name: map.map_name,
            cached_version: entry.as_ref().map(|e| e.cached_version.clone()),
            cached_at: entry.map(|e| e.cache_timestamp),
            map_id: map.map_id,
            state,
        });
    }

    let local: Option<LocalStaticDataCache> = load_json(cache, STATIC_CACHE_FILE).await;
    let mut static_collections = Vec::new();
    for collection in StaticCollection::all() {
        static_collections.push(StaticCollectionStatus {
            collection: *collection,
            synced: local.as_ref().is_some_and(|l| l.synced(*collection)),
            present: cache.read(&collection.file_name()).await?.is_some(),
        });
    }

    Ok(CacheStatus {
        maps,
        static_collections,
        static_cached_at: local.map(|l| l.cache_timestamp),
    })
}

/// Format age from a chrono timestamp.
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    use campusmap_core::{LocalVersionCacheEntry, MapDescriptor};

    use crate::cache_store::{save_json, FsCacheStore};

    fn descriptor(id: &str) -> MapDescriptor {
        MapDescriptor {
            map_id: MapId::from(id),
            map_name: id.to_uppercase(),
            center_lat: 0.0,
            center_lng: 0.0,
            campus_included: vec![],
        }
    }

    #[tokio::test]
    async fn classifies_maps_by_cache_contents() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        save_json(&cache, "maps.json", &vec![descriptor("a"), descriptor("b"), descriptor("c")])
            .await
            .unwrap();

        for id in ["b", "c"] {
            let entry = LocalVersionCacheEntry {
                map_id: MapId::from(id),
                cached_version: "v1".to_string(),
                map_name: String::new(),
                cache_timestamp: Utc::now(),
            };
            version_cache::save(&cache, &entry).await.unwrap();
            cache.write(&format!("nodes_{id}.json"), "[]").await.unwrap();
        }
        cache.write("edges_c.json", "[]").await.unwrap();

        let status = collect(&cache).await.unwrap();
        let states: Vec<_> = status.maps.iter().map(|m| m.state.clone()).collect();
        assert_eq!(
            states,
            vec![
                MapCacheState::NeverSynced,
                MapCacheState::Incomplete {
                    missing: vec![VersionedCollection::Edges]
                },
                MapCacheState::Cached,
            ]
        );
        assert_eq!(status.maps[2].cached_version.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn empty_cache_reports_nothing_synced() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let status = collect(&cache).await.unwrap();
        assert!(status.maps.is_empty());
        assert!(status.static_collections.iter().all(|s| !s.synced && !s.present));
        assert!(status.static_cached_at.is_none());
    }

    #[test]
    fn datetime_age_is_compact() {
        assert_eq!(format_datetime_age(Utc::now()), "0s");
        assert_eq!(format_datetime_age(Utc::now() - Duration::seconds(65)), "1m");
        assert_eq!(format_datetime_age(Utc::now() - Duration::hours(3)), "3h");
        assert_eq!(format_datetime_age(Utc::now() - Duration::days(2)), "2d");
    }
}
