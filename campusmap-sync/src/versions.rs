//! Per-map version reconciliation.
//!
//! For every cataloged map the remote `MapVersions/{mapId}` record is
//! compared with the local version cache entry. Maps whose versions differ
//! (or that were never cached) have their versioned collections fetched from
//! `MapVersions/{mapId}/versions/{version}` and written to
//! `nodes_{mapId}.json` / `edges_{mapId}.json`.
//!
//! Both stages fan out one future per map and join on all of them; the
//! number of in-flight lookups equals the catalog size.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use campusmap_core::{
    DocValue, LocalVersionCacheEntry, MapDescriptor, MapId, MapVersionRecord, VersionedCollection,
};

use crate::cache_store::CacheStore;
use crate::error::SyncError;
use crate::remote::{DocumentPath, RemoteStore};
use crate::version_cache;

/// How a version sync treats a version document that lacks a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSyncPolicy {
    /// Record the map as synced to the remote version even when one or both
    /// versioned collections were missing from the version document.
    pub record_partial: bool,
}

impl Default for VersionSyncPolicy {
    fn default() -> Self {
        Self {
            record_partial: true,
        }
    }
}

/// Result of [`check_map_version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    pub map_id: MapId,
    pub needs_update: bool,
    /// `None` when the remote has no version record for the map.
    pub remote: Option<MapVersionRecord>,
    pub cached_version: Option<String>,
}

/// Result of [`sync_map_version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MapSyncOutcome {
    /// The version cache entry now records `version`.
    Synced {
        version: String,
        written: Vec<VersionedCollection>,
        skipped: Vec<VersionedCollection>,
    },
    /// Collections were missing and the policy forbids recording the version.
    Incomplete {
        version: String,
        written: Vec<VersionedCollection>,
        skipped: Vec<VersionedCollection>,
    },
    /// The version subdocument does not exist; nothing was written.
    VersionMissing { version: String },
    /// A fetch or write failed; the version cache entry was left untouched.
    Failed { version: String, error: String },
}

impl MapSyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, MapSyncOutcome::Synced { .. })
    }
}

/// Per-map outcome of a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapSyncResult {
    pub map_id: MapId,
    #[serde(flatten)]
    pub outcome: MapSyncOutcome,
}

/// Result of [`check_all_map_versions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionReport {
    /// Number of version checks that completed (always the catalog size).
    pub checked: usize,
    pub up_to_date: Vec<MapId>,
    /// Maps without a remote version record.
    pub unknown: Vec<MapId>,
    pub synced: Vec<MapSyncResult>,
}

/// Compare the remote version record of `map_id` with the local cache.
///
/// A missing record (or a failed lookup) is not an error: the map is
/// reported as not needing an update and skipped.
pub async fn check_map_version(
    remote: &dyn RemoteStore,
    cache: &dyn CacheStore,
    map_id: &MapId,
) -> VersionCheck {
    let doc = match remote.get_document(&DocumentPath::map_version(map_id)).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::warn!(map_id = %map_id, "no remote version record; skipping map");
            return not_needed(map_id);
        }
        Err(err) => {
            tracing::warn!(map_id = %map_id, error = %err, "version lookup failed; skipping map");
            return not_needed(map_id);
        }
    };

    let record = MapVersionRecord::from_fields(map_id.clone(), &doc.fields, Utc::now());
    let cached = version_cache::load(cache, map_id).await;
    let needs_update = match &cached {
        None => true,
        Some(entry) => entry.cached_version != record.current_version,
    };

    tracing::debug!(
        map_id = %map_id,
        remote = %record.current_version,
        cached = cached.as_ref().map(|e| e.cached_version.as_str()).unwrap_or("-"),
        needs_update,
        "version checked",
    );

    VersionCheck {
        map_id: map_id.clone(),
        needs_update,
        cached_version: cached.map(|e| e.cached_version),
        remote: Some(record),
    }
}

fn not_needed(map_id: &MapId) -> VersionCheck {
    VersionCheck {
        map_id: map_id.clone(),
        needs_update: false,
        remote: None,
        cached_version: None,
    }
}

/// Fetch the versioned collections for `record.current_version` and write
/// them locally, then record the version in the map's cache entry.
///
/// A collection missing from the version document is skipped but still
/// counts as processed; whether the version is then recorded is decided by
/// `policy`. A failed write never records the version.
pub async fn sync_map_version(
    remote: &dyn RemoteStore,
    cache: &dyn CacheStore,
    record: &MapVersionRecord,
    policy: VersionSyncPolicy,
) -> MapSyncOutcome {
    let map_id = &record.map_id;
    let version = record.current_version.clone();

    let path = DocumentPath::map_version_data(map_id, &version);
    let doc = match remote.get_document(&path).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::warn!(
                map_id = %map_id,
                version = %version,
                "version document missing; nothing synced"
            );
            return MapSyncOutcome::VersionMissing { version };
        }
        Err(err) => {
            tracing::error!(
                map_id = %map_id,
                version = %version,
                error = %err,
                "version document fetch failed"
            );
            return MapSyncOutcome::Failed {
                version,
                error: err.to_string(),
            };
        }
    };

    let writes = VersionedCollection::all().iter().map(|collection| {
        let payload = doc.fields.get(collection.key());
        async move { (*collection, write_collection(cache, map_id, *collection, payload).await) }
    });

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    let mut failure = None;
    for (collection, result) in join_all(writes).await {
        match result {
            Ok(true) => written.push(collection),
            Ok(false) => {
                tracing::warn!(
                    map_id = %map_id,
                    collection = %collection,
                    "collection missing from version document; skipped"
                );
                skipped.push(collection);
            }
            Err(err) => {
                tracing::error!(
                    map_id = %map_id,
                    collection = %collection,
                    error = %err,
                    "writing collection failed"
                );
                if failure.is_none() {
                    failure = Some(format!("{collection}: {err}"));
                }
            }
        }
    }

    if let Some(error) = failure {
        return MapSyncOutcome::Failed { version, error };
    }
    if !skipped.is_empty() && !policy.record_partial {
        return MapSyncOutcome::Incomplete {
            version,
            written,
            skipped,
        };
    }

    let entry = LocalVersionCacheEntry::from_record(record, Utc::now());
    if let Err(err) = version_cache::save(cache, &entry).await {
        tracing::error!(map_id = %map_id, error = %err, "saving version cache entry failed");
        return MapSyncOutcome::Failed {
            version,
            error: err.to_string(),
        };
    }

    tracing::info!(
        map_id = %map_id,
        version = %version,
        written = written.len(),
        skipped = skipped.len(),
        "map synced",
    );
    MapSyncOutcome::Synced {
        version,
        written,
        skipped,
    }
}

/// Write one versioned collection. `Ok(false)` when the payload is absent.
async fn write_collection(
    cache: &dyn CacheStore,
    map_id: &MapId,
    collection: VersionedCollection,
    payload: Option<&DocValue>,
) -> Result<bool, SyncError> {
    let Some(payload) = payload.filter(|v| !v.is_null()) else {
        return Ok(false);
    };
    let documents = match payload.to_json() {
        Value::Array(items) => Value::Array(items),
        other => Value::Array(vec![other]),
    };
    let json = serde_json::to_string_pretty(&documents)?;
    cache.write(&collection.file_name(map_id), &json).await?;
    Ok(true)
}

/// Check every cataloged map, then sync those that need it.
///
/// Completes after exactly `catalog.len()` checks and one sync per map
/// needing an update. An empty catalog completes immediately.
pub async fn check_all_map_versions(
    remote: &dyn RemoteStore,
    cache: &dyn CacheStore,
    catalog: &[MapDescriptor],
    policy: VersionSyncPolicy,
) -> VersionReport {
    if catalog.is_empty() {
        return VersionReport::default();
    }

    let checks = join_all(
        catalog
            .iter()
            .map(|map| check_map_version(remote, cache, &map.map_id)),
    )
    .await;

    let mut report = VersionReport {
        checked: checks.len(),
        ..VersionReport::default()
    };
    let mut pending = Vec::new();
    for check in checks {
        match check.remote {
            None => report.unknown.push(check.map_id),
            Some(record) if check.needs_update => pending.push(record),
            Some(_) => report.up_to_date.push(check.map_id),
        }
    }

    tracing::info!(
        checked = report.checked,
        outdated = pending.len(),
        "map versions checked"
    );

    report.synced = join_all(pending.iter().map(|record| async move {
        MapSyncResult {
            map_id: record.map_id.clone(),
            outcome: sync_map_version(remote, cache, record, policy).await,
        }
    }))
    .await;

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::cache_store::FsCacheStore;
    use crate::remote::MemoryRemoteStore;

    const LEGACY: VersionSyncPolicy = VersionSyncPolicy {
        record_partial: true,
    };

    fn remote(version_doc: Value) -> MemoryRemoteStore {
        MemoryRemoteStore::from_snapshot(json!({
            "MapVersions": {
                "main": {
                    "current_version": "v2",
                    "version": "v0",
                    "__collections__": {"versions": {"v2": version_doc}}
                }
            }
        }))
        .expect("snapshot")
    }

    fn record(version: &str) -> MapVersionRecord {
        MapVersionRecord {
            map_id: MapId::from("main"),
            current_version: version.to_string(),
            map_name: "Main".to_string(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn check_reports_update_when_cache_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let check = check_map_version(&remote(json!({})), &cache, &MapId::from("main")).await;
        assert!(check.needs_update);
        assert_eq!(check.remote.expect("record").current_version, "v2");
        assert_eq!(check.cached_version, None);
    }

    #[tokio::test]
    async fn check_skips_unknown_map() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let check = check_map_version(&remote(json!({})), &cache, &MapId::from("ghost")).await;
        assert!(!check.needs_update);
        assert!(check.remote.is_none());
    }

    #[tokio::test]
    async fn check_is_current_when_cached_version_matches() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        version_cache::save(&cache, &LocalVersionCacheEntry::from_record(&record("v2"), Utc::now()))
            .await
            .unwrap();
        let check = check_map_version(&remote(json!({})), &cache, &MapId::from("main")).await;
        assert!(!check.needs_update);
        assert_eq!(check.cached_version.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn sync_writes_both_collections_and_records_version() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let remote = remote(json!({
            "nodes": [{"id": "n1"}],
            "edges": [{"from": "n1", "to": "n2"}]
        }));

        let outcome = sync_map_version(&remote, &cache, &record("v2"), LEGACY).await;
        assert!(outcome.is_synced(), "got {outcome:?}");

        let raw = std::fs::read_to_string(tmp.path().join("nodes_main.json")).unwrap();
        let nodes: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(nodes, json!([{"id": "n1"}]));
        assert!(tmp.path().join("edges_main.json").exists());
        let entry = version_cache::load(&cache, &MapId::from("main")).await.expect("entry");
        assert_eq!(entry.cached_version, "v2");
    }

    #[tokio::test]
    async fn missing_version_document_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let outcome = sync_map_version(&remote(json!({})), &cache, &record("v9"), LEGACY).await;
        assert_eq!(
            outcome,
            MapSyncOutcome::VersionMissing {
                version: "v9".to_string()
            }
        );
        assert!(version_cache::load(&cache, &MapId::from("main")).await.is_none());
    }

    #[tokio::test]
    async fn partial_document_records_version_under_legacy_policy() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let remote = remote(json!({"nodes": [{"id": "n1"}]}));

        let outcome = sync_map_version(&remote, &cache, &record("v2"), LEGACY).await;
        match outcome {
            MapSyncOutcome::Synced { written, skipped, .. } => {
                assert_eq!(written, vec![VersionedCollection::Nodes]);
                assert_eq!(skipped, vec![VersionedCollection::Edges]);
            }
            other => panic!("expected synced, got {other:?}"),
        }
        assert!(!tmp.path().join("edges_main.json").exists());
        assert!(version_cache::load(&cache, &MapId::from("main")).await.is_some());
    }

    #[tokio::test]
    async fn partial_document_not_recorded_under_strict_policy() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let remote = remote(json!({"nodes": [{"id": "n1"}]}));
        let strict = VersionSyncPolicy {
            record_partial: false,
        };

        let outcome = sync_map_version(&remote, &cache, &record("v2"), strict).await;
        assert!(matches!(outcome, MapSyncOutcome::Incomplete { .. }), "got {outcome:?}");
        assert!(tmp.path().join("nodes_main.json").exists());
        assert!(version_cache::load(&cache, &MapId::from("main")).await.is_none());
    }

    #[tokio::test]
    async fn empty_catalog_completes_immediately() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCacheStore::new(tmp.path());
        let report = check_all_map_versions(&remote(json!({})), &cache, &[], LEGACY).await;
        assert_eq!(report, VersionReport::default());
    }
}
