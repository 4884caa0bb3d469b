//! Flag-driven selective sync of the static reference collections.
//!
//! The remote `StaticDataVersions/GlobalInfo` record carries one
//! `{collection}_updated` flag per static collection, raised by whoever
//! edits that collection. A collection is re-downloaded when its flag is
//! raised, when there is no local static cache, or when it was never
//! verified locally. Remote flags are lowered only for collections whose
//! local write was read back successfully, so failures retry next cycle.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use campusmap_core::types::STATIC_CACHE_FILE;
use campusmap_core::{
    DocValue, Fields, LocalStaticDataCache, StaticCollection, StaticDataVersionFlags,
};

use crate::cache_store::{load_json, save_json, CacheStore};
use crate::error::SyncError;
use crate::remote::{DocumentPath, RemoteDocument, RemoteStore, LAST_CHECK_FIELD};

/// Result of [`check_static_flags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCheck {
    pub needs_update: bool,
    pub flags: StaticDataVersionFlags,
    /// Whether the remote flags record exists.
    pub remote_present: bool,
    /// Whether `static_data_cache.json` exists and parses.
    pub has_local_cache: bool,
    pub local: Option<LocalStaticDataCache>,
}

impl StaticCheck {
    /// Collections `sync_selectively` will download.
    pub fn selected(&self) -> Vec<StaticCollection> {
        StaticCollection::all()
            .iter()
            .copied()
            .filter(|c| {
                let locally_synced = self.local.as_ref().is_some_and(|l| l.synced(*c));
                self.flags.get(*c) || !self.has_local_cache || !locally_synced
            })
            .collect()
    }
}

/// A collection whose sync failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticFailure {
    pub collection: StaticCollection,
    pub error: String,
}

/// Result of [`sync_selectively`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticReport {
    pub selected: Vec<StaticCollection>,
    pub verified: Vec<StaticCollection>,
    pub failed: Vec<StaticFailure>,
    /// Remote `_updated` flags lowered (one per verified collection).
    pub flags_reset: Vec<StaticCollection>,
    pub local_cache_saved: bool,
    pub last_check_stamped: bool,
}

/// Decide whether static collections need syncing.
///
/// A missing remote record (or a failed lookup) means first-run bootstrap:
/// every flag is forced on.
pub async fn check_static_flags(remote: &dyn RemoteStore, cache: &dyn CacheStore) -> StaticCheck {
    let local: Option<LocalStaticDataCache> = load_json(cache, STATIC_CACHE_FILE).await;
    let has_local_cache = local.is_some();

    let doc = match remote.get_document(&DocumentPath::static_flags()).await {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, "static flags lookup failed; forcing full static sync");
            None
        }
    };
    let Some(doc) = doc else {
        tracing::info!("no remote static flags record; bootstrapping all static collections");
        return StaticCheck {
            needs_update: true,
            flags: StaticDataVersionFlags::all_set(),
            remote_present: false,
            has_local_cache,
            local,
        };
    };

    let flags = StaticDataVersionFlags::from_fields(&doc.fields);
    let any_local_synced = local.as_ref().is_some_and(LocalStaticDataCache::any_synced);
    // Kept alongside `!has_local_cache`; see DESIGN.md open question 2.
    let bootstrap_needed = has_local_cache && !any_local_synced && !flags.any();
    let needs_update = !has_local_cache || bootstrap_needed || flags.any();

    tracing::debug!(
        has_local_cache,
        bootstrap_needed,
        needs_update,
        ?flags,
        "static flags checked"
    );

    StaticCheck {
        needs_update,
        flags,
        remote_present: true,
        has_local_cache,
        local,
    }
}

/// Download every selected static collection concurrently, then update the
/// local flags and lower the remote flags for the verified ones.
///
/// The remote `last_check` stamp is written regardless of outcomes.
pub async fn sync_selectively(
    remote: &dyn RemoteStore,
    cache: &dyn CacheStore,
    check: &StaticCheck,
) -> StaticReport {
    let selected = check.selected();
    let mut report = StaticReport {
        selected: selected.clone(),
        ..StaticReport::default()
    };

    let results = join_all(
        selected
            .iter()
            .map(|c| async move { (*c, sync_collection(remote, cache, *c).await) }),
    )
    .await;

    for (collection, result) in results {
        match result {
            Ok(count) => {
                tracing::info!(
                    collection = %collection,
                    documents = count,
                    "static collection synced"
                );
                report.verified.push(collection);
            }
            Err(err) => {
                tracing::error!(
                    collection = %collection,
                    error = %err,
                    "static collection sync failed"
                );
                report.failed.push(StaticFailure {
                    collection,
                    error: err.to_string(),
                });
            }
        }
    }

    let now = Utc::now();
    if !report.verified.is_empty() {
        let mut local = check
            .local
            .clone()
            .unwrap_or_else(|| LocalStaticDataCache::empty(now));
        for collection in &report.verified {
            local.set_synced(*collection, true);
        }
        local.cache_timestamp = now;
        match save_json(cache, STATIC_CACHE_FILE, &local).await {
            Ok(_) => report.local_cache_saved = true,
            Err(err) => tracing::error!(error = %err, "saving static data cache failed"),
        }

        let resets: Fields = report
            .verified
            .iter()
            .map(|c| (c.updated_field(), DocValue::Bool(false)))
            .collect();
        match remote.merge_fields(&DocumentPath::static_flags(), resets).await {
            Ok(()) => report.flags_reset = report.verified.clone(),
            Err(err) => tracing::error!(error = %err, "resetting remote static flags failed"),
        }
    }

    let stamp = Fields::from([(LAST_CHECK_FIELD.to_string(), DocValue::Integer(now.timestamp()))]);
    match remote.merge_fields(&DocumentPath::static_flags(), stamp).await {
        Ok(()) => report.last_check_stamped = true,
        Err(err) => tracing::warn!(error = %err, "stamping remote last_check failed"),
    }

    report
}

/// Fetch, normalize, write and read back one collection.
/// Returns the number of documents written.
async fn sync_collection(
    remote: &dyn RemoteStore,
    cache: &dyn CacheStore,
    collection: StaticCollection,
) -> Result<usize, SyncError> {
    let docs = remote.list_collection(collection.remote_name()).await?;
    let normalized: Vec<Value> = docs.iter().map(normalize_document).collect();

    let name = collection.file_name();
    save_json(cache, &name, &normalized).await?;

    match cache.read(&name).await? {
        Some(contents) if !contents.trim().is_empty() => Ok(normalized.len()),
        _ => Err(SyncError::Verify { name }),
    }
}

/// JSON form of a static document: list fields flattened to string lists,
/// `id` set to the document identifier.
pub fn normalize_document(doc: &RemoteDocument) -> Value {
    let mut object: Map<String, Value> = doc
        .fields
        .iter()
        .map(|(key, value)| {
            let encoded = match value {
                DocValue::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| Value::String(item.to_display_string()))
                        .collect(),
                ),
                other => other.to_json(),
            };
            (key.clone(), encoded)
        })
        .collect();
    object.insert("id".to_string(), Value::String(doc.id.clone()));
    Value::Object(object)
}
