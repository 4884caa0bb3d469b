//! Map catalog sync: the list of maps that exist.

use serde::Serialize;

use campusmap_core::types::MAPS_FILE;
use campusmap_core::MapDescriptor;

use crate::cache_store::{load_json, save_json, CacheStore};
use crate::remote::{RemoteStore, MAPS_COLLECTION};

/// Result of [`sync_catalog`].
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSync {
    pub maps: Vec<MapDescriptor>,
    /// `true` when `maps` came from the remote store and was written locally;
    /// `false` when the cached catalog was used instead.
    pub refreshed: bool,
}

/// Fetch the remote `Maps` collection and write it to `maps.json`.
///
/// Never fails: when the remote is unavailable or the write fails, the
/// catalog already cached locally is returned (empty if there is none).
pub async fn sync_catalog(remote: &dyn RemoteStore, cache: &dyn CacheStore) -> CatalogSync {
    let docs = match remote.list_collection(MAPS_COLLECTION).await {
        Ok(docs) => docs,
        Err(err) => {
            tracing::warn!(error = %err, "map catalog fetch failed; using cached catalog");
            return cached(cache).await;
        }
    };

    let maps: Vec<MapDescriptor> = docs
        .iter()
        .map(|doc| MapDescriptor::from_fields(&doc.id, &doc.fields))
        .collect();

    match save_json(cache, MAPS_FILE, &maps).await {
        Ok(outcome) => {
            tracing::info!(
                maps = maps.len(),
                written = outcome.is_written(),
                "map catalog synced"
            );
            CatalogSync {
                maps,
                refreshed: true,
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "writing map catalog failed; using cached catalog");
            cached(cache).await
        }
    }
}

/// Catalog currently stored in `maps.json`.
pub async fn load_cached_catalog(cache: &dyn CacheStore) -> Vec<MapDescriptor> {
    load_json(cache, MAPS_FILE).await.unwrap_or_default()
}

async fn cached(cache: &dyn CacheStore) -> CatalogSync {
    CatalogSync {
        maps: load_cached_catalog(cache).await,
        refreshed: false,
    }
}
