//! Shared sync pipeline entrypoint used by CLI and daemon.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use campusmap_core::SyncConfig;

use crate::cache_store::{CacheStore, FsCacheStore};
use crate::catalog;
use crate::error::SyncError;
use crate::remote::{MemoryRemoteStore, RemoteStore};
use crate::static_data::{self, StaticReport};
use crate::versions::{self, VersionReport, VersionSyncPolicy};

/// Tunables for a [`SyncOrchestrator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub version_policy: VersionSyncPolicy,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            version_policy: VersionSyncPolicy {
                record_partial: config.record_partial_version_sync,
            },
        }
    }
}

/// Summary of one `check_and_sync` cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// `false` when the remote was not ready and nothing else ran.
    pub remote_ready: bool,
    pub catalog_size: usize,
    /// Whether the catalog came from the remote (vs. the local cache).
    pub catalog_refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<VersionReport>,
    /// `Some` only when the static stage ran a selective sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_data: Option<StaticReport>,
    pub static_checked: bool,
    pub duration_ms: u128,
}

impl SyncReport {
    /// Maps whose versioned collections were (re)written and recorded.
    pub fn maps_synced(&self) -> usize {
        self.versions
            .as_ref()
            .map(|v| v.synced.iter().filter(|s| s.outcome.is_synced()).count())
            .unwrap_or(0)
    }

    /// Static collections written and verified.
    pub fn static_synced(&self) -> usize {
        self.static_data
            .as_ref()
            .map(|s| s.verified.len())
            .unwrap_or(0)
    }
}

/// Sequences catalog, version and static-data reconciliation.
///
/// Holds the remote and local stores explicitly; construct one per
/// application and share it.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn CacheStore>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn CacheStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            remote,
            cache,
            options,
        }
    }

    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Run one full cycle. Always completes; stage failures are logged and
    /// recorded in the report, and cached data stays in place.
    pub async fn check_and_sync(&self) -> SyncReport {
        let started = Instant::now();
        let remote = self.remote.as_ref();
        let cache = self.cache.as_ref();
        let mut report = SyncReport::default();

        if !remote.is_ready().await {
            tracing::info!("remote store not ready; keeping cached data");
            report.duration_ms = started.elapsed().as_millis();
            return report;
        }
        report.remote_ready = true;

        let catalog = catalog::sync_catalog(remote, cache).await;
        report.catalog_size = catalog.maps.len();
        report.catalog_refreshed = catalog.refreshed;
        if catalog.maps.is_empty() {
            tracing::info!("map catalog empty; nothing to reconcile");
            report.duration_ms = started.elapsed().as_millis();
            return report;
        }

        report.versions = Some(
            versions::check_all_map_versions(
                remote,
                cache,
                &catalog.maps,
                self.options.version_policy,
            )
            .await,
        );

        let check = static_data::check_static_flags(remote, cache).await;
        report.static_checked = true;
        if check.needs_update {
            report.static_data = Some(static_data::sync_selectively(remote, cache, &check).await);
        } else {
            tracing::debug!("static collections current");
        }

        report.duration_ms = started.elapsed().as_millis();
        tracing::info!(
            maps = report.catalog_size,
            maps_synced = report.maps_synced(),
            static_synced = report.static_synced(),
            duration_ms = report.duration_ms,
            "check-and-sync completed",
        );
        report
    }
}

/// Build the stores described by `config` and seed the cache directory.
///
/// Without a `remote_snapshot` the remote is permanently offline and every
/// cycle keeps the cached data. With one, the file is re-read at the start of
/// every cycle, so a long-lived orchestrator sees later publications.
pub async fn orchestrator_from_config(config: &SyncConfig) -> Result<SyncOrchestrator, SyncError> {
    let cache = FsCacheStore::new(&config.cache_dir);
    cache.seed_defaults().await?;

    let remote = match &config.remote_snapshot {
        Some(path) => MemoryRemoteStore::load_snapshot(path).await?,
        None => MemoryRemoteStore::offline(),
    };

    Ok(SyncOrchestrator::new(
        Arc::new(remote),
        Arc::new(cache),
        SyncOptions::from_config(config),
    ))
}

/// Run one sync cycle for `config`.
///
/// This is the canonical sync entrypoint for both `campusmap sync` and the
/// daemon.
pub async fn run(config: &SyncConfig) -> Result<SyncReport, SyncError> {
    let orchestrator = orchestrator_from_config(config).await?;
    Ok(orchestrator.check_and_sync().await)
}
