//! # campusmap-sync
//!
//! Reconciles the remote versioned document store against the local JSON
//! cache so the map application can run offline between syncs.
//!
//! Call [`SyncOrchestrator::check_and_sync`] to run one full cycle:
//! catalog → per-map versions → static collections. Use [`pipeline::run`]
//! to build the stores from a [`campusmap_core::SyncConfig`] first.

pub mod cache_store;
pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod static_data;
pub mod status;
pub mod version_cache;
pub mod versions;

pub use cache_store::{CacheError, CacheStore, FsCacheStore, WriteOutcome};
pub use error::SyncError;
pub use pipeline::{SyncOptions, SyncOrchestrator, SyncReport};
pub use remote::{DocumentPath, MemoryRemoteStore, RemoteDocument, RemoteError, RemoteStore};
pub use versions::VersionSyncPolicy;
