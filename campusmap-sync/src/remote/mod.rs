//! Remote document store contract.
//!
//! The remote store is organised as collections of documents, where each
//! document may own nested subcollections:
//!
//! ```text
//! Maps/{mapId}
//! MapVersions/{mapId}
//! MapVersions/{mapId}/versions/{version}
//! StaticDataVersions/GlobalInfo
//! Infrastructure/{id}   Categories/{id}   Campus/{id}
//! ```
//!
//! The engine only reads, except for merge-style field updates on the static
//! flags record. [`MemoryRemoteStore`] is the bundled implementation, backed
//! by an in-memory tree that can be loaded from and persisted to a JSON
//! snapshot file.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use campusmap_core::{Fields, MapId};

mod memory;

pub use memory::MemoryRemoteStore;

pub const MAPS_COLLECTION: &str = "Maps";
pub const MAP_VERSIONS_COLLECTION: &str = "MapVersions";
pub const VERSIONS_SUBCOLLECTION: &str = "versions";
pub const STATIC_VERSIONS_COLLECTION: &str = "StaticDataVersions";
pub const GLOBAL_INFO_DOCUMENT: &str = "GlobalInfo";
pub const LAST_CHECK_FIELD: &str = "last_check";

/// Errors surfaced by a [`RemoteStore`].
///
/// A missing document is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No connectivity, no credentials, or the store is not initialised.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the request.
    #[error("remote backend error: {0}")]
    Backend(String),
}

/// Path to a single document: alternating collection / document segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            segments: vec![collection.into(), id.into()],
        }
    }

    /// Descend into a subcollection document.
    pub fn child(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.segments.push(collection.into());
        self.segments.push(id.into());
        self
    }

    /// `MapVersions/{mapId}`
    pub fn map_version(map_id: &MapId) -> Self {
        Self::new(MAP_VERSIONS_COLLECTION, map_id.as_str())
    }

    /// `MapVersions/{mapId}/versions/{version}`
    pub fn map_version_data(map_id: &MapId, version: &str) -> Self {
        Self::map_version(map_id).child(VERSIONS_SUBCOLLECTION, version)
    }

    /// `StaticDataVersions/GlobalInfo`
    pub fn static_flags() -> Self {
        Self::new(STATIC_VERSIONS_COLLECTION, GLOBAL_INFO_DOCUMENT)
    }

    /// Document identifier (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A document as returned by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Fields,
}

/// Read access to collections and documents, plus merge writes.
///
/// Implementations must be safe to call concurrently: the engine fans out
/// many lookups against one store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether the store is reachable and initialised.
    async fn is_ready(&self) -> bool;

    /// Every document of a top-level collection.
    async fn list_collection(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// A single document, or `None` when it does not exist.
    async fn get_document(&self, path: &DocumentPath)
        -> Result<Option<RemoteDocument>, RemoteError>;

    /// Merge `fields` into the document, creating it when missing.
    /// Fields not named in `fields` are preserved.
    async fn merge_fields(&self, path: &DocumentPath, fields: Fields) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_paths_render_with_slashes() {
        let path = DocumentPath::map_version_data(&MapId::from("main"), "v2");
        assert_eq!(path.to_string(), "MapVersions/main/versions/v2");
        assert_eq!(path.id(), "v2");
        assert_eq!(
            DocumentPath::static_flags().to_string(),
            "StaticDataVersions/GlobalInfo"
        );
    }
}
