//! Error types for campusmap-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache_store::CacheError;
use crate::remote::RemoteError;

/// All errors that can arise inside a sync stage.
///
/// Stages catch these at their boundary and record them in their report;
/// only setup functions such as [`crate::pipeline::run`] return them.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the remote document store.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// An error from the local cache store.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A cache file was written but reading it back returned no content.
    #[error("read-back verification failed for {name}")]
    Verify { name: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
