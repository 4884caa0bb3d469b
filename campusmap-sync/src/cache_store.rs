//! Local cache store: named JSON files on durable storage.
//!
//! ## `FsCacheStore::write`: content-gated atomic write
//!
//! 1. SHA-256 hash the new content.
//! 2. Hash the current file content, if any.
//! 3. Identical → skip, file and mtime untouched.
//! 4. Write to `<name>.tmp` in the cache directory.
//! 5. Rename to the final name (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use campusmap_core::types::default_cache_files;

use crate::error::SyncError;

/// Content of a freshly seeded cache file.
pub const EMPTY_COLLECTION: &str = "[]";

/// Errors raised by a [`CacheStore`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache names are bare file names; separators and `..` are rejected.
    #[error("invalid cache file name '{0}'")]
    InvalidName(String),
}

fn cache_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}

/// Outcome of a single cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content changed or the file did not exist.
    Written { digest: String },
    /// Content identical to what is on disk; nothing was touched.
    Unchanged { digest: String },
}

impl WriteOutcome {
    pub fn digest(&self) -> &str {
        match self {
            WriteOutcome::Written { digest } | WriteOutcome::Unchanged { digest } => digest,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Read/write access to named cache files.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// File content, or `None` when the file does not exist.
    async fn read(&self, name: &str) -> Result<Option<String>, CacheError>;

    /// Replace the file content.
    async fn write(&self, name: &str, contents: &str) -> Result<WriteOutcome, CacheError>;
}

/// Hex SHA-256 of `content`.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Read and parse a JSON cache file.
///
/// Missing, unreadable, and malformed files all yield `None`: callers treat
/// them as an absent cache and resync the entity.
pub async fn load_json<T: DeserializeOwned>(cache: &dyn CacheStore, name: &str) -> Option<T> {
    let raw = match cache.read(name).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(file = name, error = %err, "cache read failed; treating as absent");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(file = name, error = %err, "cache file malformed; treating as absent");
            None
        }
    }
}

/// Serialize `value` as pretty JSON and write it.
pub async fn save_json<T: Serialize + ?Sized>(
    cache: &dyn CacheStore,
    name: &str,
    value: &T,
) -> Result<WriteOutcome, SyncError> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(cache.write(name, &json).await?)
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// Cache store rooted at a directory, one file per name.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a cache file.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, CacheError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Create the cache directory and write `[]` to each default file that
    /// does not exist yet. Returns the names that were created.
    pub async fn seed_defaults(&self) -> Result<Vec<String>, CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| cache_io_err(&self.root, e))?;
        let mut created = Vec::new();
        for name in default_cache_files() {
            if self.read(&name).await?.is_none() {
                self.write(&name, EMPTY_COLLECTION).await?;
                created.push(name);
            }
        }
        Ok(created)
    }

    async fn write_with_tmp(
        &self,
        path: &Path,
        tmp: &Path,
        contents: &str,
    ) -> Result<WriteOutcome, CacheError> {
        let digest = content_digest(contents);

        match tokio::fs::read_to_string(path).await {
            Ok(existing) if content_digest(&existing) == digest => {
                tracing::debug!("unchanged: {}", path.display());
                return Ok(WriteOutcome::Unchanged { digest });
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(cache_io_err(path, err)),
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| cache_io_err(parent, e))?;
        }
        tokio::fs::write(tmp, contents)
            .await
            .map_err(|e| cache_io_err(tmp, e))?;

        if let Err(e) = tokio::fs::rename(tmp, path).await {
            let _ = tokio::fs::remove_file(tmp).await;
            return Err(cache_io_err(path, e));
        }

        tracing::debug!("wrote: {}", path.display());
        Ok(WriteOutcome::Written { digest })
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn read(&self, name: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(cache_io_err(&path, err)),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> Result<WriteOutcome, CacheError> {
        let path = self.path_for(name)?;
        let tmp = self.root.join(format!("{name}.tmp"));
        self.write_with_tmp(&path, &tmp, contents).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
