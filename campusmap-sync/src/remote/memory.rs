//! In-memory [`RemoteStore`] with optional JSON snapshot backing.
//!
//! Documents are kept in a flat map keyed by their slash-joined path. The
//! snapshot file nests them the way the store is organised, with
//! subcollections under a reserved `__collections__` key:
//!
//! ```json
//! {
//!   "MapVersions": {
//!     "main": {
//!       "current_version": "v2",
//!       "__collections__": {
//!         "versions": { "v2": { "nodes": [], "edges": [] } }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! A file-backed store treats the file as the source of truth: it is re-read
//! whenever readiness is checked (once per sync cycle) and again before every
//! merge, so edits made by other writers are observed and never overwritten
//! by a stale copy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use campusmap_core::value::{fields_from_json, fields_to_json};
use campusmap_core::Fields;

use super::{DocumentPath, RemoteDocument, RemoteError, RemoteStore};
use crate::error::{io_err, SyncError};

/// Reserved snapshot key holding a document's subcollections.
pub const SUBCOLLECTIONS_KEY: &str = "__collections__";

/// Remote store held in memory.
pub struct MemoryRemoteStore {
    docs: RwLock<BTreeMap<String, Fields>>,
    ready: AtomicBool,
    snapshot: Option<PathBuf>,
    /// Serializes read-merge-write cycles on the snapshot file.
    file_lock: Mutex<()>,
}

impl MemoryRemoteStore {
    /// Empty, ready store without file backing.
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            ready: AtomicBool::new(true),
            snapshot: None,
            file_lock: Mutex::new(()),
        }
    }

    /// A store that never becomes ready; every call reports unavailable.
    pub fn offline() -> Self {
        let store = Self::new();
        store.set_ready(false);
        store
    }

    /// Build from an in-memory snapshot value (no file backing).
    pub fn from_snapshot(snapshot: Value) -> Result<Self, SyncError> {
        let store = Self::new();
        {
            let mut docs = store.docs.write().unwrap_or_else(PoisonError::into_inner);
            load_collections(&[], snapshot, &mut docs)?;
        }
        Ok(store)
    }

    /// Load a snapshot file; merge writes are persisted back to it.
    pub async fn load_snapshot(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        let docs = read_snapshot(&path).await?;
        let mut store = Self::new();
        store.docs = RwLock::new(docs);
        store.snapshot = Some(path);
        Ok(store)
    }

    /// Replace the in-memory documents with the current snapshot file
    /// contents. No-op without file backing.
    pub async fn reload(&self) -> Result<(), SyncError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let docs = read_snapshot(path).await?;
        *self.docs.write().unwrap_or_else(PoisonError::into_inner) = docs;
        Ok(())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Replace a document wholesale. On a file-backed store this lasts only
    /// until the next [`reload`](Self::reload).
    pub fn insert(&self, path: &DocumentPath, fields: Fields) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), fields);
    }

    pub fn remove(&self, path: &DocumentPath) -> Option<Fields> {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&path.to_string())
    }

    /// Current fields of a document, bypassing readiness.
    pub fn document(&self, path: &DocumentPath) -> Option<Fields> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path.to_string())
            .cloned()
    }

    /// Nested snapshot representation of the whole store.
    pub fn to_snapshot(&self) -> Value {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        let mut root = Map::new();
        for (key, fields) in docs.iter() {
            let segments: Vec<&str> = key.split('/').collect();
            if let Some(doc) = nested_document(&mut root, &segments) {
                if let Value::Object(encoded) = fields_to_json(fields) {
                    doc.extend(encoded);
                }
            }
        }
        Value::Object(root)
    }

    fn apply_merge(&self, path: &DocumentPath, fields: Fields) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .extend(fields);
    }

    async fn persist(&self, path: &Path) -> Result<(), RemoteError> {
        let json = serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| RemoteError::Backend(format!("encode snapshot: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RemoteError::Backend(format!("write {}: {e}", tmp.display())))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RemoteError::Backend(format!(
                "rename {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), RemoteError> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("store is offline".to_string()))
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn is_ready(&self) -> bool {
        if !self.ready.load(Ordering::SeqCst) {
            return false;
        }
        match self.reload().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "remote snapshot unreadable; treating remote as unavailable"
                );
                false
            }
        }
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.ensure_ready()?;
        let prefix = format!("{collection}/");
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, fields)| {
                let id = &key[prefix.len()..];
                (!id.contains('/')).then(|| RemoteDocument {
                    id: id.to_string(),
                    fields: fields.clone(),
                })
            })
            .collect())
    }

    async fn get_document(
        &self,
        path: &DocumentPath,
    ) -> Result<Option<RemoteDocument>, RemoteError> {
        self.ensure_ready()?;
        Ok(self.document(path).map(|fields| RemoteDocument {
            id: path.id().to_string(),
            fields,
        }))
    }

    async fn merge_fields(&self, path: &DocumentPath, fields: Fields) -> Result<(), RemoteError> {
        self.ensure_ready()?;
        let Some(snapshot) = &self.snapshot else {
            self.apply_merge(path, fields);
            return Ok(());
        };

        let _guard = self.file_lock.lock().await;
        self.reload()
            .await
            .map_err(|e| RemoteError::Backend(format!("reload {}: {e}", snapshot.display())))?;
        self.apply_merge(path, fields);
        self.persist(snapshot).await
    }
}

// ---------------------------------------------------------------------------
// Snapshot encoding
// ---------------------------------------------------------------------------

async fn read_snapshot(path: &Path) -> Result<BTreeMap<String, Fields>, SyncError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_err(path, e))?;
    let value: Value = serde_json::from_str(&raw)?;
    let mut docs = BTreeMap::new();
    load_collections(&[], value, &mut docs)?;
    Ok(docs)
}

fn load_collections(
    parent: &[String],
    collections: Value,
    out: &mut BTreeMap<String, Fields>,
) -> Result<(), SyncError> {
    let Value::Object(collections) = collections else {
        return Err(snapshot_err(parent, "expected an object of collections"));
    };
    for (collection, docs) in collections {
        let Value::Object(docs) = docs else {
            return Err(snapshot_err(parent, "expected an object of documents"));
        };
        for (id, doc) in docs {
            let mut segments = parent.to_vec();
            segments.push(collection.clone());
            segments.push(id);

            let Value::Object(mut doc) = doc else {
                return Err(snapshot_err(&segments, "document must be an object"));
            };
            if let Some(children) = doc.remove(SUBCOLLECTIONS_KEY) {
                load_collections(&segments, children, out)?;
            }
            let fields = fields_from_json(Value::Object(doc)).unwrap_or_default();
            out.insert(segments.join("/"), fields);
        }
    }
    Ok(())
}

fn snapshot_err(segments: &[String], message: &str) -> SyncError {
    let at = if segments.is_empty() {
        "<root>".to_string()
    } else {
        segments.join("/")
    };
    SyncError::Json(serde::de::Error::custom(format!(
        "invalid remote snapshot at {at}: {message}"
    )))
}

/// Walk (and create) the nested object for a document path.
fn nested_document<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[&str],
) -> Option<&'a mut Map<String, Value>> {
    let mut level = root;
    let mut pairs = segments.chunks(2).peekable();
    while let Some(pair) = pairs.next() {
        let [collection, id] = pair else {
            return None;
        };
        let docs = level
            .entry(collection.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
        let doc = docs
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
        if pairs.peek().is_none() {
            return Some(doc);
        }
        level = doc
            .entry(SUBCOLLECTIONS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
    }
    None
}
