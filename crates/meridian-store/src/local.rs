//! # Local Persistent Adapter
//!
//! File-backed key/value store: one blob file per key plus an explicit side
//! index of known keys.
//!
//! ## Layout
//! ```text
//! <root>/
//! ├── index.json          side index: JSON array of known keys
//! └── blobs/
//!     ├── 6b31.json       blob file, name is the hex-encoded key
//!     └── 743195f6...json
//! ```
//!
//! The underlying primitive is modeled as a flat blob store with no native
//! enumeration, so `keys()` answers from the side index; the index is
//! persisted on every mutation and reloaded on open. Blob file names are the
//! hex encoding of the key bytes, which keeps arbitrary key strings (slashes,
//! unicode) filesystem-safe.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::adapter::StorageAdapter;
use crate::error::{StoreError, StoreResult};

/// File name of the persisted side index.
const INDEX_FILE: &str = "index.json";

/// Directory holding the blob files.
const BLOB_DIR: &str = "blobs";

/// Local persistent key/value adapter.
pub struct LocalFileAdapter {
    root: PathBuf,
    index: RwLock<BTreeSet<String>>,
}

impl LocalFileAdapter {
    /// Opens (or creates) a store rooted at `root`, loading the side index.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(BLOB_DIR)).await?;

        let index = load_index(&root).await?;
        debug!(root = %root.display(), keys = index.len(), "Opened local store");

        Ok(LocalFileAdapter {
            root,
            index: RwLock::new(index),
        })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(BLOB_DIR).join(format!("{}.json", hex(key)))
    }

    async fn persist_index(&self, index: &BTreeSet<String>) -> StoreResult<()> {
        let serialized = serde_json::to_vec(&index.iter().collect::<Vec<_>>())?;
        fs::write(self.index_path(), serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for LocalFileAdapter {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        if !self.index.read().await.contains(key) {
            return Ok(None);
        }

        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            // Indexed but blob missing: treat as absent rather than failing
            // the read path.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let serialized = serde_json::to_vec(&value)?;

        // The index write lock is held across blob write and index persist
        // so a concurrent mutation of the same key cannot interleave between
        // them.
        let mut index = self.index.write().await;
        fs::write(self.blob_path(key), serialized).await?;

        if index.insert(key.to_string()) {
            self.persist_index(&index).await?;
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut index = self.index.write().await;

        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::from(e)),
        }

        if index.remove(key) {
            self.persist_index(&index).await?;
        }

        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut index = self.index.write().await;

        for key in index.iter() {
            if let Err(e) = fs::remove_file(self.blob_path(key)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key = %key, error = %e, "Failed to remove blob during clear");
                }
            }
        }

        index.clear();
        self.persist_index(&index).await?;

        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.index.read().await.iter().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Loads the persisted side index, tolerating a missing file.
async fn load_index(root: &Path) -> StoreResult<BTreeSet<String>> {
    match fs::read(root.join(INDEX_FILE)).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(StoreError::from(e)),
    }
}

/// Hex-encodes a key into a filesystem-safe blob name.
fn hex(key: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(key.len() * 2);
    for byte in key.as_bytes() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        store.set("k1", json!({"a": 1})).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some(json!({"a": 1})));

        store.remove("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        assert_eq!(store.get("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_come_from_the_side_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        store.set("t1_products", json!([])).await.unwrap();
        store.set("t1_branches", json!([])).await.unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["t1_branches", "t1_products"]
        );
    }

    #[tokio::test]
    async fn index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = LocalFileAdapter::open(dir.path()).await.unwrap();
            store.set("k1", json!(42)).await.unwrap();
            store.set("k2", json!("x")).await.unwrap();
        }

        let reopened = LocalFileAdapter::open(dir.path()).await.unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["k1", "k2"]);
        assert_eq!(reopened.get("k1").await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn clear_empties_store_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        store.set("k1", json!(1)).await.unwrap();
        store.set("k2", json!(2)).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.keys().await.unwrap().is_empty());
        assert_eq!(store.get("k1").await.unwrap(), None);

        // Cleared state persists across reopen too.
        drop(store);
        let reopened = LocalFileAdapter::open(dir.path()).await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn awkward_keys_are_filesystem_safe() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        let key = "tenant/1:products ürünler";
        store.set(key, json!({"ok": true})).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileAdapter::open(dir.path()).await.unwrap();

        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }
}
