//! Disk-backed store on a sled tree.
//!
//! Values are stored as UTF-8 bytes in the `credentials` tree. Blobs
//! are already encrypted by the wallet, so the tree itself is plain.
//! Every write is flushed before returning.

use std::path::Path;

use async_trait::async_trait;
use ward_types::{Result, WardError};

use crate::KeyValueStore;

/// Name of the sled tree holding all entries.
const TREE_NAME: &str = "credentials";

/// [`KeyValueStore`] persisted with sled.
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// [`WardError::StorageError`] if the database or tree cannot be
    /// opened.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| WardError::StorageError {
            reason: format!("failed to open sled database at {}: {e}", path.display()),
        })?;
        let tree = db.open_tree(TREE_NAME).map_err(|e| WardError::StorageError {
            reason: format!("failed to open tree '{TREE_NAME}': {e}"),
        })?;
        tracing::debug!(path = %path.display(), "credential store opened");
        Ok(Self { db, tree })
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(|e| WardError::StorageError {
            reason: format!("failed to flush database: {e}"),
        })?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let raw = self
            .tree
            .get(key.as_bytes())
            .map_err(|e| WardError::StorageError {
                reason: format!("failed to read {key:?}: {e}"),
            })?;
        match raw {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    WardError::StorageError {
                        reason: format!("value under {key:?} is not UTF-8: {e}"),
                    }
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| WardError::StorageError {
                reason: format!("failed to write {key:?}: {e}"),
            })?;
        self.flush()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| WardError::StorageError {
                reason: format!("failed to remove {key:?}: {e}"),
            })?;
        self.flush()
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_bytes(), value.as_bytes());
        }
        self.tree
            .apply_batch(batch)
            .map_err(|e| WardError::StorageError {
                reason: format!("failed to apply batch of {} entries: {e}", entries.len()),
            })?;
        self.flush()
    }
}
