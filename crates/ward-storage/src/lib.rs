//! Credential Store: persistent string key-value storage for Ward.
//!
//! [`KeyValueStore`] is the seam between the wallet and whatever the host
//! offers for storage. Two backends ship here ([`MemoryStore`] and
//! [`SledStore`]); the relay crate adds a third that proxies every call
//! to a privileged context. [`CredentialStore`] layers the account key
//! layout on top of any backend.

pub mod credentials;
pub mod engine;
pub mod memory;

use async_trait::async_trait;
use ward_types::Result;

pub use credentials::{CredentialStore, DEFAULT_ADDRESS_KEY, KEY_PREFIX};
pub use engine::SledStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Flat string-to-string storage.
///
/// `get` distinguishes an absent key (`Ok(None)`) from a stored empty
/// string. Errors only report backend failures, never absence. `set`
/// overwrites unconditionally.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes `key`. Deleting an absent key is not an error.
    ///
    /// The default implementation stores an empty string, which
    /// [`CredentialStore`] reads as absent. Backends that can delete
    /// override it.
    async fn remove(&self, key: &str) -> Result<()> {
        self.set(key, "").await
    }

    /// Writes every entry or none of them.
    ///
    /// The default implementation reads every prior value first, then
    /// writes sequentially and restores the prior values if a write
    /// fails. Backends with native batches override it.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let mut previous: Vec<(String, Option<String>)> = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            previous.push((key.clone(), self.get(key).await?));
        }
        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value).await {
                for (undo_key, prior) in previous.into_iter().take(written + 1).rev() {
                    restore(self, &undo_key, prior).await;
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

async fn restore<S: KeyValueStore + ?Sized>(store: &S, key: &str, prior: Option<String>) {
    let undone = match prior {
        Some(value) => store.set(key, &value).await,
        None => store.remove(key).await,
    };
    if let Err(e) = undone {
        tracing::error!(key, error = %e, "rollback write failed");
    }
}
