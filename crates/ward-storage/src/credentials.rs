//! Account key layout on top of a [`KeyValueStore`].
//!
//! | key                        | value                    |
//! |----------------------------|--------------------------|
//! | `__WARD_default_address`   | bech32 address           |
//! | `__WARD_<address>`         | encrypted wallet blob    |

use std::sync::Arc;

use ward_types::{Address, Result, WardError};

use crate::KeyValueStore;

/// Namespace prefix shared by every Ward key.
pub const KEY_PREFIX: &str = "__WARD_";

/// Key of the default-address pointer.
pub const DEFAULT_ADDRESS_KEY: &str = "__WARD_default_address";

/// Returns the storage key of the blob for `address`.
pub fn account_key(address: &Address) -> String {
    format!("{KEY_PREFIX}{address}")
}

/// Typed view of the credential key space.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Reads the default-address pointer.
    ///
    /// An empty pointer (left behind by a rolled-back write) counts as
    /// absent.
    pub async fn default_address(&self) -> Result<Option<Address>> {
        match self.backend.get(DEFAULT_ADDRESS_KEY).await? {
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => Address::parse(&raw).map(Some).map_err(|e| WardError::StorageError {
                reason: format!("corrupt default address pointer: {e}"),
            }),
            None => Ok(None),
        }
    }

    /// Reads the encrypted blob stored for `address`.
    pub async fn encrypted_blob(&self, address: &Address) -> Result<Option<String>> {
        match self.backend.get(&account_key(address)).await? {
            Some(blob) if blob.is_empty() => Ok(None),
            other => Ok(other),
        }
    }

    /// Returns `true` when a default account is recorded.
    pub async fn has_account(&self) -> Result<bool> {
        Ok(self.default_address().await?.is_some())
    }

    /// Stores `blob` for `address` and points the default address at it
    /// in one all-or-nothing write.
    pub async fn save_account(&self, address: &Address, blob: &str) -> Result<()> {
        let entries = vec![
            (account_key(address), blob.to_owned()),
            (DEFAULT_ADDRESS_KEY.to_owned(), address.to_string()),
        ];
        self.backend.set_many(&entries).await?;
        tracing::info!(%address, "account stored");
        Ok(())
    }
}
