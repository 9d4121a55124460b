//! In-process backend used by tests and ephemeral sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use ward_types::Result;

use crate::KeyValueStore;

/// [`KeyValueStore`] held in a `RwLock<HashMap>`. Contents vanish with
/// the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let mut guard = self.entries.write().await;
        for (key, value) in entries {
            guard.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_types::WardError;

    #[tokio::test]
    async fn absent_key_is_none() -> std::result::Result<(), WardError> {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn empty_string_is_not_absent() -> std::result::Result<(), WardError> {
        let store = MemoryStore::new();
        store.set("k", "").await?;
        assert_eq!(store.get("k").await?, Some(String::new()));
        Ok(())
    }

    #[tokio::test]
    async fn set_overwrites() -> std::result::Result<(), WardError> {
        let store = MemoryStore::new();
        store.set("k", "one").await?;
        store.set("k", "two").await?;
        assert_eq!(store.get("k").await?.as_deref(), Some("two"));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn set_many_writes_all() -> std::result::Result<(), WardError> {
        let store = MemoryStore::new();
        store
            .set_many(&[("a".into(), "1".into()), ("b".into(), "2".into())])
            .await?;
        assert_eq!(store.get("a").await?.as_deref(), Some("1"));
        assert_eq!(store.get("b").await?.as_deref(), Some("2"));
        Ok(())
    }
}
