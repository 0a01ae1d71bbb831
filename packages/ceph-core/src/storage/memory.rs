//! In-memory key store for tests and ephemeral sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use zeroize::Zeroizing;

use super::{KeyRecord, KeyStore};
use crate::error::{Error, Result};

/// Key store backed by a process-local map
///
/// Values are held as serialized JSON and zeroized when replaced or removed.
#[derive(Default)]
pub struct MemoryKeyStore {
    namespace: RwLock<Option<String>>,
    items: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemoryKeyStore {
    /// Create an uninitialized store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all namespaces
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn item_key(&self, key: &str) -> Result<String> {
        let namespace = self.namespace.read();
        let namespace = namespace.as_deref().ok_or(Error::StorageNotInitialized)?;
        Ok(format!("{}/{}", namespace, key))
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn init(&self, database: &str, collection: &str) -> Result<()> {
        if database.is_empty() || collection.is_empty() {
            return Err(Error::InvalidArgument(
                "database and collection names must not be empty".into(),
            ));
        }

        *self.namespace.write() = Some(format!("{}/{}", database, collection));
        tracing::debug!("Memory key store ready ({}/{})", database, collection);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.namespace.read().is_some()
    }

    async fn write_item(&self, key: &str, record: &KeyRecord) -> Result<()> {
        let item_key = self.item_key(key)?;
        let value = Zeroizing::new(record.to_json()?);
        self.items.write().insert(item_key, value);
        Ok(())
    }

    async fn read_item(&self, key: &str) -> Result<Option<KeyRecord>> {
        let item_key = self.item_key(key)?;
        let items = self.items.read();
        items
            .get(&item_key)
            .map(|bytes| KeyRecord::from_json(bytes))
            .transpose()
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let item_key = self.item_key(key)?;
        self.items.write().remove(&item_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sample_record;

    #[tokio::test]
    async fn test_requires_init() {
        let store = MemoryKeyStore::new();
        assert!(!store.is_ready());
        assert!(matches!(
            store.read_item("alice").await,
            Err(Error::StorageNotInitialized)
        ));
        assert!(matches!(
            store.remove_item("alice").await,
            Err(Error::StorageNotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let store = MemoryKeyStore::new();
        store.init("ceph", "crypto").await.unwrap();

        let record = sample_record();
        store.write_item("alice", &record).await.unwrap();
        assert_eq!(store.read_item("alice").await.unwrap(), Some(record));
        assert_eq!(store.read_item("bob").await.unwrap(), None);

        store.remove_item("alice").await.unwrap();
        store.remove_item("alice").await.unwrap();
        assert_eq!(store.read_item("alice").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let store = MemoryKeyStore::new();
        store.init("ceph", "crypto").await.unwrap();
        store.write_item("alice", &sample_record()).await.unwrap();

        store.init("ceph", "other").await.unwrap();
        assert_eq!(store.read_item("alice").await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_names() {
        let store = MemoryKeyStore::new();
        assert!(store.init("", "crypto").await.is_err());
        assert!(!store.is_ready());
    }
}
