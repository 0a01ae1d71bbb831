//! # Configuration
//!
//! Where keys are stored and which cipher new envelopes use.
//!
//! ```json
//! {
//!   "database_name": "ceph",
//!   "collection_name": "crypto",
//!   "storage_path": "/var/lib/app/keys",
//!   "default_cipher_version": 2,
//!   "verbose_logging": false
//! }
//! ```
//!
//! Every field is optional in JSON. Without `storage_path` keys live in
//! memory for the lifetime of the process.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::CipherVersion;
use crate::error::{Error, Result};
use crate::session::CryptoSession;
use crate::storage::{
    KeyStore, MemoryKeyStore, SqliteKeyStore, DEFAULT_COLLECTION, DEFAULT_DATABASE,
};

/// Configuration for opening a key store and its sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CephConfig {
    /// Key store database name
    pub database_name: String,
    /// Collection inside the database
    pub collection_name: String,
    /// Directory for the SQLite database (in memory if None)
    pub storage_path: Option<PathBuf>,
    /// Cipher for new envelopes
    pub default_cipher_version: CipherVersion,
    /// Enable verbose logging
    pub verbose_logging: bool,
}

impl Default for CephConfig {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE.into(),
            collection_name: DEFAULT_COLLECTION.into(),
            storage_path: None,
            default_cipher_version: CipherVersion::default(),
            verbose_logging: cfg!(feature = "verbose-logging"),
        }
    }
}

impl CephConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidArgument(format!("config: {}", e)))
    }

    /// Build and initialize the configured key store
    pub async fn open_store(&self) -> Result<Arc<dyn KeyStore>> {
        let store: Arc<dyn KeyStore> = match &self.storage_path {
            Some(path) => Arc::new(SqliteKeyStore::new(Some(path.clone()))),
            None => Arc::new(MemoryKeyStore::new()),
        };

        store.init(&self.database_name, &self.collection_name).await?;

        if self.verbose_logging {
            tracing::info!(
                "Key store opened: {}/{} ({})",
                self.database_name,
                self.collection_name,
                self.storage_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "in memory".into())
            );
        }
        Ok(store)
    }

    /// Open the store and a session for `access_path` in one step
    ///
    /// The stored key-pair, if any, is loaded.
    pub async fn open_session(&self, access_path: &str) -> Result<CryptoSession> {
        let store = self.open_store().await?;
        let mut session = CryptoSession::new(store, access_path)
            .with_cipher_version(self.default_cipher_version);
        session.load_key_pair().await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CephConfig::default();
        assert_eq!(config.database_name, "ceph");
        assert_eq!(config.collection_name, "crypto");
        assert_eq!(config.storage_path, None);
        assert_eq!(config.default_cipher_version, CipherVersion::AesGcm);
    }

    #[test]
    fn test_partial_json() {
        let config = CephConfig::from_json_str(r#"{ "default_cipher_version": 1 }"#).unwrap();
        assert_eq!(config.default_cipher_version, CipherVersion::AesCbc);
        assert_eq!(config.database_name, "ceph");

        assert!(CephConfig::from_json_str(r#"{ "default_cipher_version": 5 }"#).is_err());
        assert!(CephConfig::from_json_str("not json").is_err());
    }

    #[tokio::test]
    async fn test_open_store_in_memory() {
        let store = CephConfig::default().open_store().await.unwrap();
        assert!(store.is_ready());
    }

    #[tokio::test]
    async fn test_open_session_reloads_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = CephConfig {
            storage_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let public = {
            let mut session = config.open_session("alice").await.unwrap();
            assert!(!session.has_key_pair());
            session.generate_key_pair(None).await.unwrap();
            session.public_key_string().unwrap().to_string()
        };

        let session = config.open_session("alice").await.unwrap();
        assert!(session.has_key_pair());
        assert_eq!(session.public_key_string(), Some(public.as_str()));
    }

    #[tokio::test]
    async fn test_open_store_rejects_bad_collection() {
        let config = CephConfig {
            storage_path: Some(tempfile::tempdir().unwrap().path().to_path_buf()),
            collection_name: "no spaces".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.open_store().await,
            Err(Error::InvalidArgument(_))
        ));
    }
}
