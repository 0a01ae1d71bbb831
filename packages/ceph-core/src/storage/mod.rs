//! # Storage Module
//!
//! Persistent storage for the session key-pair.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY STORE                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyStore Trait                                                 │   │
//! │  │  ──────────────                                                  │   │
//! │  │                                                                 │   │
//! │  │  • init(database, collection)  - Open / create the namespace    │   │
//! │  │  • write_item(path, record)    - Insert or replace              │   │
//! │  │  • read_item(path)             - Option<KeyRecord>              │   │
//! │  │  • remove_item(path)           - Idempotent delete              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌───────────────────┐        ┌───────────────────┐                    │
//! │  │  MemoryKeyStore   │        │  SqliteKeyStore   │                    │
//! │  │                   │        │                   │                    │
//! │  │ - Tests           │        │ - One file per    │                    │
//! │  │ - Ephemeral       │        │   database name   │                    │
//! │  │   sessions        │        │ - One table per   │                    │
//! │  │                   │        │   collection      │                    │
//! │  └───────────────────┘        └───────────────────┘                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is Stored
//!
//! One [`KeyRecord`] per access path. The record carries the private key as
//! PKCS#8 DER even when the key is non-extractable: the store is the trust
//! boundary, the export string is not. Records are serialized as JSON by
//! every backend.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::Jwk;
use crate::error::Result;

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryKeyStore;
pub use sqlite::SqliteKeyStore;

/// Collection used when none is configured
pub const DEFAULT_COLLECTION: &str = "crypto";

/// Database name used when none is configured
pub const DEFAULT_DATABASE: &str = "ceph";

/// Private key as held in the store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredPrivateKey {
    /// PKCS#8 DER, hex encoded
    pub pkcs8_hex: String,
    /// Whether the key may be exported as a JWK after loading
    #[zeroize(skip)]
    pub extractable: bool,
}

impl fmt::Debug for StoredPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredPrivateKey")
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

/// Storage form of a session's key bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Public key as a JWK
    pub public_jwk: Jwk,
    /// Private key, if the session holds one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<StoredPrivateKey>,
    /// `$ceph1-publ$jwk$...`
    pub public_export: String,
    /// `$ceph1-priv$hex$...`, only when an export password was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_export: Option<String>,
}

impl KeyRecord {
    /// JSON bytes written by the backends
    pub(crate) fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse backend JSON; any failure means the stored bytes are corrupt
    pub(crate) fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| crate::error::Error::StorageCorrupted(format!("key record: {}", e)))
    }
}

/// Persistent store of key records, keyed by access path
///
/// Every operation other than `init` and `is_ready` fails with
/// `StorageNotInitialized` until `init` has succeeded.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Open or create the `(database, collection)` namespace
    ///
    /// Calling `init` again switches the namespace.
    async fn init(&self, database: &str, collection: &str) -> Result<()>;

    /// Whether `init` has succeeded
    fn is_ready(&self) -> bool;

    /// Insert or replace the record at `key`
    async fn write_item(&self, key: &str, record: &KeyRecord) -> Result<()>;

    /// Read the record at `key`
    async fn read_item(&self, key: &str) -> Result<Option<KeyRecord>>;

    /// Remove the record at `key`; removing a missing record is not an error
    async fn remove_item(&self, key: &str) -> Result<()>;
}

// ============================================================================
// TESTS
// ============================================================================
