//! # Ceph Core
//!
//! Client-side cryptographic envelopes: an RSA key-pair per access path,
//! hybrid encryption of serializable objects, password-protected key
//! export, and salted password hashing.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CEPH CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────┐        ┌─────────────────────────┐        │
//! │  │        Session          │        │        Envelope         │        │
//! │  │                         │───────►│                         │        │
//! │  │ - Generate / load       │        │ - RSA-wrapped AES key   │        │
//! │  │ - Import / export       │        │ - Versioned cipher      │        │
//! │  │ - Remove                │        │                         │        │
//! │  └────────────┬────────────┘        └────────────┬────────────┘        │
//! │               │                                  │                     │
//! │               ▼                                  ▼                     │
//! │  ┌─────────────────────────┐        ┌─────────────────────────┐        │
//! │  │        Storage          │        │         Crypto          │        │
//! │  │                         │        │                         │        │
//! │  │ - KeyStore trait        │        │ - RSA-OAEP-2048         │        │
//! │  │ - Memory / SQLite       │        │ - AES-CBC / AES-GCM     │        │
//! │  │                         │        │ - Password envelope     │        │
//! │  │                         │        │ - Password hashing      │        │
//! │  └─────────────────────────┘        └────────────┬────────────┘        │
//! │                                                  │                     │
//! │                                                  ▼                     │
//! │                                     ┌─────────────────────────┐        │
//! │                                     │          Codec          │        │
//! │                                     │ hex, base64, JSON noise │        │
//! │                                     └─────────────────────────┘        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`codec`] - Byte/string conversions and noise framing
//! - [`crypto`] - Ciphers, RSA keys, password envelope and hashing
//! - [`storage`] - Persistent key records
//! - [`session`] - Key-pair lifecycle per access path
//! - [`envelope`] - Hybrid object encryption
//! - [`config`] - Store and session configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use ceph_core::{CephConfig, Decrypted};
//!
//! let mut session = CephConfig::default().open_session("alice").await?;
//! session.generate_key_pair(Some("export password")).await?;
//!
//! let envelope = session.encrypt_object(&serde_json::json!({ "hello": "world" })).await?;
//! let value: Decrypted<serde_json::Value> =
//!     session.decrypt_object(&envelope.key, &envelope.message).await?;
//! ```
//!
//! ## Failure Model
//!
//! A wrong password or a ciphertext for another key-pair is an expected
//! outcome of decrypting. Decrypt operations report it as
//! [`Decrypted::AuthenticationFailed`]; bad calls and broken formats are
//! [`Error`]s.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod session;
pub mod storage;

pub use config::CephConfig;
pub use crypto::{CipherVersion, Decrypted, PasswordEncoding};
pub use envelope::EnvelopeMessage;
pub use error::{Error, ErrorKind, Result};
pub use session::{CryptoSession, KeyState, SharedSession};
pub use storage::{KeyRecord, KeyStore, MemoryKeyStore, SqliteKeyStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let mut alice = CephConfig::default().open_session("alice").await.unwrap();
        alice.generate_key_pair(Some("pw")).await.unwrap();

        let mut bob = CephConfig::default().open_session("bob").await.unwrap();
        bob.import_public_key(alice.public_key_string().unwrap())
            .await
            .unwrap();

        let envelope = bob
            .encrypt_object(&serde_json::json!({ "msg": "hi alice" }))
            .await
            .unwrap();
        let opened: Decrypted<serde_json::Value> = alice
            .decrypt_object(&envelope.key, &envelope.message)
            .await
            .unwrap();
        assert_eq!(opened.value().unwrap()["msg"], "hi alice");
    }
}
