//! # Crypto Session
//!
//! Owns one RSA key-pair, bound to an access path in a [`KeyStore`].
//!
//! ## Key Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY LIFECYCLE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                 import_public_key()                                    │
//! │        ┌───────────────────────────────────────┐                       │
//! │        │                                       ▼                       │
//! │  ┌───────────┐                          ┌──────────────┐               │
//! │  │   Empty   │                          │  PublicOnly  │               │
//! │  └─────┬─────┘                          └──────┬───────┘               │
//! │        │                                       │                       │
//! │        │  generate_key_pair()                  │ import_private_key()  │
//! │        │  import_private_key()                 │ load_key_pair()       │
//! │        │  load_key_pair()                      │                       │
//! │        ▼                                       ▼                       │
//! │  ┌──────────────────────────────────────────────────────┐              │
//! │  │                      FullPair                        │              │
//! │  │  public + private (non-extractable) + exports        │              │
//! │  └──────────────────────────────────────────────────────┘              │
//! │                                                                         │
//! │  remove_key_pair() or any failed import/load  ──►  Empty               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Export Strings
//!
//! | String           | Form                                          |
//! |------------------|-----------------------------------------------|
//! | Public key       | `$ceph1-publ$jwk$<n>`                         |
//! | Private export   | `$ceph1-priv$hex$2$<ivHex><cipherHex>`        |
//!
//! The private export exists only when an export password was supplied to
//! [`CryptoSession::generate_key_pair`] or recovered through
//! [`CryptoSession::import_private_key`].

mod bundle;

pub use bundle::{KeyBundle, KeyState};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt_data, encrypt_data, CipherVersion, Decrypted, Jwk, PrivateKeyHandle,
    PublicKeyHandle, PRIVATE_KEY_PREFIX,
};
use crate::envelope::{self, EnvelopeMessage};
use crate::error::{Error, Result};
use crate::storage::KeyStore;

/// A session shared between tasks
pub type SharedSession = Arc<tokio::sync::Mutex<CryptoSession>>;

/// Key-pair holder for one access path
///
/// Mutating calls take `&mut self`; share a session through
/// [`SharedSession`] to serialize them across tasks.
pub struct CryptoSession {
    store: Arc<dyn KeyStore>,
    access_path: String,
    bundle: KeyBundle,
    cipher_version: CipherVersion,
}

impl CryptoSession {
    /// Create an empty session for `access_path`
    pub fn new(store: Arc<dyn KeyStore>, access_path: impl Into<String>) -> Self {
        Self {
            store,
            access_path: access_path.into(),
            bundle: KeyBundle::default(),
            cipher_version: CipherVersion::default(),
        }
    }

    /// Use `version` for [`encrypt_object`](Self::encrypt_object)
    pub fn with_cipher_version(mut self, version: CipherVersion) -> Self {
        self.cipher_version = version;
        self
    }

    /// Wrap for sharing across tasks
    pub fn into_shared(self) -> SharedSession {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Key store path of this session
    pub fn access_path(&self) -> &str {
        &self.access_path
    }

    /// Cipher used for new envelopes
    pub fn cipher_version(&self) -> CipherVersion {
        self.cipher_version
    }

    /// Current key material
    pub fn bundle(&self) -> &KeyBundle {
        &self.bundle
    }

    /// Whether a public key is loaded
    pub fn has_public_key(&self) -> bool {
        self.bundle.state().public().is_some()
    }

    /// Whether both halves of a key-pair are loaded
    pub fn has_key_pair(&self) -> bool {
        self.bundle.state().private().is_some()
    }

    /// Public key, if loaded
    pub fn public_key(&self) -> Option<&PublicKeyHandle> {
        self.bundle.state().public()
    }

    /// `$ceph1-publ$jwk$...`
    pub fn public_key_string(&self) -> Option<&str> {
        self.bundle.public_export()
    }

    /// `$ceph1-priv$hex$...`, when the key-pair has an export password
    pub fn private_key_string(&self) -> Option<&str> {
        self.bundle.private_export()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Generate and persist a new RSA-OAEP-2048 key-pair
    ///
    /// With an export password the private JWK is encrypted into the private
    /// export string and the retained handle is made non-extractable.
    /// Without one the key is non-extractable from the start and cannot be
    /// recovered outside the key store.
    ///
    /// ## Errors
    ///
    /// `StorageNotInitialized` if the store is not ready, `InvalidArgument`
    /// for an empty export password.
    pub async fn generate_key_pair(&mut self, export_password: Option<&str>) -> Result<()> {
        self.require_store()?;
        if export_password == Some("") {
            return Err(Error::InvalidArgument("export password must not be empty".into()));
        }

        let (private, private_export) = match export_password {
            Some(password) => {
                let private = PrivateKeyHandle::generate(true)?;
                let jwk_json = Zeroizing::new(serde_json::to_string(&private.export_jwk()?)?);
                let export = encrypt_data(&jwk_json, password, CipherVersion::AesGcm).await?;
                (
                    private.into_non_extractable(),
                    Some(format!("{}{}", PRIVATE_KEY_PREFIX, export)),
                )
            }
            None => (PrivateKeyHandle::generate(false)?, None),
        };

        let bundle = KeyBundle::full_pair(private, private_export);
        self.persist(&bundle).await?;
        self.bundle = bundle;

        tracing::info!(
            "Generated key-pair for {} ({})",
            self.access_path,
            self.public_key_prefix()
        );
        Ok(())
    }

    /// Load the key-pair stored for this access path
    ///
    /// A missing record leaves the session empty and is not an error.
    ///
    /// ## Errors
    ///
    /// Store failures and `StorageCorrupted` for a record that does not
    /// import. The session is empty afterwards.
    pub async fn load_key_pair(&mut self) -> Result<()> {
        self.bundle.clear();

        let record = match self.store.read_item(&self.access_path).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No key-pair stored for {}", self.access_path);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Failed to read key-pair for {}: {}", self.access_path, e);
                return Err(e);
            }
        };

        match KeyBundle::from_record(&record) {
            Ok(bundle) => {
                self.bundle = bundle;
                tracing::info!(
                    "Loaded key-pair for {} ({})",
                    self.access_path,
                    self.public_key_prefix()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Stored key-pair for {} is unusable: {}", self.access_path, e);
                Err(e)
            }
        }
    }

    /// Replace the session keys with a peer's public key
    ///
    /// The session becomes encrypt-only. The stored record is left
    /// untouched.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for a missing `$ceph1-publ$jwk$` prefix,
    /// `InvalidKey` for an unusable modulus. The session is empty afterwards.
    pub async fn import_public_key(&mut self, key_string: &str) -> Result<()> {
        self.bundle.clear();

        let public = PublicKeyHandle::from_key_string(key_string).map_err(|e| {
            tracing::warn!("Rejected public key import for {}: {}", self.access_path, e);
            e
        })?;
        self.bundle = KeyBundle::public_only(public);

        tracing::info!(
            "Imported public key for {} ({})",
            self.access_path,
            self.public_key_prefix()
        );
        Ok(())
    }

    /// Restore a key-pair from its private export string
    ///
    /// Returns `Ok(false)` and leaves the session empty when the password is
    /// wrong or the export does not hold a private key.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for empty arguments or a missing
    /// `$ceph1-priv$hex$` prefix, `StorageNotInitialized` if the store is not
    /// ready.
    pub async fn import_private_key(
        &mut self,
        export_string: &str,
        password: &str,
    ) -> Result<bool> {
        if export_string.is_empty() || password.is_empty() {
            return Err(Error::InvalidArgument(
                "export string and password must not be empty".into(),
            ));
        }
        let encoded = export_string.strip_prefix(PRIVATE_KEY_PREFIX).ok_or_else(|| {
            Error::InvalidArgument(format!("private key must start with {}", PRIVATE_KEY_PREFIX))
        })?;
        self.require_store()?;

        self.bundle.clear();

        let Some(jwk) = decrypt_private_jwk(encoded, password).await? else {
            tracing::warn!("Private key import for {} was rejected", self.access_path);
            return Ok(false);
        };

        let private = match PrivateKeyHandle::from_jwk(&jwk, false) {
            Ok(private) => private,
            Err(e) => {
                tracing::warn!("Private key import for {} failed: {}", self.access_path, e);
                return Ok(false);
            }
        };

        let bundle = KeyBundle::full_pair(private, Some(export_string.to_string()));
        self.persist(&bundle).await?;
        self.bundle = bundle;

        tracing::info!(
            "Imported key-pair for {} ({})",
            self.access_path,
            self.public_key_prefix()
        );
        Ok(true)
    }

    /// Check that `password` opens this session's private export
    ///
    /// The recovered key must also match the session's public key, so a
    /// password that decrypts some other export is rejected.
    pub async fn check_export_password(&self, password: &str) -> Result<bool> {
        if password.is_empty() {
            return Err(Error::InvalidArgument("password must not be empty".into()));
        }

        let (Some(export), Some(public)) = (self.bundle.private_export(), self.public_key())
        else {
            return Ok(false);
        };
        let Some(encoded) = export.strip_prefix(PRIVATE_KEY_PREFIX) else {
            return Ok(false);
        };

        Ok(match decrypt_private_jwk(encoded, password).await? {
            Some(jwk) => jwk.n == public.modulus(),
            None => false,
        })
    }

    /// Forget the key-pair and delete its stored record
    ///
    /// Removing an absent key-pair succeeds.
    pub async fn remove_key_pair(&mut self) -> Result<()> {
        self.bundle.clear();
        self.store.remove_item(&self.access_path).await?;
        tracing::info!("Removed key-pair for {}", self.access_path);
        Ok(())
    }

    // ========================================================================
    // ENVELOPES
    // ========================================================================

    /// Encrypt `object` for this session's public key
    ///
    /// ## Errors
    ///
    /// `NoPublicKey` if no key is loaded.
    pub async fn encrypt_object<T: Serialize + ?Sized>(&self, object: &T) -> Result<EnvelopeMessage> {
        let public = self.public_key().ok_or(Error::NoPublicKey)?;
        envelope::encrypt_object(public, object, self.cipher_version).await
    }

    /// Decrypt an envelope with this session's private key
    ///
    /// ## Errors
    ///
    /// `NoPrivateKey` if no key-pair is loaded, otherwise as
    /// [`envelope::decrypt_object`].
    pub async fn decrypt_object<T: DeserializeOwned>(
        &self,
        key: &str,
        message: &str,
    ) -> Result<Decrypted<T>> {
        let private = self.bundle.state().private().ok_or(Error::NoPrivateKey)?;
        envelope::decrypt_object(private, key, message).await
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn require_store(&self) -> Result<()> {
        if self.store.is_ready() {
            Ok(())
        } else {
            Err(Error::StorageNotInitialized)
        }
    }

    async fn persist(&self, bundle: &KeyBundle) -> Result<()> {
        match bundle.to_record()? {
            Some(record) => self.store.write_item(&self.access_path, &record).await,
            None => self.store.remove_item(&self.access_path).await,
        }
    }

    fn public_key_prefix(&self) -> String {
        self.public_key_string()
            .map(|s| s.chars().take(PUBLIC_KEY_LOG_CHARS).collect())
            .unwrap_or_default()
    }
}

/// Characters of the public key string shown in logs
const PUBLIC_KEY_LOG_CHARS: usize = 28;

/// Decrypt a private export body into a private JWK
///
/// `None` when the password is wrong or the payload is not a private JWK.
async fn decrypt_private_jwk(encoded: &str, password: &str) -> Result<Option<Jwk>> {
    let json = match decrypt_data(encoded, password).await? {
        Decrypted::Value(json) => Zeroizing::new(json),
        _ => return Ok(None),
    };

    Ok(serde_json::from_str::<Jwk>(&json)
        .ok()
        .filter(Jwk::is_private))
}

impl std::fmt::Debug for CryptoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoSession")
            .field("access_path", &self.access_path)
            .field("state", self.bundle.state())
            .field("cipher_version", &self.cipher_version)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
