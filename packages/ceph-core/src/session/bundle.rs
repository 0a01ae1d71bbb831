//! Key material held by a session, and its storage form.

use crate::crypto::{PrivateKeyHandle, PublicKeyHandle};
use crate::error::{Error, Result};
use crate::storage::{KeyRecord, StoredPrivateKey};

/// Which keys a session holds
///
/// A private key without its public half cannot be represented.
#[derive(Debug, Clone, Default)]
pub enum KeyState {
    /// No keys loaded
    #[default]
    Empty,
    /// Encrypt-only, e.g. a peer's imported public key
    PublicOnly {
        /// Encryption key
        public: PublicKeyHandle,
    },
    /// Both halves of a key-pair
    FullPair {
        /// Encryption key
        public: PublicKeyHandle,
        /// Decryption key
        private: PrivateKeyHandle,
    },
}

impl KeyState {
    /// Public key, if any
    pub fn public(&self) -> Option<&PublicKeyHandle> {
        match self {
            KeyState::Empty => None,
            KeyState::PublicOnly { public } | KeyState::FullPair { public, .. } => Some(public),
        }
    }

    /// Private key, if any
    pub fn private(&self) -> Option<&PrivateKeyHandle> {
        match self {
            KeyState::FullPair { private, .. } => Some(private),
            _ => None,
        }
    }
}

/// Keys plus their export strings
#[derive(Debug, Clone, Default)]
pub struct KeyBundle {
    state: KeyState,
    public_export: Option<String>,
    private_export: Option<String>,
}

impl KeyBundle {
    /// Bundle for a full key-pair
    pub fn full_pair(private: PrivateKeyHandle, private_export: Option<String>) -> Self {
        let public = private.public_key();
        Self {
            public_export: Some(public.to_key_string()),
            state: KeyState::FullPair { public, private },
            private_export,
        }
    }

    /// Bundle for a public key alone
    pub fn public_only(public: PublicKeyHandle) -> Self {
        Self {
            public_export: Some(public.to_key_string()),
            state: KeyState::PublicOnly { public },
            private_export: None,
        }
    }

    /// Current key state
    pub fn state(&self) -> &KeyState {
        &self.state
    }

    /// `$ceph1-publ$jwk$...`
    pub fn public_export(&self) -> Option<&str> {
        self.public_export.as_deref()
    }

    /// `$ceph1-priv$hex$...`
    pub fn private_export(&self) -> Option<&str> {
        self.private_export.as_deref()
    }

    /// Drop all keys and exports
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Storage form
    ///
    /// Returns `None` for an empty bundle.
    pub fn to_record(&self) -> Result<Option<KeyRecord>> {
        let Some(public) = self.state.public() else {
            return Ok(None);
        };

        let private_key = match self.state.private() {
            Some(private) => Some(StoredPrivateKey {
                pkcs8_hex: hex::encode(private.to_pkcs8_der()?.as_slice()),
                extractable: private.is_extractable(),
            }),
            None => None,
        };

        Ok(Some(KeyRecord {
            public_jwk: public.to_jwk(),
            private_key,
            public_export: public.to_key_string(),
            private_export: self.private_export.clone(),
        }))
    }

    /// Rebuild a bundle from its storage form
    ///
    /// ## Errors
    ///
    /// `StorageCorrupted` if any key fails to import or the private key does
    /// not belong to the stored public key.
    pub fn from_record(record: &KeyRecord) -> Result<Self> {
        let corrupt = |e: Error| Error::StorageCorrupted(e.to_string());

        let public = PublicKeyHandle::from_jwk(&record.public_jwk).map_err(corrupt)?;
        if public.to_key_string() != record.public_export {
            return Err(Error::StorageCorrupted(
                "public export does not match public key".into(),
            ));
        }

        let Some(stored) = &record.private_key else {
            return Ok(Self::public_only(public));
        };

        let der = zeroize::Zeroizing::new(
            hex::decode(&stored.pkcs8_hex).map_err(|e| corrupt(e.into()))?,
        );
        let private = PrivateKeyHandle::from_pkcs8_der(&der, stored.extractable).map_err(corrupt)?;
        if private.public_key() != public {
            return Err(Error::StorageCorrupted(
                "private key does not match public key".into(),
            ));
        }

        Ok(Self::full_pair(private, record.private_export.clone()))
    }
}
