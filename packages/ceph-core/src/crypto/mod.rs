//! # Cryptography Module
//!
//! Cryptographic building blocks used by the key lifecycle and the hybrid
//! envelope.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  RSA-OAEP-2048 / SHA-256  (keys.rs)                             │   │
//! │  │  • Wraps per-message symmetric keys                             │   │
//! │  │  • Public identity: "$ceph1-publ$jwk$<n>"                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Versioned symmetric cipher  (cipher.rs)                        │   │
//! │  │  • v1: AES-256-CBC, 16-byte IV (legacy)                         │   │
//! │  │  • v2: AES-256-GCM, 12-byte IV (default)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Password envelope  (symmetric.rs)                              │   │
//! │  │  • Protects the exported private key                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Salted SHA-256 password hashing  (password.rs)                 │   │
//! │  │  • "$ceph1$<base64|hex>$<salt>$<hash>"                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: symmetric keys and stored private key bytes are
//!    zeroized when dropped
//! 2. **Secure Random**: all IVs, salts and keys come from `OsRng`
//! 3. **No Key Reuse**: every hybrid message gets a fresh symmetric key
//! 4. **Weak password KDF**: see [`symmetric`]. Kept for wire compatibility.

mod cipher;
mod keys;
pub mod password;
pub mod symmetric;

pub use cipher::{decrypt, encrypt, CipherVersion, SymmetricKey, SYMMETRIC_KEY_SIZE};
pub use keys::{
    Jwk, PrivateKeyHandle, PublicKeyHandle, PRIVATE_KEY_PREFIX, PUBLIC_KEY_PREFIX, RSA_KEY_BITS,
};
pub use password::{check_password, hash_password, query_password_salt, PasswordEncoding};
pub use symmetric::{decrypt_data, encrypt_data};

#[cfg(test)]
pub(crate) use keys::tests::test_key;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Fill a fresh buffer from the operating system CSPRNG
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomUnavailable(e.to_string()))?;
    Ok(bytes)
}

/// Outcome of a decryption attempt
///
/// A wrong key or password is an expected result of decrypting, so it is
/// reported here instead of through [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted<T> {
    /// Decryption and unwrapping succeeded
    Value(T),
    /// The cipher rejected the key, password or ciphertext
    AuthenticationFailed,
    /// The input could not be parsed into an envelope
    MalformedInput,
}

impl<T> Decrypted<T> {
    /// The decrypted value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Decrypted::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Whether decryption succeeded
    pub fn is_value(&self) -> bool {
        matches!(self, Decrypted::Value(_))
    }

    /// Map the decrypted value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Decrypted<U> {
        match self {
            Decrypted::Value(v) => Decrypted::Value(f(v)),
            Decrypted::AuthenticationFailed => Decrypted::AuthenticationFailed,
            Decrypted::MalformedInput => Decrypted::MalformedInput,
        }
    }
}
