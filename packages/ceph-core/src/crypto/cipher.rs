//! # Versioned Symmetric Cipher
//!
//! Every envelope records which cipher produced it as a small integer tag.
//!
//! | Version | Algorithm   | Key     | IV       | Integrity |
//! |---------|-------------|---------|----------|-----------|
//! | 1       | AES-256-CBC | 32 B    | 16 B     | none (PKCS#7 padding only) |
//! | 2       | AES-256-GCM | 32 B    | 12 B     | 128-bit tag |
//!
//! Version 1 is written without a tag (`"<body>"`); version 2 and later as
//! `"<version>$<body>"`. A string with no numeric tag is read as version 1.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::random_bytes;
use crate::codec;
use crate::error::{Error, Result};

/// Size of every symmetric key in bytes (256 bits)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher selected by an envelope's version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CipherVersion {
    /// AES-256-CBC (legacy, unauthenticated)
    AesCbc,
    /// AES-256-GCM
    #[default]
    AesGcm,
}

impl CipherVersion {
    /// Numeric tag written on the wire
    pub const fn tag(self) -> u32 {
        match self {
            CipherVersion::AesCbc => 1,
            CipherVersion::AesGcm => 2,
        }
    }

    /// Look up a version by its tag
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            1 => Ok(CipherVersion::AesCbc),
            2 => Ok(CipherVersion::AesGcm),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// IV length in bytes
    pub const fn iv_len(self) -> usize {
        match self {
            CipherVersion::AesCbc => 16,
            CipherVersion::AesGcm => 12,
        }
    }

    /// Key length in bytes
    pub const fn key_len(self) -> usize {
        SYMMETRIC_KEY_SIZE
    }

    /// Generate a random IV of the right length
    pub fn generate_iv(self) -> Result<Vec<u8>> {
        random_bytes(self.iv_len())
    }

    /// Prefix `body` with this version's tag (version 1 carries none)
    pub fn tag_body(self, body: &str) -> String {
        match self {
            CipherVersion::AesCbc => body.to_string(),
            other => format!("{}${}", other.tag(), body),
        }
    }

    /// Split an optional `"<n>$"` tag off an encoded envelope
    ///
    /// Without a numeric tag the whole string is the body and the version is
    /// 1. A numeric tag naming an unknown version is an error.
    pub fn split_tagged(encoded: &str) -> Result<(Self, &str)> {
        match encoded.split_once('$') {
            Some((tag, body)) if !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_digit()) => {
                let tag: u32 = tag
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("version tag out of range: {tag}")))?;
                Ok((Self::from_tag(tag)?, body))
            }
            _ => Ok((CipherVersion::AesCbc, encoded)),
        }
    }
}

impl TryFrom<u32> for CipherVersion {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        Self::from_tag(tag)
    }
}

impl From<CipherVersion> for u32 {
    fn from(version: CipherVersion) -> u32 {
        version.tag()
    }
}

impl fmt::Display for CipherVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A 256-bit AES key
///
/// Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Generate a random key
    pub fn generate() -> Result<Self> {
        let bytes = random_bytes(SYMMETRIC_KEY_SIZE)?;
        Self::from_slice(&bytes)
    }

    /// Create from raw key bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "symmetric key must be {} bytes, got {}",
                SYMMETRIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Derive a key by repeating the password's byte values
    ///
    /// ## Security Warning
    ///
    /// This is not a key-derivation function: no salt, no iterations, and
    /// the key space is limited to the password's characters. It exists to
    /// stay compatible with `$ceph1-priv$` exports. Do not use it for new
    /// formats.
    pub fn from_password(password: &str) -> Result<Self> {
        let bytes = codec::from_ascii(password);
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("password must not be empty".into()));
        }

        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        for (i, b) in key.iter_mut().enumerate() {
            *b = bytes[i % bytes.len()];
        }
        Ok(Self(key))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

fn check_iv(version: CipherVersion, iv: &[u8]) -> Result<()> {
    if iv.len() != version.iv_len() {
        return Err(Error::InvalidArgument(format!(
            "version {} needs a {}-byte IV, got {}",
            version,
            version.iv_len(),
            iv.len()
        )));
    }
    Ok(())
}

/// Encrypt `plaintext` with the cipher named by `version`
pub fn encrypt(
    version: CipherVersion,
    key: &SymmetricKey,
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    check_iv(version, iv)?;

    match version {
        CipherVersion::AesGcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;
            cipher
                .encrypt(AesNonce::from_slice(iv), plaintext)
                .map_err(|e| Error::EncryptionFailed(format!("AES-GCM: {}", e)))
        }
        CipherVersion::AesCbc => {
            let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
                .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
    }
}

/// Decrypt `ciphertext` with the cipher named by `version`
///
/// ## Errors
///
/// Returns `DecryptionFailed` when the GCM tag does not verify or the CBC
/// padding is invalid, which is what a wrong key looks like.
pub fn decrypt(
    version: CipherVersion,
    key: &SymmetricKey,
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    check_iv(version, iv)?;

    match version {
        CipherVersion::AesGcm => {
            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;
            cipher.decrypt(AesNonce::from_slice(iv), ciphertext).map_err(|_| {
                Error::DecryptionFailed("authentication tag mismatch".into())
            })
        }
        CipherVersion::AesCbc => {
            let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
                .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| Error::DecryptionFailed("invalid padding".into()))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_table() {
        assert_eq!(CipherVersion::default(), CipherVersion::AesGcm);
        assert_eq!(CipherVersion::from_tag(1).unwrap().iv_len(), 16);
        assert_eq!(CipherVersion::from_tag(2).unwrap().iv_len(), 12);
        assert!(matches!(
            CipherVersion::from_tag(3),
            Err(Error::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn test_split_tagged() {
        assert_eq!(
            CipherVersion::split_tagged("2$abcd").unwrap(),
            (CipherVersion::AesGcm, "abcd")
        );
        assert_eq!(
            CipherVersion::split_tagged("abcd").unwrap(),
            (CipherVersion::AesCbc, "abcd")
        );
        // Base64 bodies never contain '$', a non-numeric prefix is body
        assert_eq!(
            CipherVersion::split_tagged("x$abcd").unwrap(),
            (CipherVersion::AesCbc, "x$abcd")
        );
        assert!(CipherVersion::split_tagged("9$abcd").is_err());
    }

    #[test]
    fn test_tag_body() {
        assert_eq!(CipherVersion::AesCbc.tag_body("ff"), "ff");
        assert_eq!(CipherVersion::AesGcm.tag_body("ff"), "2$ff");
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&CipherVersion::AesCbc).unwrap();
        assert_eq!(json, "1");
        let v: CipherVersion = serde_json::from_str("2").unwrap();
        assert_eq!(v, CipherVersion::AesGcm);
        assert!(serde_json::from_str::<CipherVersion>("7").is_err());
    }

    #[test]
    fn test_password_key_repeats_bytes() {
        let key = SymmetricKey::from_password("abc").unwrap();
        assert_eq!(&key.as_bytes()[..7], b"abcabca");
        assert_eq!(key.as_bytes()[31], b'b');
        assert!(SymmetricKey::from_password("").is_err());
    }

    #[test]
    fn test_round_trip_both_versions() {
        for version in [CipherVersion::AesCbc, CipherVersion::AesGcm] {
            let key = SymmetricKey::generate().unwrap();
            let iv = version.generate_iv().unwrap();

            let ciphertext = encrypt(version, &key, &iv, b"Hello, World!").unwrap();
            let plaintext = decrypt(version, &key, &iv, &ciphertext).unwrap();

            assert_eq!(plaintext, b"Hello, World!");
        }
    }

    #[test]
    fn test_gcm_wrong_key_fails() {
        let version = CipherVersion::AesGcm;
        let key = SymmetricKey::from_slice(&[42u8; 32]).unwrap();
        let other = SymmetricKey::from_slice(&[99u8; 32]).unwrap();
        let iv = version.generate_iv().unwrap();

        let ciphertext = encrypt(version, &key, &iv, b"secret").unwrap();
        assert!(matches!(
            decrypt(version, &other, &iv, &ciphertext),
            Err(Error::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_wrong_iv_length_is_an_argument_error() {
        let key = SymmetricKey::generate().unwrap();
        let result = encrypt(CipherVersion::AesGcm, &key, &[0u8; 16], b"x");
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
