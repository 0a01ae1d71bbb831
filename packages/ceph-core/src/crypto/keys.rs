//! # RSA Key Handles
//!
//! RSA-OAEP key material behind opaque handles, plus the JSON Web Key form
//! used for export and the canonical public key string.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  PublicKeyHandle  (encrypt only)                                │   │
//! │  │                                                                  │   │
//! │  │  • RSA 2048, e = 65537, OAEP with SHA-256                       │   │
//! │  │  • Identity: "$ceph1-publ$jwk$<n>"  (n = base64url modulus)     │   │
//! │  │  • Equal n ⇒ same key                                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  PrivateKeyHandle  (decrypt only)                               │   │
//! │  │                                                                  │   │
//! │  │  • extractable = true   → export_jwk() allowed                  │   │
//! │  │  • extractable = false  → key material never leaves the handle  │   │
//! │  │  • Zeroized on drop                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::codec;
use crate::error::{Error, Result};

/// RSA modulus size in bits
pub const RSA_KEY_BITS: usize = 2048;

/// Prefix of the canonical public key string
pub const PUBLIC_KEY_PREFIX: &str = "$ceph1-publ$jwk$";

/// Prefix of a password-protected private key export
pub const PRIVATE_KEY_PREFIX: &str = "$ceph1-priv$hex$";

/// JWK `alg` for RSA-OAEP with SHA-256
const JWK_ALG: &str = "RSA-OAEP-256";

/// JWK `e` for 65537
const JWK_EXPONENT: &str = "AQAB";

/// RSA JSON Web Key
///
/// Private members are zeroized when the value drops.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA"
    pub kty: String,
    /// Algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Modulus (base64url)
    pub n: String,
    /// Public exponent (base64url)
    pub e: String,
    /// Private exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// First prime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second prime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// d mod (p - 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// d mod (q - 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// q^-1 mod p
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    /// Extractable flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    /// Permitted operations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
}

impl Jwk {
    /// Public JWK for an RSA-OAEP-256 modulus with e = 65537
    pub fn public_from_modulus(n: &str) -> Self {
        Self {
            kty: "RSA".into(),
            alg: Some(JWK_ALG.into()),
            n: n.to_string(),
            e: JWK_EXPONENT.into(),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            ext: Some(true),
            key_ops: vec!["encrypt".into()],
        }
    }

    /// Whether private members are present
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }
}

impl Drop for Jwk {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.qi.zeroize();
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("private", &self.is_private())
            .finish()
    }
}

fn decode_uint(field: &str, value: &str) -> Result<BigUint> {
    let bytes = codec::from_base64url(value)
        .map_err(|e| Error::InvalidKey(format!("JWK member {}: {}", field, e)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::InvalidKey(format!("JWK is missing member {}", field)))
}

fn encode_uint(value: &BigUint) -> String {
    codec::to_base64url(&value.to_bytes_be())
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

/// RSA-OAEP public key, usable for encryption only
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyHandle {
    key: RsaPublicKey,
}

impl PublicKeyHandle {
    /// Import a public JWK
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "RSA" {
            return Err(Error::InvalidKey(format!("unsupported kty {}", jwk.kty)));
        }
        let n = decode_uint("n", &jwk.n)?;
        let e = decode_uint("e", &jwk.e)?;
        let key = RsaPublicKey::new(n, e).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Import a `$ceph1-publ$jwk$<n>` string
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the prefix is missing, `InvalidKey` if the
    /// modulus is not a usable RSA key.
    pub fn from_key_string(key_string: &str) -> Result<Self> {
        let n = key_string
            .strip_prefix(PUBLIC_KEY_PREFIX)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("public key must start with {}", PUBLIC_KEY_PREFIX))
            })?;
        Self::from_jwk(&Jwk::public_from_modulus(n))
    }

    /// Public JWK form
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = Jwk::public_from_modulus(&self.modulus());
        jwk.e = encode_uint(self.key.e());
        jwk
    }

    /// Modulus as unpadded base64url
    pub fn modulus(&self) -> String {
        encode_uint(self.key.n())
    }

    /// Canonical `$ceph1-publ$jwk$<n>` string
    pub fn to_key_string(&self) -> String {
        format!("{}{}", PUBLIC_KEY_PREFIX, self.modulus())
    }

    /// RSA-OAEP-SHA256 encrypt
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), data)
            .map_err(|e| Error::EncryptionFailed(format!("RSA-OAEP: {}", e)))
    }
}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.modulus();
        write!(f, "PublicKeyHandle({}...)", &n[..n.len().min(12)])
    }
}

// ============================================================================
// PRIVATE KEY
// ============================================================================

/// RSA-OAEP private key, usable for decryption only
#[derive(Clone)]
pub struct PrivateKeyHandle {
    key: RsaPrivateKey,
    extractable: bool,
}

impl PrivateKeyHandle {
    /// Generate a fresh 2048-bit key
    pub fn generate(extractable: bool) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;
        Ok(Self { key, extractable })
    }

    /// Import a private JWK
    pub fn from_jwk(jwk: &Jwk, extractable: bool) -> Result<Self> {
        if jwk.kty != "RSA" {
            return Err(Error::InvalidKey(format!("unsupported kty {}", jwk.kty)));
        }

        let n = decode_uint("n", &jwk.n)?;
        let e = decode_uint("e", &jwk.e)?;
        let d = decode_uint("d", required("d", &jwk.d)?)?;
        let p = decode_uint("p", required("p", &jwk.p)?)?;
        let q = decode_uint("q", required("q", &jwk.q)?)?;

        let mut key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        key.validate()
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        key.precompute()
            .map_err(|e| Error::InvalidKey(e.to_string()))?;

        Ok(Self { key, extractable })
    }

    /// Whether [`export_jwk`](Self::export_jwk) is permitted
    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    /// Export the private JWK
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for a non-extractable handle.
    pub fn export_jwk(&self) -> Result<Jwk> {
        if !self.extractable {
            return Err(Error::InvalidArgument("private key is not extractable".into()));
        }

        let mut jwk = self.public_key().to_jwk();
        let primes = self.key.primes();
        jwk.d = Some(encode_uint(self.key.d()));
        jwk.p = primes.first().map(encode_uint);
        jwk.q = primes.get(1).map(encode_uint);
        jwk.dp = self.key.dp().map(encode_uint);
        jwk.dq = self.key.dq().map(encode_uint);
        jwk.qi = self
            .key
            .qinv()
            .map(|qi| codec::to_base64url(&qi.to_bytes_be().1));
        jwk.key_ops = vec!["decrypt".into()];
        Ok(jwk)
    }

    /// Re-import this key with exports disabled
    pub fn into_non_extractable(self) -> Self {
        Self {
            key: self.key,
            extractable: false,
        }
    }

    /// Public half of this key
    pub fn public_key(&self) -> PublicKeyHandle {
        PublicKeyHandle {
            key: self.key.to_public_key(),
        }
    }

    /// RSA-OAEP-SHA256 decrypt
    ///
    /// ## Errors
    ///
    /// `DecryptionFailed` when the ciphertext was not made for this key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.key
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|_| Error::DecryptionFailed("RSA-OAEP decryption error".into()))
    }

    /// PKCS#8 DER for the key store
    pub(crate) fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let doc = self
            .key
            .to_pkcs8_der()
            .map_err(|e| Error::Internal(format!("PKCS#8 encoding: {}", e)))?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    /// Restore from key store PKCS#8 DER
    pub(crate) fn from_pkcs8_der(der: &[u8], extractable: bool) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::InvalidKey(format!("PKCS#8 decoding: {}", e)))?;
        Ok(Self { key, extractable })
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyHandle")
            .field("public", &self.public_key())
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static KEY: Lazy<PrivateKeyHandle> = Lazy::new(|| PrivateKeyHandle::generate(true).unwrap());

    /// Shared extractable test key; generating RSA keys is slow
    pub(crate) fn test_key() -> PrivateKeyHandle {
        KEY.clone()
    }

    #[test]
    fn test_public_key_string() {
        let public = test_key().public_key();
        let s = public.to_key_string();

        assert!(s.starts_with(PUBLIC_KEY_PREFIX));
        assert!(!s.contains('='));
        assert_eq!(PublicKeyHandle::from_key_string(&s).unwrap(), public);
    }

    #[test]
    fn test_public_key_string_rejects_bad_prefix() {
        assert!(matches!(
            PublicKeyHandle::from_key_string("$ceph2-publ$jwk$AAAA"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            PublicKeyHandle::from_key_string(PUBLIC_KEY_PREFIX),
            Err(Error::InvalidArgument(_))
        ));
        assert!(PublicKeyHandle::from_key_string("$ceph1-publ$jwk$!!!").is_err());
    }

    #[test]
    fn test_jwk_export_import() {
        let key = test_key();
        let jwk = key.export_jwk().unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.e, "AQAB");
        assert_eq!(jwk.alg.as_deref(), Some("RSA-OAEP-256"));
        assert!(jwk.is_private());
        assert!(jwk.qi.is_some());

        let json = serde_json::to_string(&jwk).unwrap();
        let parsed: Jwk = serde_json::from_str(&json).unwrap();
        let restored = PrivateKeyHandle::from_jwk(&parsed, false).unwrap();

        assert_eq!(restored.public_key(), key.public_key());
        assert!(!restored.is_extractable());
    }

    #[test]
    fn test_non_extractable_refuses_export() {
        let key = test_key().into_non_extractable();
        assert!(matches!(key.export_jwk(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_public_jwk_cannot_be_imported_as_private() {
        let jwk = test_key().public_key().to_jwk();
        assert!(matches!(
            PrivateKeyHandle::from_jwk(&jwk, false),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_oaep_round_trip() {
        let key = test_key();
        let ciphertext = key.public_key().encrypt(b"wrapped key bytes").unwrap();
        assert_eq!(key.decrypt(&ciphertext).unwrap(), b"wrapped key bytes");

        let mut tampered = ciphertext.clone();
        tampered[0] ^= 0xFF;
        assert!(matches!(key.decrypt(&tampered), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_pkcs8_round_trip() {
        let key = test_key();
        let der = key.to_pkcs8_der().unwrap();
        let restored = PrivateKeyHandle::from_pkcs8_der(&der, false).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
    }

    #[test]
    fn test_debug_does_not_leak() {
        let rendered = format!("{:?}", test_key().export_jwk().unwrap());
        assert!(rendered.contains("private: true"));
        assert!(!rendered.contains("\"d\""));
    }
}
