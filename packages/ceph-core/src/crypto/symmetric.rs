//! # Password Envelope
//!
//! Encrypts a string under a password. Used to protect the exported
//! private key (`$ceph1-priv$hex$...`), and usable directly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         encrypt_data()                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. key   = password bytes repeated to 32 bytes                        │
//! │  2. iv    = random (16 B for v1, 12 B for v2)                          │
//! │  3. body  = noise ++ {"data": plaintext} ++ noise                      │
//! │  4. out   = "<version>$" ++ hex(iv) ++ hex(cipher(key, iv, body))      │
//! │             (no "<version>$" prefix for v1)                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Warning
//!
//! The key derivation is byte repetition, not a KDF. It is kept so existing
//! exports keep decrypting. New formats should use a salted, iterated KDF.

use serde_json::{json, Value};

use super::cipher::{self, CipherVersion, SymmetricKey};
use super::Decrypted;
use crate::codec;
use crate::error::{Error, Result};

/// Encrypt `plaintext` under `password`
///
/// ## Errors
///
/// `InvalidArgument` for an empty password, `RandomUnavailable` if no IV
/// can be drawn.
pub async fn encrypt_data(
    plaintext: &str,
    password: &str,
    version: CipherVersion,
) -> Result<String> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".into()));
    }

    let key = SymmetricKey::from_password(password)?;
    let iv = version.generate_iv()?;
    let body = codec::from_object(&json!({ "data": plaintext }), true)?;
    let ciphertext = cipher::encrypt(version, &key, &iv, &body)?;

    Ok(version.tag_body(&format!(
        "{}{}",
        codec::to_hex(&iv),
        codec::to_hex(&ciphertext)
    )))
}

/// Decrypt an envelope produced by [`encrypt_data`]
///
/// A wrong password and a damaged envelope are both ordinary outcomes and
/// come back as [`Decrypted::AuthenticationFailed`] or
/// [`Decrypted::MalformedInput`]. Only empty arguments are errors.
///
/// Version 1 (AES-CBC) has no authentication tag, so a wrong password is
/// usually caught by the padding check and otherwise by the JSON unwrap;
/// both report `AuthenticationFailed`.
pub async fn decrypt_data(encoded: &str, password: &str) -> Result<Decrypted<String>> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".into()));
    }
    if encoded.is_empty() {
        return Err(Error::InvalidArgument("nothing to decrypt".into()));
    }

    let (version, body) = match CipherVersion::split_tagged(encoded) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Rejecting envelope: {}", e);
            return Ok(Decrypted::MalformedInput);
        }
    };

    let bytes = match codec::from_hex(body) {
        Ok(bytes) if bytes.len() > version.iv_len() => bytes,
        _ => return Ok(Decrypted::MalformedInput),
    };
    let (iv, ciphertext) = codec::split_in_two(&bytes, version.iv_len() as isize);

    let key = SymmetricKey::from_password(password)?;
    let plaintext = match cipher::decrypt(version, &key, &iv, &ciphertext) {
        Ok(plaintext) => plaintext,
        Err(Error::DecryptionFailed(_)) => return Ok(Decrypted::AuthenticationFailed),
        Err(e) => return Err(e),
    };

    let unwrapped: Value = match codec::to_object(&plaintext) {
        Ok(value) => value,
        Err(_) => return Ok(Decrypted::AuthenticationFailed),
    };

    match unwrapped.get("data") {
        Some(Value::String(data)) => Ok(Decrypted::Value(data.clone())),
        _ => Ok(Decrypted::MalformedInput),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_both_versions() {
        for version in [CipherVersion::AesCbc, CipherVersion::AesGcm] {
            let encoded = encrypt_data("top secret", "hunter2", version).await.unwrap();
            let decrypted = decrypt_data(&encoded, "hunter2").await.unwrap();
            assert_eq!(decrypted, Decrypted::Value("top secret".to_string()));
        }
    }

    #[tokio::test]
    async fn test_output_layout() {
        let v2 = encrypt_data("x", "pw", CipherVersion::AesGcm).await.unwrap();
        let (tag, body) = v2.split_once('$').unwrap();
        assert_eq!(tag, "2");
        assert!(body.bytes().all(|b| b.is_ascii_hexdigit()));
        // IV + at least the noise framing + GCM tag
        assert!(body.len() >= 2 * (12 + 2 * codec::NOISE_MIN + 16));

        let v1 = encrypt_data("x", "pw", CipherVersion::AesCbc).await.unwrap();
        assert!(!v1.contains('$'));
    }

    #[tokio::test]
    async fn test_same_input_encrypts_differently() {
        let a = encrypt_data("same", "pw", CipherVersion::AesGcm).await.unwrap();
        let b = encrypt_data("same", "pw", CipherVersion::AesGcm).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_an_error() {
        for version in [CipherVersion::AesCbc, CipherVersion::AesGcm] {
            let encoded = encrypt_data("top secret", "hunter2", version).await.unwrap();
            let decrypted = decrypt_data(&encoded, "hunter3").await.unwrap();
            assert!(!decrypted.is_value());
        }
    }

    #[tokio::test]
    async fn test_malformed_input() {
        assert_eq!(
            decrypt_data("2$nothex", "pw").await.unwrap(),
            Decrypted::MalformedInput
        );
        assert_eq!(
            decrypt_data("2$00ff", "pw").await.unwrap(),
            Decrypted::MalformedInput
        );
        assert_eq!(
            decrypt_data("9$00ff", "pw").await.unwrap(),
            Decrypted::MalformedInput
        );
    }

    #[tokio::test]
    async fn test_tampered_ciphertext() {
        let encoded = encrypt_data("payload", "pw", CipherVersion::AesGcm).await.unwrap();
        let last = encoded.chars().last().unwrap();
        let flipped = if last == '0' { '1' } else { '0' };
        let tampered = format!("{}{}", &encoded[..encoded.len() - 1], flipped);

        assert_eq!(
            decrypt_data(&tampered, "pw").await.unwrap(),
            Decrypted::AuthenticationFailed
        );
    }

    #[tokio::test]
    async fn test_empty_arguments_are_errors() {
        assert!(encrypt_data("x", "", CipherVersion::AesGcm).await.is_err());
        assert!(decrypt_data("", "pw").await.is_err());
        assert!(decrypt_data("2$00", "").await.is_err());
    }
}
