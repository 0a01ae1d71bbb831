//! # Hybrid Object Envelope
//!
//! Encrypts a serializable object for the holder of an RSA key-pair.
//!
//! ## Envelope Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       ENVELOPE FLOW                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender (public key)                                                   │
//! │  ───────────────────                                                    │
//! │                                                                         │
//! │  1. body = noise ++ json(object) ++ noise                              │
//! │  2. key  = 32 random bytes,  iv = random (16 B v1 / 12 B v2)           │
//! │  3. ct   = cipher_v(key, iv, body)                                     │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │  message = "<v>$" ++ base64(ct)        (bare base64 for v1)   │     │
//! │  │  key     = base64(RSA-OAEP(iv ++ key))                        │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Recipient (private key)                                               │
//! │  ───────────────────────                                                │
//! │                                                                         │
//! │  1. iv ++ key = RSA-OAEP⁻¹(base64⁻¹(key))                              │
//! │  2. v, ct     = split optional tag off message                         │
//! │  3. object    = json(cipher_v⁻¹(key, iv, ct))                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every message gets a fresh symmetric key, so no key is ever reused.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::codec;
use crate::crypto::{
    self, CipherVersion, Decrypted, PrivateKeyHandle, PublicKeyHandle, SymmetricKey,
    SYMMETRIC_KEY_SIZE,
};
use crate::error::{Error, Result};

/// An encrypted object as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMessage {
    /// Version-tagged base64 ciphertext
    pub message: String,
    /// Base64 RSA-wrapped `iv ++ key`
    pub key: String,
}

/// Encrypt `object` for the holder of `public`
pub async fn encrypt_object<T: Serialize + ?Sized>(
    public: &PublicKeyHandle,
    object: &T,
    version: CipherVersion,
) -> Result<EnvelopeMessage> {
    let body = Zeroizing::new(codec::from_object(object, true)?);
    let key = SymmetricKey::generate()?;
    let iv = version.generate_iv()?;

    let ciphertext = crypto::encrypt(version, &key, &iv, &body)?;
    let wrapped = Zeroizing::new(codec::concat(&[iv.as_slice(), key.as_bytes().as_slice()]));
    let wrapped_key = public.encrypt(&wrapped)?;

    tracing::debug!(
        "Encrypted {} byte envelope (version {})",
        ciphertext.len(),
        version
    );

    Ok(EnvelopeMessage {
        message: version.tag_body(&codec::to_base64(&ciphertext)),
        key: codec::to_base64(&wrapped_key),
    })
}

/// Decrypt an envelope with `private`
///
/// A key blob that was not wrapped for this key-pair, and a ciphertext the
/// cipher rejects, both come back as [`Decrypted::AuthenticationFailed`].
///
/// ## Errors
///
/// Bad base64, an unknown version tag, a wrapped key of the wrong length or
/// a payload that does not parse as `T`.
pub async fn decrypt_object<T: DeserializeOwned>(
    private: &PrivateKeyHandle,
    key: &str,
    message: &str,
) -> Result<Decrypted<T>> {
    if key.is_empty() || message.is_empty() {
        return Err(Error::InvalidArgument("key and message must not be empty".into()));
    }

    let wrapped_key = codec::from_base64(key)?;
    let wrapped = match private.decrypt(&wrapped_key) {
        Ok(wrapped) => Zeroizing::new(wrapped),
        Err(Error::DecryptionFailed(_)) => return Ok(Decrypted::AuthenticationFailed),
        Err(e) => return Err(e),
    };

    let (version, body) = CipherVersion::split_tagged(message)?;
    if wrapped.len() != version.iv_len() + SYMMETRIC_KEY_SIZE {
        return Err(Error::InvalidKey(format!(
            "wrapped key is {} bytes, version {} needs {}",
            wrapped.len(),
            version,
            version.iv_len() + SYMMETRIC_KEY_SIZE
        )));
    }

    let (iv, raw_key) = codec::split_in_two(&wrapped, version.iv_len() as isize);
    let raw_key = Zeroizing::new(raw_key);
    let symmetric = SymmetricKey::from_slice(&raw_key)?;
    let ciphertext = codec::from_base64(body)?;

    let plaintext = match crypto::decrypt(version, &symmetric, &iv, &ciphertext) {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(Error::DecryptionFailed(_)) => return Ok(Decrypted::AuthenticationFailed),
        Err(e) => return Err(e),
    };

    Ok(Decrypted::Value(codec::to_object(&plaintext)?))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_key;
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};

    static OTHER_KEY: Lazy<PrivateKeyHandle> =
        Lazy::new(|| PrivateKeyHandle::generate(false).unwrap());

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        tags: Vec<String>,
        pinned: bool,
    }

    #[tokio::test]
    async fn test_round_trip_both_versions() {
        let private = test_key();
        let public = private.public_key();
        let note = Note {
            title: "groceries {and} more".into(),
            tags: vec!["home".into(), "}".into()],
            pinned: true,
        };

        for version in [CipherVersion::AesCbc, CipherVersion::AesGcm] {
            let envelope = encrypt_object(&public, &note, version).await.unwrap();
            let decrypted: Decrypted<Note> =
                decrypt_object(&private, &envelope.key, &envelope.message)
                    .await
                    .unwrap();
            assert_eq!(decrypted.value().unwrap(), note);
        }
    }

    #[tokio::test]
    async fn test_message_tagging() {
        let public = test_key().public_key();
        let obj = json!({ "a": 1 });

        let v2 = encrypt_object(&public, &obj, CipherVersion::AesGcm).await.unwrap();
        assert!(v2.message.starts_with("2$"));

        let v1 = encrypt_object(&public, &obj, CipherVersion::AesCbc).await.unwrap();
        assert!(!v1.message.contains('$'));
    }

    #[tokio::test]
    async fn test_wrong_key_pair() {
        let public = test_key().public_key();
        let envelope = encrypt_object(&public, &json!({ "secret": true }), CipherVersion::AesGcm)
            .await
            .unwrap();

        let decrypted: Decrypted<Value> =
            decrypt_object(&OTHER_KEY, &envelope.key, &envelope.message)
                .await
                .unwrap();
        assert_eq!(decrypted, Decrypted::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_tampered_message() {
        let private = test_key();
        let envelope = encrypt_object(&private.public_key(), &json!({ "n": 42 }), CipherVersion::AesGcm)
            .await
            .unwrap();

        let mut ciphertext = codec::from_base64(&envelope.message[2..]).unwrap();
        ciphertext[0] ^= 0x01;
        let tampered = format!("2${}", codec::to_base64(&ciphertext));

        let decrypted: Decrypted<Value> = decrypt_object(&private, &envelope.key, &tampered)
            .await
            .unwrap();
        assert_eq!(decrypted, Decrypted::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_an_error() {
        let private = test_key();
        let envelope = encrypt_object(&private.public_key(), &json!({}), CipherVersion::AesGcm)
            .await
            .unwrap();

        // A v2 key blob carries a 12-byte IV; reading the body as v1 wants 16
        let untagged = &envelope.message[2..];
        let result: Result<Decrypted<Value>> =
            decrypt_object(&private, &envelope.key, untagged).await;
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_format_errors_propagate() {
        let private = test_key();
        let result: Result<Decrypted<Value>> = decrypt_object(&private, "@@@", "2$AAAA").await;
        assert!(matches!(result, Err(Error::InvalidBase64(_))));

        let result: Result<Decrypted<Value>> = decrypt_object(&private, "", "2$AAAA").await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_envelope_serde() {
        let envelope = EnvelopeMessage {
            message: "2$AAAA".into(),
            key: "BBBB".into(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"message":"2$AAAA","key":"BBBB"}"#);
    }
}
