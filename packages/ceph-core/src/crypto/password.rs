//! # Password Hashing
//!
//! Salted SHA-256 password hashes in a self-describing string:
//!
//! ```text
//! $ceph1$<encoding>$<salt>$<hash>
//!
//!   encoding  "base64" (unpadded) or "hex"
//!   salt      16 random bytes, encoded as above
//!   hash      SHA-256(password UTF-8 bytes ++ raw salt), encoded as above
//! ```
//!
//! Hashing is deterministic given the salt, so [`check_password`] simply
//! re-hashes with the salt it finds in the string.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use sha2::{Digest, Sha256};

use super::random_bytes;
use crate::codec::STANDARD_LENIENT;
use crate::error::{Error, Result};

/// Scheme marker at the start of every password hash
pub const PASSWORD_HASH_PREFIX: &str = "$ceph1$";

/// Size of a generated salt in bytes
pub const SALT_SIZE: usize = 16;

/// Encoding of the salt and hash components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordEncoding {
    /// Standard base64 without padding
    #[default]
    Base64,
    /// Lowercase hex
    Hex,
}

impl PasswordEncoding {
    /// Name used in the hash string
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordEncoding::Base64 => "base64",
            PasswordEncoding::Hex => "hex",
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            PasswordEncoding::Base64 => STANDARD_LENIENT.encode(bytes),
            PasswordEncoding::Hex => hex::encode(bytes),
        }
    }

    fn decode(&self, s: &str) -> Result<Vec<u8>> {
        match self {
            PasswordEncoding::Base64 => Ok(STANDARD_LENIENT.decode(s)?),
            PasswordEncoding::Hex => Ok(hex::decode(s)?),
        }
    }
}

impl FromStr for PasswordEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "base64" => Ok(PasswordEncoding::Base64),
            "hex" => Ok(PasswordEncoding::Hex),
            other => Err(Error::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for PasswordEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three components of a parsed hash string
struct ParsedHash<'a> {
    encoding: PasswordEncoding,
    salt: &'a str,
    hash: &'a str,
}

impl<'a> ParsedHash<'a> {
    fn parse(s: &'a str) -> Option<Self> {
        let rest = s.strip_prefix(PASSWORD_HASH_PREFIX)?;
        let mut parts = rest.split('$');
        let (encoding, salt, hash) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || salt.is_empty() || hash.is_empty() {
            return None;
        }
        Some(Self {
            encoding: encoding.parse().ok()?,
            salt,
            hash,
        })
    }
}

fn digest(password: &str, salt: &[u8]) -> [u8; 32] {
    Sha256::new()
        .chain_update(password.as_bytes())
        .chain_update(salt)
        .finalize()
        .into()
}

/// Hash a password with a fresh or supplied salt
///
/// `salt` must be in `encoding` when supplied; `None` draws 16 random
/// bytes.
///
/// ## Errors
///
/// `InvalidArgument` for an empty password, an empty salt, or a salt that
/// does not decode.
pub async fn hash_password(
    password: &str,
    salt: Option<&str>,
    encoding: PasswordEncoding,
) -> Result<String> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".into()));
    }

    let salt = match salt {
        None => random_bytes(SALT_SIZE)?,
        Some("") => return Err(Error::InvalidArgument("salt must not be empty".into())),
        Some(s) => encoding
            .decode(s)
            .map_err(|e| Error::InvalidArgument(format!("salt is not valid {}: {}", encoding, e)))?,
    };

    Ok(format!(
        "{}{}${}${}",
        PASSWORD_HASH_PREFIX,
        encoding,
        encoding.encode(&salt),
        encoding.encode(&digest(password, &salt))
    ))
}

/// Check a password against a hash string
///
/// ## Errors
///
/// `InvalidArgument` if `hash` is not a `$ceph1$` hash string or the
/// password is empty.
pub async fn check_password(password: &str, hash: &str) -> Result<bool> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".into()));
    }

    let parsed = ParsedHash::parse(hash)
        .ok_or_else(|| Error::InvalidArgument("not a $ceph1$ password hash".into()))?;

    let salt = parsed
        .encoding
        .decode(parsed.salt)
        .map_err(|e| Error::InvalidArgument(format!("salt: {}", e)))?;
    let expected = match parsed.encoding.decode(parsed.hash) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };

    Ok(expected == digest(password, &salt))
}

/// Extract the salt of a hash string, re-encoded as unpadded base64
///
/// Returns `None` if the string is malformed.
pub fn query_password_salt(hash: &str) -> Option<String> {
    let parsed = ParsedHash::parse(hash)?;
    let salt = parsed.encoding.decode(parsed.salt).ok()?;
    Some(PasswordEncoding::Base64.encode(&salt))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_check_both_encodings() {
        for encoding in [PasswordEncoding::Base64, PasswordEncoding::Hex] {
            let hash = hash_password("correct horse", None, encoding).await.unwrap();

            assert!(hash.starts_with(&format!("$ceph1${}$", encoding)));
            assert!(check_password("correct horse", &hash).await.unwrap());
            assert!(!check_password("battery staple", &hash).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_supplied_salt_reproduces_hash() {
        for encoding in [PasswordEncoding::Base64, PasswordEncoding::Hex] {
            let first = hash_password("pw", None, encoding).await.unwrap();
            let salt = first.split('$').nth(3).unwrap();

            let second = hash_password("pw", Some(salt), encoding).await.unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_known_vector() {
        // SHA-256("abc" ++ 0x00 * 16)
        let salt = hex::encode([0u8; SALT_SIZE]);
        let hash = hash_password("abc", Some(&salt), PasswordEncoding::Hex)
            .await
            .unwrap();

        let mut input = b"abc".to_vec();
        input.extend_from_slice(&[0u8; SALT_SIZE]);
        let expected = hex::encode(Sha256::digest(&input));

        assert_eq!(hash, format!("$ceph1$hex${}${}", salt, expected));
    }

    #[tokio::test]
    async fn test_base64_output_is_unpadded() {
        let hash = hash_password("pw", None, PasswordEncoding::Base64)
            .await
            .unwrap();
        assert!(!hash.contains('='));

        // Padded salts are still accepted on input
        let padded = format!("{}==", hash.split('$').nth(3).unwrap());
        let again = hash_password("pw", Some(&padded), PasswordEncoding::Base64)
            .await
            .unwrap();
        assert_eq!(again, hash);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let enc = PasswordEncoding::Hex;
        assert!(matches!(
            hash_password("", None, enc).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            hash_password("pw", Some(""), enc).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            hash_password("pw", Some("xyz"), enc).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            check_password("pw", "$ceph1$hex$only-two").await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            check_password("pw", "plain text").await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("hex".parse::<PasswordEncoding>().unwrap(), PasswordEncoding::Hex);
        assert!(matches!(
            "utf7".parse::<PasswordEncoding>(),
            Err(Error::UnsupportedEncoding(_))
        ));
    }

    #[tokio::test]
    async fn test_query_password_salt() {
        let salt_hex = hex::encode([7u8; SALT_SIZE]);
        let hash = hash_password("pw", Some(&salt_hex), PasswordEncoding::Hex)
            .await
            .unwrap();

        let salt_b64 = query_password_salt(&hash).unwrap();
        assert_eq!(STANDARD_LENIENT.decode(&salt_b64).unwrap(), [7u8; SALT_SIZE]);

        assert_eq!(query_password_salt("$ceph1$rot13$a$b"), None);
        assert_eq!(query_password_salt("garbage"), None);
    }
}
