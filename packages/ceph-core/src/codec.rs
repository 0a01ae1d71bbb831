//! # Byte Codec
//!
//! Conversions between byte buffers and the string forms used on the wire:
//! Latin-1 "ASCII" strings, lowercase hex, base64/base64url, and JSON
//! objects.
//!
//! ## Noise Framing
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NOISE-FRAMED PAYLOAD                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌──────────────┬───────────────────────────┬──────────────┐          │
//! │   │ noise 15..64 │  {"data":"..."}  (JSON)    │ noise 15..64 │          │
//! │   └──────────────┴───────────────────────────┴──────────────┘          │
//! │                                                                         │
//! │   Noise bytes never contain '{', '}' or 0x00 (replaced by ' '), so     │
//! │   the body is recovered as first '{' .. last '}'.                      │
//! │                                                                         │
//! │   Purpose: the ciphertext length no longer fingerprints the payload.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only top-level JSON objects survive framing. Arrays and primitives have
//! no braces to anchor on and fail in [`to_object`].

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crypto::random_bytes;
use crate::error::{Error, Result};

/// Minimum number of noise bytes on each side of a framed body
pub const NOISE_MIN: usize = 15;

/// Maximum number of noise bytes on each side of a framed body
pub const NOISE_MAX: usize = 64;

/// Byte substituted for reserved values inside noise
const NOISE_FILLER: u8 = b' ';

/// Standard alphabet, unpadded output, accepts input with or without padding
pub(crate) const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// BUFFERS
// ============================================================================

/// Concatenate buffers in order
pub fn concat(buffers: &[&[u8]]) -> Vec<u8> {
    let total = buffers.iter().map(|b| b.len()).sum();
    let mut out = Vec::with_capacity(total);
    for buffer in buffers {
        out.extend_from_slice(buffer);
    }
    out
}

/// Split a buffer at `cut`
///
/// A negative `cut` counts from the end. Out-of-range positions clamp to
/// the buffer bounds, so this never fails.
pub fn split_in_two(buffer: &[u8], cut: isize) -> (Vec<u8>, Vec<u8>) {
    let len = buffer.len() as isize;
    let pos = if cut < 0 { len + cut } else { cut };
    let pos = pos.clamp(0, len) as usize;
    let (left, right) = buffer.split_at(pos);
    (left.to_vec(), right.to_vec())
}

// ============================================================================
// ASCII / HEX / BASE64
// ============================================================================

/// Map each character to one byte
///
/// Code points above 255 keep only their low byte. Callers must pass
/// byte-representable strings for this to be invertible.
pub fn from_ascii(s: &str) -> Vec<u8> {
    s.chars().map(|c| (c as u32 & 0xFF) as u8).collect()
}

/// Map each byte to the code point of the same value
pub fn to_ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode a hex string (either case)
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(s)?)
}

/// Encode bytes as lowercase, zero-padded hex
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Encode bytes as padded standard base64
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, padding optional
pub fn from_base64(s: &str) -> Result<Vec<u8>> {
    Ok(STANDARD_LENIENT.decode(s)?)
}

/// Encode bytes as unpadded base64url (JWK integer encoding)
pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url
pub fn from_base64url(s: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(s)?)
}

// ============================================================================
// OBJECTS
// ============================================================================

/// Serialize `obj` to JSON bytes, optionally surrounded by random noise
pub fn from_object<T: Serialize + ?Sized>(obj: &T, add_noise: bool) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(obj)?;
    if !add_noise {
        return Ok(body);
    }

    let lengths = random_bytes(2)?;
    let span = NOISE_MAX - NOISE_MIN + 1;
    let before = noise(NOISE_MIN + lengths[0] as usize % span)?;
    let after = noise(NOISE_MIN + lengths[1] as usize % span)?;

    Ok(concat(&[&before, &body, &after]))
}

/// Parse the JSON object between the first `{` and the last `}`
pub fn to_object<T: DeserializeOwned>(buffer: &[u8]) -> Result<T> {
    let start = buffer.iter().position(|&b| b == b'{');
    let end = buffer.iter().rposition(|&b| b == b'}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_slice(&buffer[start..=end])
            .map_err(|e| Error::InvalidJson(e.to_string())),
        _ => Err(Error::MissingJsonBody),
    }
}

fn noise(len: usize) -> Result<Vec<u8>> {
    let mut bytes = random_bytes(len)?;
    for b in bytes.iter_mut() {
        if matches!(*b, b'{' | b'}' | 0) {
            *b = NOISE_FILLER;
        }
    }
    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_split_in_two() {
        let buf = [1u8, 2, 3, 4, 5];

        assert_eq!(split_in_two(&buf, 2), (vec![1, 2], vec![3, 4, 5]));
        assert_eq!(split_in_two(&buf, -2), (vec![1, 2, 3], vec![4, 5]));
        // Out of range clamps instead of failing
        assert_eq!(split_in_two(&buf, 99), (buf.to_vec(), vec![]));
        assert_eq!(split_in_two(&buf, -99), (vec![], buf.to_vec()));
    }

    #[test]
    fn test_ascii_truncates_wide_chars() {
        assert_eq!(from_ascii("A\u{ff}"), vec![0x41, 0xff]);
        assert_eq!(from_ascii("\u{141}"), vec![0x41]);
        assert_eq!(to_ascii(&[0x68, 0x69, 0xe9]), "hi\u{e9}");
    }

    #[test]
    fn test_hex() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xab]), "000fab");
        assert_eq!(from_hex("000FAB").unwrap(), vec![0x00, 0x0f, 0xab]);
        assert!(matches!(from_hex("abc"), Err(Error::InvalidHex(_))));
        assert!(matches!(from_hex("zz"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_base64_padding_is_optional() {
        let bytes = b"salt!";
        assert_eq!(from_base64(&to_base64(bytes)).unwrap(), bytes);
        assert_eq!(from_base64("c2FsdCE").unwrap(), bytes);
        assert!(from_base64("not base64!").is_err());
    }

    #[test]
    fn test_object_without_noise_is_plain_json() {
        let bytes = from_object(&json!({"a": 1}), false).unwrap();
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[test]
    fn test_object_with_noise() {
        let obj = json!({"data": "hello {world}", "n": [1, 2, 3]});
        let bytes = from_object(&obj, true).unwrap();
        let body_len = serde_json::to_vec(&obj).unwrap().len();

        assert!(bytes.len() >= body_len + 2 * NOISE_MIN);
        assert!(bytes.len() <= body_len + 2 * NOISE_MAX);

        let restored: Value = to_object(&bytes).unwrap();
        assert_eq!(restored, obj);
    }

    #[test]
    fn test_to_object_errors() {
        assert!(matches!(
            to_object::<Value>(b"no braces here"),
            Err(Error::MissingJsonBody)
        ));
        assert!(matches!(
            to_object::<Value>(b"}{"),
            Err(Error::MissingJsonBody)
        ));
        assert!(matches!(
            to_object::<Value>(b"xx{not json}xx"),
            Err(Error::InvalidJson(_))
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hex_is_stable(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
                let encoded = to_hex(&bytes);
                prop_assert_eq!(to_hex(&from_hex(&encoded).unwrap()), encoded);
            }

            #[test]
            fn ascii_preserves_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
                prop_assert_eq!(from_ascii(&to_ascii(&bytes)), bytes);
            }

            #[test]
            fn split_undoes_concat(
                a in proptest::collection::vec(any::<u8>(), 0..64),
                b in proptest::collection::vec(any::<u8>(), 0..64),
            ) {
                let joined = concat(&[&a, &b]);
                prop_assert_eq!(split_in_two(&joined, a.len() as isize), (a, b));
            }

            #[test]
            fn noise_framing_keeps_objects(s in ".*", n in any::<i64>(), noise in any::<bool>()) {
                let obj = json!({"data": s, "n": n});
                let bytes = from_object(&obj, noise).unwrap();
                let restored: Value = to_object(&bytes).unwrap();
                prop_assert_eq!(restored, obj);
            }
        }
    }
}
