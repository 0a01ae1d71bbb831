//! # Error Handling
//!
//! Error types for ceph-core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Argument Errors (always surface to the caller)                    │
//! │  │   ├── InvalidArgument       - Malformed or missing input            │
//! │  │   ├── UnsupportedEncoding   - Unknown password hash encoding        │
//! │  │   └── UnsupportedVersion    - Unknown cipher version                │
//! │  │                                                                      │
//! │  ├── Availability Errors                                               │
//! │  │   ├── RandomUnavailable     - No secure random source               │
//! │  │   ├── StorageNotInitialized - Key store not initialized             │
//! │  │   ├── NoPublicKey           - Session holds no public key           │
//! │  │   └── NoPrivateKey          - Session holds no private key          │
//! │  │                                                                      │
//! │  ├── Format Errors                                                     │
//! │  │   ├── InvalidHex            - Bad hexadecimal string                │
//! │  │   ├── InvalidBase64         - Bad base64 string                     │
//! │  │   ├── MissingJsonBody       - No {...} region in a buffer           │
//! │  │   ├── InvalidJson           - {...} region is not valid JSON        │
//! │  │   └── InvalidKey            - Key material cannot be imported       │
//! │  │                                                                      │
//! │  ├── Operation Failures (absorbed by decrypt paths)                    │
//! │  │   ├── EncryptionFailed                                              │
//! │  │   ├── DecryptionFailed                                              │
//! │  │   └── KeyGenerationFailed                                           │
//! │  │                                                                      │
//! │  └── Storage Errors                                                    │
//! │      ├── StorageReadError / StorageWriteError                          │
//! │      ├── StorageCorrupted                                              │
//! │      └── DatabaseError                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption paths never return `DecryptionFailed` for a wrong key or
//! password. They report it as a value through
//! [`Decrypted`](crate::crypto::Decrypted) instead.

use thiserror::Error;

/// Result type alias for ceph-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input
    InvalidArgument,
    /// A required collaborator is missing or uninitialized
    Unavailable,
    /// Malformed encoded string or byte layout
    Format,
    /// The cipher rejected the operation
    OperationFailure,
    /// Key store read/write failure
    Storage,
    /// Bug or unexpected state
    Internal,
}

/// Main error type for ceph-core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Argument Errors (100-199)
    // ========================================================================

    /// Malformed or missing input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Password hash encoding is not one of base64/hex
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Cipher version outside the known table
    #[error("Unsupported cipher version: {0}")]
    UnsupportedVersion(u32),

    // ========================================================================
    // Availability Errors (200-299)
    // ========================================================================

    /// The secure random source failed
    #[error("Secure random source unavailable: {0}")]
    RandomUnavailable(String),

    /// Key store has not been initialized
    #[error("Key store has not been initialized. Call KeyStore::init() first.")]
    StorageNotInitialized,

    /// No public key loaded in the session
    #[error("No public key loaded. Generate, load or import a key first.")]
    NoPublicKey,

    /// No private key loaded in the session
    #[error("No private key loaded. Generate, load or import a key-pair first.")]
    NoPrivateKey,

    // ========================================================================
    // Format Errors (300-399)
    // ========================================================================

    /// Invalid hexadecimal input
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid base64 input
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// No brace-delimited region in the buffer
    #[error("No JSON object found in buffer")]
    MissingJsonBody,

    /// Brace-delimited region is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Key material could not be imported
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Operation Failures (400-499)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// RSA key generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    // ========================================================================
    // Storage Errors (500-599)
    // ========================================================================

    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Stored record could not be decoded
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code
    ///
    /// - 100-199: Argument
    /// - 200-299: Availability
    /// - 300-399: Format
    /// - 400-499: Operation failure
    /// - 500-599: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => 100,
            Error::UnsupportedEncoding(_) => 101,
            Error::UnsupportedVersion(_) => 102,

            Error::RandomUnavailable(_) => 200,
            Error::StorageNotInitialized => 201,
            Error::NoPublicKey => 202,
            Error::NoPrivateKey => 203,

            Error::InvalidHex(_) => 300,
            Error::InvalidBase64(_) => 301,
            Error::MissingJsonBody => 302,
            Error::InvalidJson(_) => 303,
            Error::InvalidKey(_) => 304,

            Error::EncryptionFailed(_) => 400,
            Error::DecryptionFailed(_) => 401,
            Error::KeyGenerationFailed(_) => 402,

            Error::StorageReadError(_) => 500,
            Error::StorageWriteError(_) => 501,
            Error::StorageCorrupted(_) => 502,
            Error::DatabaseError(_) => 503,

            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self.code() {
            100..=199 => ErrorKind::InvalidArgument,
            200..=299 => ErrorKind::Unavailable,
            300..=399 => ErrorKind::Format,
            400..=499 => ErrorKind::OperationFailure,
            500..=599 => ErrorKind::Storage,
            _ => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can be resolved by initializing a collaborator
    /// or loading a key, then retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StorageNotInitialized | Error::NoPublicKey | Error::NoPrivateKey
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::InvalidHex(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidBase64(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
