//! Error types for the licensing module.

use thiserror::Error;

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Licensing-specific errors.
///
/// `DecryptionFailed` deliberately carries no detail: wrong key material,
/// a tampered blob, and a corrupted payload must be indistinguishable to
/// the caller.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// No license file exists at any searched location.
    #[error("license file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be read.
    #[error("license file unreadable: {0}")]
    Io(String),

    /// Container version other than the supported one.
    #[error("unsupported license format version: {found}")]
    UnsupportedVersion {
        /// The version string found in the container.
        found: String,
    },

    /// Container names an unknown cipher or KDF algorithm.
    #[error("unsupported license algorithm: {found}")]
    UnsupportedAlgorithm {
        /// The algorithm id found in the container.
        found: String,
    },

    /// Container JSON is malformed or missing required fields.
    #[error("malformed license container: {0}")]
    MalformedContainer(String),

    /// KDF context info does not have exactly six fields, or the salt
    /// does not decode.
    #[error("malformed key derivation context: {0}")]
    MalformedContext(String),

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Decryption failed (wrong key material or tampered data).
    #[error("license decryption failed")]
    DecryptionFailed,

    /// Sealing a record into a container failed.
    #[error("license sealing failed: {0}")]
    SealingFailed(String),
}
