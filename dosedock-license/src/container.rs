//! The on-disk license container.
//!
//! A container is a small JSON document produced once by the offline issuing
//! tool and read-only at runtime:
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "encrypted_data": "<base64 iv||ciphertext>",
//!   "algorithm": "aes-256-cbc",
//!   "created_at": "2026-01-12T09:30:00Z",
//!   "kdf_context": {
//!     "salt": "<base64>",
//!     "info": "DDLIC|app|customer|expiry|2|ssid",
//!     "algorithm": "hkdf-sha256"
//!   }
//! }
//! ```
//!
//! Only `version == "2.0.0"` is accepted. There is no legacy fallback: older
//! container formats are rejected outright rather than silently downgraded.

use crate::cipher::{self, EncryptedBlob};
use crate::error::{LicenseError, LicenseResult};
use crate::kdf::{self, derive_license_key, KeyMaterial};
use crate::record::LicenseRecord;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The only accepted container format version.
pub const SUPPORTED_VERSION: &str = "2.0.0";

/// The only accepted payload cipher.
pub const SUPPORTED_CIPHER: &str = "aes-256-cbc";

/// The only accepted key derivation algorithm.
pub const SUPPORTED_KDF: &str = "hkdf-sha256";

/// Fixed first field of the KDF context info string.
pub const INFO_PREFIX: &str = "DDLIC";

/// Schema version carried in the KDF context info string.
pub const INFO_SCHEMA_VERSION: &str = "2";

const INFO_FIELD_COUNT: usize = 6;

/// Non-secret key derivation context stored beside the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfContext {
    /// Base64-encoded random salt.
    pub salt: String,
    /// Six pipe-delimited fields:
    /// `prefix|applicationId|customerId|expiryDate|schemaVersion|wifiSsid`.
    pub info: String,
    /// KDF algorithm tag.
    pub algorithm: String,
}

/// The parsed-out fields of a [`KdfContext`] info string.
#[derive(Debug, Clone, Copy)]
pub struct InfoFields<'a> {
    pub prefix: &'a str,
    pub application_id: &'a str,
    pub customer_id: &'a str,
    pub expiry_date: &'a str,
    pub schema_version: &'a str,
    pub wifi_ssid: &'a str,
}

impl KdfContext {
    /// Splits the info string into its six fields.
    ///
    /// The SSID is the last field, so it may contain any character; fewer
    /// than six fields is a hard failure.
    pub fn fields(&self) -> LicenseResult<InfoFields<'_>> {
        let parts: Vec<&str> = self.info.splitn(INFO_FIELD_COUNT, '|').collect();
        if parts.len() != INFO_FIELD_COUNT {
            return Err(LicenseError::MalformedContext(format!(
                "expected {INFO_FIELD_COUNT} info fields, got {}",
                parts.len()
            )));
        }
        Ok(InfoFields {
            prefix: parts[0],
            application_id: parts[1],
            customer_id: parts[2],
            expiry_date: parts[3],
            schema_version: parts[4],
            wifi_ssid: parts[5],
        })
    }

    /// Decodes the salt.
    pub fn salt_bytes(&self) -> LicenseResult<Vec<u8>> {
        let salt = BASE64
            .decode(&self.salt)
            .map_err(|e| LicenseError::MalformedContext(format!("invalid salt: {e}")))?;
        if salt.is_empty() {
            return Err(LicenseError::MalformedContext("empty salt".to_string()));
        }
        Ok(salt)
    }
}

/// The on-disk license container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseFile {
    /// Container format version.
    pub version: String,
    /// Base64 of IV followed by AES-256-CBC ciphertext.
    pub encrypted_data: String,
    /// Payload cipher id.
    pub algorithm: String,
    /// When the issuing tool produced this container.
    pub created_at: DateTime<Utc>,
    /// Key derivation context.
    pub kdf_context: KdfContext,
}

impl LicenseFile {
    /// Reads and parses a container from disk. Does not decrypt.
    pub fn load(path: &Path) -> LicenseResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LicenseError::FileNotFound(path.display().to_string())
            } else {
                LicenseError::Io(format!("{}: {e}", path.display()))
            }
        })?;

        serde_json::from_str(&raw)
            .map_err(|e| LicenseError::MalformedContainer(e.to_string()))
    }

    /// Checks the version and algorithm tags. Any version other than
    /// [`SUPPORTED_VERSION`] is a hard rejection.
    pub fn check_header(&self) -> LicenseResult<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(LicenseError::UnsupportedVersion {
                found: self.version.clone(),
            });
        }
        if self.algorithm != SUPPORTED_CIPHER {
            return Err(LicenseError::UnsupportedAlgorithm {
                found: self.algorithm.clone(),
            });
        }
        if self.kdf_context.algorithm != SUPPORTED_KDF {
            return Err(LicenseError::UnsupportedAlgorithm {
                found: self.kdf_context.algorithm.clone(),
            });
        }
        Ok(())
    }

    /// Cheap structural validation without decrypting: header tags, salt and
    /// blob decodability, info field count.
    pub fn check_structure(&self) -> LicenseResult<()> {
        self.check_header()?;
        self.kdf_context.fields()?;
        self.kdf_context.salt_bytes()?;
        EncryptedBlob::from_base64(&self.encrypted_data)?;
        Ok(())
    }

    /// Decrypts the container with the caller-supplied hardware binding id.
    ///
    /// Every failure past the structural checks collapses into
    /// [`LicenseError::DecryptionFailed`].
    pub fn decrypt(&self, binding_id: &str) -> LicenseResult<LicenseRecord> {
        self.check_header()?;

        let fields = self.kdf_context.fields()?;
        let salt = self.kdf_context.salt_bytes()?;
        let blob = EncryptedBlob::from_base64(&self.encrypted_data)?;

        let material = KeyMaterial {
            application_id: fields.application_id,
            customer_id: fields.customer_id,
            wifi_ssid: fields.wifi_ssid,
            binding_id,
            expiry_date: fields.expiry_date,
        };
        let key = derive_license_key(&material, &salt, &self.kdf_context.info)?;

        let plaintext = cipher::decrypt(&key, &blob)?;
        let record: LicenseRecord =
            serde_json::from_slice(&plaintext).map_err(|_| LicenseError::DecryptionFailed)?;

        if !record.checksum_matches() {
            return Err(LicenseError::DecryptionFailed);
        }

        debug!(
            organization = %record.organization,
            license_type = %record.license_type,
            "license container decrypted"
        );
        Ok(record)
    }
}

/// Loads and decrypts the container at `path` in one step.
pub fn parse(path: &Path, binding_id: &str) -> LicenseResult<LicenseRecord> {
    LicenseFile::load(path)?.decrypt(binding_id)
}

/// Structural-only validation of the container at `path` (no decryption).
pub fn validate_structure(path: &Path) -> LicenseResult<()> {
    LicenseFile::load(path)?.check_structure()
}

/// Seals a record into a container (issuing-tool counterpart of
/// [`LicenseFile::decrypt`]).
///
/// The record's identity checksum is filled in, the KDF context is built
/// from the record's fields, and the payload is encrypted under the key
/// derived with `binding_id`. Internal and development licenses are sealed
/// against the fixed placeholder id rather than a real device identifier.
pub fn seal(record: &LicenseRecord, binding_id: &str) -> LicenseResult<LicenseFile> {
    let expiry = record.expiry_date.to_rfc3339();
    let info = format!(
        "{INFO_PREFIX}|{}|{}|{expiry}|{INFO_SCHEMA_VERSION}|{}",
        record.application_id, record.customer_id, record.wifi_ssid
    );

    let salt = kdf::generate_salt();
    let material = KeyMaterial {
        application_id: &record.application_id,
        customer_id: &record.customer_id,
        wifi_ssid: &record.wifi_ssid,
        binding_id,
        expiry_date: &expiry,
    };
    let key = derive_license_key(&material, &salt, &info)?;

    let mut payload = record.clone();
    payload.checksum = Some(payload.compute_checksum());
    let plaintext = serde_json::to_vec(&payload)
        .map_err(|e| LicenseError::SealingFailed(e.to_string()))?;

    let blob = cipher::encrypt(&key, &plaintext)?;

    Ok(LicenseFile {
        version: SUPPORTED_VERSION.to_string(),
        encrypted_data: blob.to_base64(),
        algorithm: SUPPORTED_CIPHER.to_string(),
        created_at: Utc::now(),
        kdf_context: KdfContext {
            salt: BASE64.encode(salt),
            info,
            algorithm: SUPPORTED_KDF.to_string(),
        },
    })
}
