//! The decrypted license record.
//!
//! Field names mirror the payload produced by the offline issuing tool
//! (camelCase JSON). A record is only meaningful once it has been
//! successfully decrypted out of a container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The kind of license a record grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    /// Customer deployment; hardware binding enforced.
    #[default]
    Production,
    /// Internal company install.
    Internal,
    /// Developer workstation install.
    Development,
}

impl LicenseType {
    /// Returns true for license types that never consult the companion
    /// device for binding.
    #[must_use]
    pub fn bypasses_hardware_binding(&self) -> bool {
        matches!(self, Self::Internal | Self::Development)
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Production => "production",
            Self::Internal => "internal",
            Self::Development => "development",
        };
        f.write_str(s)
    }
}

/// The decrypted license payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// The licensed organization's display name.
    pub organization: String,
    /// Customer identifier assigned by the issuing tool.
    pub customer_id: String,
    /// Application identifier this license is valid for.
    pub application_id: String,
    /// When the license was generated.
    pub generated_at: DateTime<Utc>,
    /// When the license expires. Compared strictly against current time.
    pub expiry_date: DateTime<Utc>,
    /// Hardware identifier of the paired companion device.
    pub hardware_binding_id: String,
    /// SSID of the companion device's access point.
    pub wifi_ssid: String,
    /// Password for the companion device's access point.
    pub wifi_password: String,
    /// Payload format version.
    pub format_version: String,
    /// License kind; absent in older payloads, which are production.
    #[serde(default)]
    pub license_type: LicenseType,
    /// Optional integrity checksum over the identity fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl LicenseRecord {
    /// Returns true if the license is expired at `now` (strict comparison).
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    /// Returns true if the license is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the reported device identifier matches the embedded
    /// binding id, ignoring case.
    #[must_use]
    pub fn binding_matches(&self, reported_id: &str) -> bool {
        self.hardware_binding_id.eq_ignore_ascii_case(reported_id.trim())
    }

    /// Computes the identity checksum: hex SHA-256 over the pipe-joined
    /// customer, application, expiry, and organization fields.
    #[must_use]
    pub fn compute_checksum(&self) -> String {
        let joined = format!(
            "{}|{}|{}|{}",
            self.customer_id,
            self.application_id,
            self.expiry_date.to_rfc3339(),
            self.organization
        );
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verifies the embedded checksum when one is present. A record without
    /// a checksum passes.
    #[must_use]
    pub fn checksum_matches(&self) -> bool {
        match &self.checksum {
            Some(stored) => stored.eq_ignore_ascii_case(&self.compute_checksum()),
            None => true,
        }
    }
}
