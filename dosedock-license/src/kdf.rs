//! Device-bound key derivation.
//!
//! Licenses are encrypted under a key derived with HKDF-SHA256 (RFC 5869,
//! extract-then-expand). The input key material concatenates the license
//! identity fields with the companion device's hardware binding id, which is
//! supplied by the caller at decrypt time and never stored beside the
//! ciphertext. A copied license file is therefore inert without the paired
//! device.

use crate::error::{LicenseError, LicenseResult};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of derived keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of KDF salts in bytes.
pub const SALT_SIZE: usize = 16;

/// A derived encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The inputs that make up the HKDF input key material, in concatenation
/// order. `binding_id` comes from the caller; everything else comes from the
/// non-secret KDF context stored beside the ciphertext.
#[derive(Debug, Clone)]
pub struct KeyMaterial<'a> {
    pub application_id: &'a str,
    pub customer_id: &'a str,
    pub wifi_ssid: &'a str,
    pub binding_id: &'a str,
    pub expiry_date: &'a str,
}

impl KeyMaterial<'_> {
    fn ikm(&self) -> Vec<u8> {
        let mut ikm = Vec::with_capacity(
            self.application_id.len()
                + self.customer_id.len()
                + self.wifi_ssid.len()
                + self.binding_id.len()
                + self.expiry_date.len(),
        );
        ikm.extend_from_slice(self.application_id.as_bytes());
        ikm.extend_from_slice(self.customer_id.as_bytes());
        ikm.extend_from_slice(self.wifi_ssid.as_bytes());
        ikm.extend_from_slice(self.binding_id.as_bytes());
        ikm.extend_from_slice(self.expiry_date.as_bytes());
        ikm
    }
}

/// Derives the 32-byte license key.
///
/// Extract uses the context salt; expand uses the context info string as-is.
/// The key fits in one output block, so the expand step's RFC 5869 counter
/// supplies the single trailing byte (0x01) the issuing tool appends to the
/// info in its own HMAC.
pub fn derive_license_key(
    material: &KeyMaterial<'_>,
    salt: &[u8],
    info: &str,
) -> LicenseResult<DerivedKey> {
    let ikm = material.ikm();
    let hk = Hkdf::<Sha256>::new(Some(salt), &ikm);

    let mut okm = [0u8; KEY_SIZE];
    hk.expand(info.as_bytes(), &mut okm)
        .map_err(|e| LicenseError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey::from_bytes(okm))
}

/// Generates a random KDF salt (issuing-tool side).
pub fn generate_salt() -> [u8; SALT_SIZE] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
