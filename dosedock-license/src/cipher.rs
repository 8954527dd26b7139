//! License blob encryption using AES-256-CBC.
//!
//! The container stores `base64(iv || ciphertext)` with PKCS#7 padding.
//! CBC carries no authentication tag; integrity comes from the payload
//! checksum and the JSON parse of the decrypted plaintext, both of which
//! surface as the same undifferentiated decryption failure.

use crate::error::{LicenseError, LicenseResult};
use crate::kdf::DerivedKey;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// An IV/ciphertext pair as stored in the container's `encrypted_data` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// The initialization vector (unique per encryption).
    pub iv: [u8; IV_SIZE],
    /// The padded ciphertext.
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encodes to base64 for storage in the container.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(IV_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.ciphertext);
        BASE64.encode(&bytes)
    }

    /// Decodes from base64. Fails on undecodable input or anything shorter
    /// than one IV plus one cipher block.
    pub fn from_base64(encoded: &str) -> LicenseResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| LicenseError::MalformedContainer(format!("invalid base64: {e}")))?;

        if bytes.len() < IV_SIZE + BLOCK_SIZE {
            return Err(LicenseError::MalformedContainer(
                "encrypted data too short".to_string(),
            ));
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[..IV_SIZE]);
        let ciphertext = bytes[IV_SIZE..].to_vec();

        Ok(Self { iv, ciphertext })
    }
}

/// Encrypts plaintext under a derived key with a fresh random IV.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> LicenseResult<EncryptedBlob> {
    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let enc = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| LicenseError::SealingFailed(e.to_string()))?;
    let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    Ok(EncryptedBlob { iv, ciphertext })
}

/// Decrypts a blob under a derived key.
///
/// All failure modes collapse into `DecryptionFailed` so callers cannot
/// learn which part of the key material was wrong.
pub fn decrypt(key: &DerivedKey, blob: &EncryptedBlob) -> LicenseResult<Vec<u8>> {
    if blob.ciphertext.is_empty() || blob.ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(LicenseError::DecryptionFailed);
    }

    let dec = Aes256CbcDec::new_from_slices(key.as_bytes(), &blob.iv)
        .map_err(|_| LicenseError::DecryptionFailed)?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(&blob.ciphertext)
        .map_err(|_| LicenseError::DecryptionFailed)
}
