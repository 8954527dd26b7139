//! License container decoding for DoseDock.
//!
//! This crate handles:
//! - Locating the on-disk license container
//! - HKDF-SHA256 key derivation bound to the companion device
//! - AES-256-CBC decryption of the license payload
//! - Structural validation without decryption
//!
//! # Design Principles
//!
//! - **Device binding**: the hardware binding id is part of the key
//!   material and is supplied by the caller at decrypt time, never stored
//!   in the container. Copying a license file to another install leaves it
//!   cryptographically inert.
//! - **No oracle**: wrong key material, tampering, and corruption all
//!   surface as one undifferentiated [`LicenseError::DecryptionFailed`].
//! - **One format**: only container version `2.0.0` is accepted. Older
//!   formats are hard-rejected, never silently downgraded.

mod cipher;
mod container;
mod error;
mod kdf;
mod locate;
mod record;

pub use cipher::{decrypt, encrypt, EncryptedBlob, BLOCK_SIZE, IV_SIZE};
pub use container::{
    parse, seal, validate_structure, InfoFields, KdfContext, LicenseFile, INFO_PREFIX,
    INFO_SCHEMA_VERSION, SUPPORTED_CIPHER, SUPPORTED_KDF, SUPPORTED_VERSION,
};
pub use error::{LicenseError, LicenseResult};
pub use kdf::{derive_license_key, generate_salt, DerivedKey, KeyMaterial, KEY_SIZE, SALT_SIZE};
pub use locate::{default_search_paths, locate, LICENSE_FILE_NAME};
pub use record::{LicenseRecord, LicenseType};
