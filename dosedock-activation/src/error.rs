//! Error types for the activation subsystem.

use thiserror::Error;

/// Result type for activation operations.
pub type ActivationResult<T> = Result<T, ActivationError>;

/// Activation-specific errors.
///
/// The coordinator never lets one of these escape to its caller: every
/// failure degrades into a safe unactivated transition plus an audit entry.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// License decoding failed.
    #[error(transparent)]
    License(#[from] dosedock_license::LicenseError),

    /// Companion device operation failed.
    #[error(transparent)]
    Companion(#[from] dosedock_companion::CompanionError),

    /// Settings record could not be read or written.
    #[error("settings store error: {0}")]
    Store(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
