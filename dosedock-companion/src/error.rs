//! Error types for the companion device client.

use thiserror::Error;

/// Result type for companion operations.
pub type CompanionResult<T> = Result<T, CompanionError>;

/// Companion-device-specific errors.
///
/// None of these ever cross the binding-lookup boundary: the client's retry
/// loop absorbs them and reports an unavailable outcome instead.
#[derive(Debug, Error)]
pub enum CompanionError {
    /// The device could not be reached at all.
    #[error("companion device connection failed: {0}")]
    Connection(String),

    /// The device answered with a non-success HTTP status.
    #[error("companion device returned status {0}")]
    Status(u16),

    /// The response body was not the expected JSON.
    #[error("malformed companion response: {0}")]
    MalformedResponse(String),

    /// The response parsed but contained no hardware identifier under any
    /// accepted field name.
    #[error("companion response did not contain a hardware identifier")]
    MissingIdentifier,

    /// Building the HTTP transport failed.
    #[error("companion transport error: {0}")]
    Transport(String),

    /// Joining the companion device's WiFi network failed.
    #[error("wifi join failed: {0}")]
    WifiJoin(String),
}
