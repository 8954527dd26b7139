//! Companion device client for DoseDock.
//!
//! The companion device is a small networked board each customer install is
//! paired with. It proves physical co-location: the application asks it for
//! its hardware identifier and that identifier is part of the license
//! decryption key material.
//!
//! This crate handles:
//! - Binding-id lookup with linear backoff, degrading to an explicit
//!   unavailable outcome instead of erroring
//! - Supersede tokens so a newer validation cancels a stale query
//! - Device diagnostics (`/info`, `/reset`)
//! - The platform WiFi join capability used to reach the device's AP

mod client;
mod error;
mod supersede;
mod transport;
mod wifi;

pub use client::{
    BindingClient, BindingLookup, CompanionInfo, BACKOFF_UNIT, DEFAULT_BASE_URL,
    DEFAULT_MAX_RETRIES, PLACEHOLDER_BINDING_ID,
};
pub use error::{CompanionError, CompanionResult};
pub use supersede::{SupersedeSource, SupersedeToken};
pub use transport::{CompanionTransport, HttpTransport, REQUEST_TIMEOUT};
pub use wifi::WifiJoiner;
