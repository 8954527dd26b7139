//! The hardware binding client.
//!
//! Queries the companion device for its hardware identifier with linear
//! backoff. The lookup never returns an error: after exhausting its retry
//! budget it degrades to an explicit unavailable outcome, and the caller
//! decides what that means for validation.

use crate::error::{CompanionError, CompanionResult};
use crate::supersede::SupersedeToken;
use crate::transport::{CompanionTransport, HttpTransport};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default companion device address. The device runs a WiFi access point
/// and answers on its gateway address.
pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Default retry budget for binding lookups.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff unit; attempt `n` waits `n` units before the next try.
pub const BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Fixed identifier substituted for internal and development licenses.
/// The substitution is always written to the audit trail by the caller.
pub const PLACEHOLDER_BINDING_ID: &str = "INTERNAL-DEVICE";

/// Accepted identifier field names: current firmware uses `mac`, pre-1.3
/// firmware used `mac_address`.
const ID_FIELDS: [&str; 2] = ["mac", "mac_address"];

/// Outcome of a binding-id lookup. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingLookup {
    /// The device answered; identifier normalized to uppercase.
    Found(String),
    /// The device could not be queried within the retry budget.
    Unavailable {
        /// The last failure, for the audit trail.
        reason: String,
    },
}

impl BindingLookup {
    /// The identifier, when the lookup succeeded.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Found(id) => Some(id),
            Self::Unavailable { .. } => None,
        }
    }

    /// Returns true when the device answered.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Diagnostic report from the device's `/info` endpoint. All fields are
/// optional; firmware revisions differ in what they report.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanionInfo {
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
    #[serde(default, alias = "mac_address")]
    pub mac: Option<String>,
}

/// Client for the companion device's HTTP interface.
pub struct BindingClient {
    transport: Arc<dyn CompanionTransport>,
    max_retries: u32,
}

impl BindingClient {
    /// Builds a client against the default device address.
    pub fn new() -> CompanionResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Builds a client against an explicit base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> CompanionResult<Self> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(base_url)?),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Builds a client over an injected transport (tests).
    pub fn with_transport(transport: Arc<dyn CompanionTransport>) -> Self {
        Self {
            transport,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides the retry budget.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Queries the device for its hardware identifier with the default
    /// retry budget.
    pub async fn binding_id(&self, token: &SupersedeToken) -> BindingLookup {
        self.binding_id_with_retries(self.max_retries, token).await
    }

    /// Queries the device for its hardware identifier.
    ///
    /// Attempt `n` failing waits `n` seconds before the next try (1s, 2s,
    /// 3s...). A superseded token aborts between attempts. Never errors.
    pub async fn binding_id_with_retries(
        &self,
        max_retries: u32,
        token: &SupersedeToken,
    ) -> BindingLookup {
        let mut last_failure = "no attempts made".to_string();

        for attempt in 1..=max_retries {
            if token.is_superseded() {
                debug!(attempt, "binding lookup superseded by a newer validation");
                return BindingLookup::Unavailable {
                    reason: "superseded by a newer validation".to_string(),
                };
            }

            match self.query_identifier().await {
                Ok(id) => {
                    debug!(%id, attempt, "companion device reported binding id");
                    return BindingLookup::Found(id);
                }
                Err(e) => {
                    warn!(attempt, max_retries, error = %e, "binding lookup attempt failed");
                    last_failure = e.to_string();
                    if attempt < max_retries {
                        tokio::time::sleep(BACKOFF_UNIT * attempt).await;
                    }
                }
            }
        }

        BindingLookup::Unavailable {
            reason: last_failure,
        }
    }

    /// Single best-effort probe, no retry.
    pub async fn test_reachability(&self) -> bool {
        self.query_identifier().await.is_ok()
    }

    /// Fetches the device's diagnostic report.
    pub async fn device_info(&self) -> CompanionResult<CompanionInfo> {
        let body = self.transport.get_json("/info").await?;
        serde_json::from_value(body)
            .map_err(|e| CompanionError::MalformedResponse(e.to_string()))
    }

    /// Asks the device to reboot (field diagnostics).
    pub async fn reset_device(&self) -> CompanionResult<()> {
        self.transport.post_empty("/reset").await
    }

    async fn query_identifier(&self) -> CompanionResult<String> {
        let body = self.transport.get_json("/mac").await?;
        extract_identifier(&body).ok_or(CompanionError::MissingIdentifier)
    }
}

/// Pulls the identifier out of a response body, accepting either field
/// name, and normalizes it to uppercase.
fn extract_identifier(body: &serde_json::Value) -> Option<String> {
    ID_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(serde_json::Value::as_str))
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
}
