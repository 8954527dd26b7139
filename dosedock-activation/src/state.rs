//! Activation state types.

use crate::audit::AuditEntry;
use crate::config::ValidationMode;
use chrono::{DateTime, Utc};
use dosedock_license::{LicenseRecord, LicenseType};
use serde::Serialize;

/// What triggered a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationSource {
    /// Process startup.
    Startup,
    /// User-triggered check.
    ManualCheck,
    /// The interactive activation flow.
    ActivationProcess,
}

/// The coordinator's state. Created once per process, mutated only through
/// the coordinator's apply routine, never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub is_activated: bool,
    pub validation_mode: ValidationMode,
    pub source: ActivationSource,
    pub last_checked: Option<DateTime<Utc>>,
    pub companion_available: bool,
    pub companion_status_reason: Option<String>,
    pub license_type: LicenseType,
    pub organization: Option<String>,
}

impl ActivationState {
    /// The state every process starts in.
    pub fn initial(validation_mode: ValidationMode) -> Self {
        Self {
            is_activated: false,
            validation_mode,
            source: ActivationSource::Startup,
            last_checked: None,
            companion_available: false,
            companion_status_reason: None,
            license_type: LicenseType::Production,
            organization: None,
        }
    }
}

/// Non-secret license summary for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub organization: String,
    pub customer_id: String,
    pub application_id: String,
    pub license_type: LicenseType,
    pub generated_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl From<&LicenseRecord> for LicenseInfo {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            organization: record.organization.clone(),
            customer_id: record.customer_id.clone(),
            application_id: record.application_id.clone(),
            license_type: record.license_type,
            generated_at: record.generated_at,
            expiry_date: record.expiry_date,
        }
    }
}

/// Diagnostic snapshot of the whole subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub state: ActivationState,
    pub ready: bool,
    pub license: Option<LicenseInfo>,
    pub recent_audit: Vec<AuditEntry>,
}
