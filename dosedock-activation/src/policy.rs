//! The two-tier validation policy.
//!
//! Quick validation is local-only: persisted flag plus license file
//! resolution, never a network call. Full validation decrypts the license,
//! checks expiry and organization, and requires the companion device's
//! reported identifier to match the licensed one. Every check fails closed
//! on the default path; the explicitly named diagnostic entry point is the
//! only place a hardware mismatch degrades to a warning.

use crate::audit::AuditLog;
use crate::config::{ActivationConfig, ValidationMode};
use crate::error::{ActivationError, ActivationResult};
use crate::events::{ProgressSink, ValidationStep};
use crate::state::LicenseInfo;
use crate::store::{SettingsStore, ACTIVATION_SENTINEL};
use chrono::Utc;
use dosedock_companion::{
    BindingClient, BindingLookup, SupersedeToken, WifiJoiner, PLACEHOLDER_BINDING_ID,
};
use dosedock_license::{locate, LicenseError, LicenseFile, LicenseRecord};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How a hardware mismatch is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MismatchPolicy {
    /// Default: mismatch fails the pass.
    FailClosed,
    /// Field troubleshooting: mismatch is reported but does not fail.
    WarnOnly,
}

/// Result of a full validation pass. Failures are results, not errors;
/// the coordinator turns them into transitions.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub activated: bool,
    pub reason: String,
    pub license: Option<LicenseInfo>,
    /// Whether the companion device answered during this pass, when it was
    /// consulted at all.
    pub companion_available: Option<bool>,
    /// Non-fatal finding from the diagnostic entry point.
    pub warning: Option<String>,
}

impl ValidationOutcome {
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            activated: false,
            reason: reason.into(),
            license: None,
            companion_available: None,
            warning: None,
        }
    }

    fn with_companion(mut self, available: bool) -> Self {
        self.companion_available = Some(available);
        self
    }

    fn with_license(mut self, record: &LicenseRecord) -> Self {
        self.license = Some(LicenseInfo::from(record));
        self
    }
}

#[derive(Clone)]
struct WifiCredentials {
    ssid: String,
    password: String,
}

/// Runs the validation tiers against the configured store and device.
pub struct Validator {
    config: ActivationConfig,
    store: Arc<dyn SettingsStore>,
    client: BindingClient,
    wifi: Option<WifiJoiner>,
    audit: Arc<AuditLog>,
    progress: ProgressSink,
    /// Companion AP credentials from the last successful decrypt, used to
    /// rejoin the device network when a later pass finds it unreachable.
    credentials: Mutex<Option<WifiCredentials>>,
}

impl Validator {
    pub fn new(
        config: ActivationConfig,
        store: Arc<dyn SettingsStore>,
        client: BindingClient,
    ) -> Self {
        Self::with_audit(config, store, client, Arc::new(AuditLog::default()))
    }

    pub fn with_audit(
        config: ActivationConfig,
        store: Arc<dyn SettingsStore>,
        client: BindingClient,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            config,
            store,
            client,
            wifi: None,
            audit,
            progress: ProgressSink::default(),
            credentials: Mutex::new(None),
        }
    }

    /// Installs the WiFi join capability. Resolved once by the composition
    /// root; `None` disables network joins entirely.
    pub fn set_wifi_joiner(&mut self, wifi: Option<WifiJoiner>) {
        self.wifi = wifi;
    }

    /// Attaches a channel receiving step-level progress of full passes.
    pub fn attach_progress_channel(&self, sender: mpsc::UnboundedSender<ValidationStep>) {
        self.progress.attach(sender);
    }

    /// Quick validation: persisted flag plus license file resolution.
    ///
    /// Self-heals a stale flag: when the flag is set but no license file
    /// resolves any more, the flag is cleared and the result is false.
    /// Never contacts the companion device.
    pub async fn quick_validation(&self) -> ActivationResult<bool> {
        if !self.store.is_activated().await? {
            return Ok(false);
        }

        match locate(self.config.license_path_override.as_deref()) {
            Ok(_) => Ok(true),
            Err(LicenseError::FileNotFound(_)) => {
                warn!("activation flag set but no license file resolves; clearing stale flag");
                self.store.clear_activation_flag().await?;
                Ok(false)
            }
            Err(e) => Err(ActivationError::License(e)),
        }
    }

    /// Full validation, fail-closed. This is the default path.
    pub async fn full_validation(&self, token: &SupersedeToken) -> ValidationOutcome {
        self.run_full(token, MismatchPolicy::FailClosed).await
    }

    /// Diagnostic full validation: identical to [`Self::full_validation`]
    /// except a hardware mismatch is reported as a warning instead of
    /// failing the pass. For field troubleshooting only; never wire this
    /// into the normal activation path.
    pub async fn full_validation_diagnostic(&self, token: &SupersedeToken) -> ValidationOutcome {
        self.run_full(token, MismatchPolicy::WarnOnly).await
    }

    /// Best-effort license summary without a companion device: decrypts
    /// with the placeholder id, which succeeds only for licenses sealed
    /// against it (internal and development installs).
    pub fn peek_license_info(&self) -> Option<LicenseInfo> {
        let path = locate(self.config.license_path_override.as_deref()).ok()?;
        let record = LicenseFile::load(&path).ok()?.decrypt(PLACEHOLDER_BINDING_ID).ok()?;
        self.cache_credentials(&record);
        Some(LicenseInfo::from(&record))
    }

    async fn run_full(&self, token: &SupersedeToken, policy: MismatchPolicy) -> ValidationOutcome {
        // run the quick tier first for its self-heal side effect; its
        // verdict does not gate the authoritative checks below
        if let Err(e) = self.quick_validation().await {
            warn!(error = %e, "quick validation errored during full pass");
        }

        self.progress.report(ValidationStep::FileLoading);
        let path = match locate(self.config.license_path_override.as_deref()) {
            Ok(path) => path,
            Err(e) => return ValidationOutcome::fail(e.to_string()),
        };
        let file = match LicenseFile::load(&path) {
            Ok(file) => file,
            Err(e) => return ValidationOutcome::fail(e.to_string()),
        };
        if let Err(e) = file.check_structure() {
            return ValidationOutcome::fail(e.to_string());
        }

        let bypass = self.config.validation_mode() == ValidationMode::Bypass;

        // internal and development licenses are sealed against the
        // placeholder id; try it first so those installs never hit the
        // network
        let placeholder_record = file.decrypt(PLACEHOLDER_BINDING_ID).ok();

        let mut companion_available = None;
        let mut reported_id = None;

        let record = match (placeholder_record, bypass) {
            (Some(record), _) if record.license_type.bypasses_hardware_binding() => {
                self.audit.note(
                    &format!(
                        "placeholder binding id substituted for {} license",
                        record.license_type
                    ),
                    record.license_type,
                    Some(&record.organization),
                );
                info!(
                    organization = %record.organization,
                    license_type = %record.license_type,
                    "hardware binding satisfied by placeholder id"
                );
                record
            }
            // bypass skips the device, not the content checks
            (Some(record), true) => record,
            (None, true) => {
                return ValidationOutcome::fail(
                    "validation bypassed but license is not decryptable with the placeholder id",
                );
            }
            (_, false) => {
                self.ensure_companion_network().await;

                let id = match self.client.binding_id(token).await {
                    BindingLookup::Found(id) => {
                        companion_available = Some(true);
                        id
                    }
                    BindingLookup::Unavailable { reason } => {
                        return ValidationOutcome::fail(format!(
                            "companion device unreachable: {reason}"
                        ))
                        .with_companion(false);
                    }
                };

                match file.decrypt(&id) {
                    Ok(record) => {
                        reported_id = Some(id);
                        record
                    }
                    Err(e) => return ValidationOutcome::fail(e.to_string()).with_companion(true),
                }
            }
        };

        self.cache_credentials(&record);

        self.progress.report(ValidationStep::ExpiryCheck);
        if record.is_expired_at(Utc::now()) {
            return ValidationOutcome::fail(format!(
                "license expired on {}",
                record.expiry_date.to_rfc3339()
            ))
            .with_license(&record);
        }

        self.progress.report(ValidationStep::OrganizationCheck);
        if let Some(expected) = &self.config.expected_organization {
            if !record.organization.eq_ignore_ascii_case(expected) {
                return ValidationOutcome::fail(format!(
                    "license issued to '{}' but this install expects '{expected}'",
                    record.organization
                ))
                .with_license(&record);
            }
        }

        self.progress.report(ValidationStep::HardwareCheck);
        let mut warning = None;
        if let Some(id) = &reported_id {
            if !record.binding_matches(id) {
                let finding = format!(
                    "companion device {id} does not match the licensed device {}",
                    record.hardware_binding_id
                );
                match policy {
                    MismatchPolicy::FailClosed => {
                        return ValidationOutcome::fail(finding)
                            .with_companion(true)
                            .with_license(&record);
                    }
                    MismatchPolicy::WarnOnly => {
                        warn!(%finding, "diagnostic validation continuing past hardware mismatch");
                        warning = Some(finding);
                    }
                }
            }
        }

        self.progress.report(ValidationStep::Saving);
        if let Err(e) = self.store.set_activation_flag(ACTIVATION_SENTINEL).await {
            warn!(error = %e, "failed to persist activation flag");
        }

        ValidationOutcome {
            activated: true,
            reason: "full validation passed".to_string(),
            license: Some(LicenseInfo::from(&record)),
            companion_available,
            warning,
        }
    }

    /// When the device did not answer a probe and we have AP credentials
    /// from an earlier decrypt, ask the OS to join the companion network.
    async fn ensure_companion_network(&self) {
        let Some(wifi) = &self.wifi else { return };
        let credentials = self.credentials.lock().unwrap().clone();
        let Some(credentials) = credentials else {
            return;
        };

        if self.client.test_reachability().await {
            return;
        }
        if let Err(e) = wifi.join(&credentials.ssid, &credentials.password).await {
            warn!(error = %e, ssid = %credentials.ssid, "companion network join failed");
        }
    }

    fn cache_credentials(&self, record: &LicenseRecord) {
        if !record.wifi_ssid.is_empty() {
            *self.credentials.lock().unwrap() = Some(WifiCredentials {
                ssid: record.wifi_ssid.clone(),
                password: record.wifi_password.clone(),
            });
        }
    }
}
