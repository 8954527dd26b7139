//! Shared test helpers for activation tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dosedock_activation::ActivationConfig;
use dosedock_companion::{
    BindingClient, CompanionError, CompanionResult, CompanionTransport, PLACEHOLDER_BINDING_ID,
};
use dosedock_license::{seal, LicenseRecord, LicenseType};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Binding id of the fake companion device used across tests.
pub const TEST_BINDING_ID: &str = "AA:BB:CC:DD:EE:FF";

/// Returns a valid production record expiring one year from now.
pub fn sample_record() -> LicenseRecord {
    LicenseRecord {
        organization: "Lakeside Pharmacy".to_string(),
        customer_id: "CUST-0042".to_string(),
        application_id: "dosedock-desktop".to_string(),
        generated_at: Utc::now(),
        expiry_date: Utc::now() + Duration::days(365),
        hardware_binding_id: TEST_BINDING_ID.to_string(),
        wifi_ssid: "DoseDock-Setup".to_string(),
        wifi_password: "companion-pass".to_string(),
        format_version: "2.0.0".to_string(),
        license_type: LicenseType::Production,
        checksum: None,
    }
}

/// Returns an internal record sealed against the placeholder id.
pub fn internal_record() -> LicenseRecord {
    let mut record = sample_record();
    record.license_type = LicenseType::Internal;
    record.hardware_binding_id = PLACEHOLDER_BINDING_ID.to_string();
    record
}

/// Seals `record` under `binding_id` and writes the container into `dir`.
pub fn write_sealed(dir: &Path, record: &LicenseRecord, binding_id: &str) -> PathBuf {
    let file = seal(record, binding_id).expect("seal");
    let path = dir.join("dosedock.lic");
    std::fs::write(&path, serde_json::to_string_pretty(&file).expect("serialize"))
        .expect("write container");
    path
}

/// Configuration pointing at an explicit license path, production defaults
/// otherwise.
pub fn config_with_license(path: impl Into<PathBuf>) -> ActivationConfig {
    ActivationConfig {
        license_path_override: Some(path.into()),
        ..Default::default()
    }
}

/// Transport mimicking a healthy companion device reporting `mac`.
/// Counts every request it serves.
pub struct DeviceTransport {
    mac: Option<String>,
    delay: Option<std::time::Duration>,
    calls: AtomicUsize,
}

impl DeviceTransport {
    /// A device that answers every request with `mac`.
    pub fn healthy(mac: &str) -> Arc<Self> {
        Arc::new(Self {
            mac: Some(mac.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// A healthy device that takes `delay` to answer each request.
    pub fn healthy_delayed(mac: &str, delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            mac: Some(mac.to_string()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    /// A device that refuses every connection.
    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            mac: None,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> CompanionResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mac {
            Some(mac) => Ok(serde_json::json!({ "mac": mac })),
            None => Err(CompanionError::Connection("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl CompanionTransport for DeviceTransport {
    async fn get_json(&self, _path: &str) -> CompanionResult<serde_json::Value> {
        self.respond().await
    }

    async fn post_empty(&self, _path: &str) -> CompanionResult<()> {
        self.respond().await.map(|_| ())
    }
}

/// Binding client over a [`DeviceTransport`].
pub fn client_for(transport: &Arc<DeviceTransport>) -> BindingClient {
    BindingClient::with_transport(Arc::clone(transport) as _)
}
