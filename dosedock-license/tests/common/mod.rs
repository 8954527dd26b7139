//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use dosedock_license::{seal, LicenseFile, LicenseRecord, LicenseType};
use std::path::PathBuf;

/// Binding id of the fake companion device used across tests.
pub const TEST_BINDING_ID: &str = "AA:BB:CC:DD:EE:FF";

/// Returns a valid record expiring one year from now.
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

/// Seals `record` under `binding_id` and writes the container into `dir`.
/// Returns the container path.
pub fn write_sealed(dir: &std::path::Path, record: &LicenseRecord, binding_id: &str) -> PathBuf {
    let file = seal(record, binding_id).expect("seal");
    let path = dir.join("dosedock.lic");
    std::fs::write(&path, serde_json::to_string_pretty(&file).expect("serialize"))
        .expect("write container");
    path
}

/// Seals `record` and returns the in-memory container.
pub fn sealed(record: &LicenseRecord, binding_id: &str) -> LicenseFile {
    seal(record, binding_id).expect("seal")
}
