//! Activation audit trail.
//!
//! Every state transition and every policy substitution (the placeholder
//! binding id, in particular) lands here. The trail is bounded, in-memory,
//! surfaced through the system-status snapshot, and mirrored to tracing.

use chrono::{DateTime, Utc};
use dosedock_license::LicenseType;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

/// Entries kept before the oldest is dropped.
const DEFAULT_CAPACITY: usize = 256;

/// One audit trail entry.
///
/// Transition entries carry both activation flags; note entries (policy
/// substitutions, degradations) carry neither.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub previous_activated: Option<bool>,
    pub new_activated: Option<bool>,
    pub reason: String,
    pub license_type: LicenseType,
    pub organization: Option<String>,
}

/// Bounded in-memory audit trail.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Records a state transition.
    pub fn transition(
        &self,
        previous_activated: bool,
        new_activated: bool,
        reason: &str,
        license_type: LicenseType,
        organization: Option<&str>,
    ) {
        info!(
            previous_activated,
            new_activated,
            %license_type,
            organization = organization.unwrap_or("-"),
            reason,
            "activation transition"
        );
        self.push(AuditEntry {
            timestamp: Utc::now(),
            previous_activated: Some(previous_activated),
            new_activated: Some(new_activated),
            reason: reason.to_string(),
            license_type,
            organization: organization.map(str::to_string),
        });
    }

    /// Records a non-transition policy event. Never silent: also mirrored
    /// to tracing.
    pub fn note(&self, reason: &str, license_type: LicenseType, organization: Option<&str>) {
        info!(
            %license_type,
            organization = organization.unwrap_or("-"),
            reason,
            "activation audit note"
        );
        self.push(AuditEntry {
            timestamp: Utc::now(),
            previous_activated: None,
            new_activated: None,
            reason: reason.to_string(),
            license_type,
            organization: organization.map(str::to_string),
        });
    }

    /// A copy of the current trail, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    fn push(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}
