mod common;

use common::{
    client_for, config_with_license, internal_record, sample_record, write_sealed,
    DeviceTransport, TEST_BINDING_ID,
};
use chrono::{Duration, Utc};
use dosedock_activation::{
    ActivationConfig, ActivationCoordinator, ActivationSource, ActivationState, HardwareBringup,
    MemorySettingsStore, SettingsStore, ValidationMode,
};
use dosedock_license::LicenseType;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn coordinator(
    config: ActivationConfig,
    store: Arc<MemorySettingsStore>,
    transport: &Arc<DeviceTransport>,
) -> ActivationCoordinator {
    ActivationCoordinator::with_client(config, store, client_for(transport))
}

struct CountingBringup {
    calls: AtomicUsize,
}

impl CountingBringup {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HardwareBringup for CountingBringup {
    fn on_activated(&self, _state: &ActivationState) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn no_license_file_initializes_unactivated() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(
        config_with_license(dir.path().join("gone.lic")),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::offline(),
    );

    let state = c.initialize().await;
    assert!(!state.is_activated);
    assert_eq!(state.source, ActivationSource::Startup);
    assert_eq!(c.current_state().await, state);
    assert!(!c.is_system_ready().await);
}

#[tokio::test]
async fn valid_license_with_matching_device_activates_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let transport = DeviceTransport::healthy(TEST_BINDING_ID);
    let mut c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &transport,
    );
    let bringup = CountingBringup::new();
    c.set_hardware_bringup(Arc::clone(&bringup) as _);

    let mut events = c.subscribe();
    let state = c
        .perform_full_validation(ActivationSource::ActivationProcess)
        .await;

    assert!(state.is_activated);
    assert_eq!(state.source, ActivationSource::ActivationProcess);
    assert_eq!(state.license_type, LicenseType::Production);
    assert_eq!(state.organization.as_deref(), Some("Lakeside Pharmacy"));
    assert!(state.companion_available);

    let license = c.license_info().await.expect("license info cached");
    assert_eq!(license.customer_id, "CUST-0042");

    // exactly one change event for the pass
    let event = events.try_recv().expect("one event");
    assert!(!event.previous_state.is_activated);
    assert!(event.new_state.is_activated);
    assert!(events.try_recv().is_err());

    assert_eq!(bringup.calls(), 1);
    assert!(c.is_system_ready().await);
}

#[tokio::test]
async fn expired_license_fails_validation_citing_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = sample_record();
    record.expiry_date = Utc::now() - Duration::days(10);
    let path = write_sealed(dir.path(), &record, TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    let mut events = c.subscribe();
    let state = c.validate().await;

    assert!(!state.is_activated);
    assert_eq!(state.source, ActivationSource::ManualCheck);

    let event = events.try_recv().expect("one event");
    assert!(event.reason.contains("expired on"));
    assert!(event.reason.contains(&record.expiry_date.to_rfc3339()));
}

#[tokio::test]
async fn internal_license_activates_without_device() {
    let dir = tempfile::tempdir().unwrap();
    let record = internal_record();
    let path = write_sealed(dir.path(), &record, &record.hardware_binding_id);

    let transport = DeviceTransport::offline();
    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &transport,
    );

    let state = c
        .perform_full_validation(ActivationSource::ActivationProcess)
        .await;

    assert!(state.is_activated);
    assert_eq!(state.license_type, LicenseType::Internal);
    assert_eq!(transport.calls(), 0, "hardware client never called");

    // the substitution is never silent
    let audit = c.audit_trail();
    let substitution = audit
        .iter()
        .find(|e| e.reason.contains("placeholder"))
        .expect("bypass entry in audit trail");
    assert_eq!(substitution.organization.as_deref(), Some("Lakeside Pharmacy"));

    // internal licenses are ready without a reachable companion
    assert!(c.is_system_ready().await);
}

// ── Initialize ───────────────────────────────────────────────────

#[tokio::test]
async fn initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::activated()),
        &DeviceTransport::offline(),
    );

    let mut events = c.subscribe();
    let first = c.initialize().await;
    assert!(first.is_activated, "persisted flag plus resolvable file");

    let second = c.initialize().await;
    assert_eq!(first.is_activated, second.is_activated);

    // only the first call applied a transition
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn initialize_bypass_activates_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_license(dir.path().join("gone.lic"));
    config.bypass_validation = true;

    let c = coordinator(
        config,
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::offline(),
    );

    let state = c.initialize().await;
    assert!(state.is_activated);
    assert_eq!(state.validation_mode, ValidationMode::Bypass);
    assert!(c.is_system_ready().await, "bypass alone satisfies readiness");
}

#[tokio::test]
async fn initialize_self_heals_then_reports_unactivated() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemorySettingsStore::activated());

    let c = coordinator(
        config_with_license(dir.path().join("gone.lic")),
        Arc::clone(&store),
        &DeviceTransport::offline(),
    );

    let state = c.initialize().await;
    assert!(!state.is_activated);
    assert!(!store.is_activated().await.unwrap(), "stale flag cleared");
}

#[tokio::test]
async fn startup_info_extraction_degrades_to_production() {
    let dir = tempfile::tempdir().unwrap();
    // production license cannot be decrypted without the device, so the
    // startup pass activates on the flag alone with default license info
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::activated()),
        &DeviceTransport::offline(),
    );

    let state = c.initialize().await;
    assert!(state.is_activated);
    assert_eq!(state.license_type, LicenseType::Production);
    assert!(state.organization.is_none());
}

#[tokio::test]
async fn startup_extracts_info_from_internal_license() {
    let dir = tempfile::tempdir().unwrap();
    let record = internal_record();
    let path = write_sealed(dir.path(), &record, &record.hardware_binding_id);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::activated()),
        &DeviceTransport::offline(),
    );

    let state = c.initialize().await;
    assert!(state.is_activated);
    assert_eq!(state.license_type, LicenseType::Internal);
    assert_eq!(state.organization.as_deref(), Some("Lakeside Pharmacy"));
}

// ── Availability and readiness ───────────────────────────────────

#[tokio::test]
async fn companion_availability_change_emits_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(
        config_with_license(dir.path().join("gone.lic")),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::offline(),
    );

    let mut events = c.subscribe();

    // same value: no transition, no event
    c.update_companion_availability(false, "probe failed").await;
    assert!(events.try_recv().is_err());

    let state = c.update_companion_availability(true, "probe succeeded").await;
    assert!(state.companion_available);
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn readiness_is_recomputed_from_current_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    c.perform_full_validation(ActivationSource::ActivationProcess)
        .await;
    assert!(c.is_system_ready().await);

    // companion drops off the network: activated but no longer ready
    c.update_companion_availability(false, "device lost").await;
    assert!(!c.is_system_ready().await);

    c.update_companion_availability(true, "device back").await;
    assert!(c.is_system_ready().await);
}

#[tokio::test]
async fn internal_build_flag_relaxes_readiness() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let mut config = config_with_license(path);
    config.internal_build = true;
    let c = coordinator(
        config,
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    c.perform_full_validation(ActivationSource::ActivationProcess)
        .await;
    c.update_companion_availability(false, "device lost").await;
    assert!(c.is_system_ready().await, "internal builds stay ready");
}

// ── Concurrency ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn concurrent_validations_coalesce_into_one_pass() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    // a slow device keeps the first pass in flight while the second arrives
    let transport =
        DeviceTransport::healthy_delayed(TEST_BINDING_ID, std::time::Duration::from_millis(200));
    let c = Arc::new(coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &transport,
    ));

    let mut events = c.subscribe();

    let (a, b) = tokio::join!(
        c.perform_full_validation(ActivationSource::ActivationProcess),
        c.perform_full_validation(ActivationSource::ManualCheck),
    );

    assert!(a.is_activated);
    assert_eq!(a, b, "late caller receives the in-flight result");
    assert_eq!(a.source, ActivationSource::ActivationProcess, "leader's pass won");
    // one device query, one transition, one event
    assert_eq!(transport.calls(), 1);
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn sequential_validations_each_apply_a_transition() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    let mut events = c.subscribe();
    c.validate().await;
    c.validate().await;

    // one transition per completed pass, even when nothing changed
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

// ── Observation ──────────────────────────────────────────────────

#[tokio::test]
async fn ui_channel_receives_each_transition() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    c.attach_ui_channel(tx);

    c.perform_full_validation(ActivationSource::ActivationProcess)
        .await;

    let change = rx.try_recv().expect("ui notified");
    assert!(change.new_state.is_activated);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn system_status_snapshot_is_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sealed(dir.path(), &sample_record(), TEST_BINDING_ID);

    let c = coordinator(
        config_with_license(path),
        Arc::new(MemorySettingsStore::new()),
        &DeviceTransport::healthy(TEST_BINDING_ID),
    );

    c.perform_full_validation(ActivationSource::ActivationProcess)
        .await;

    let status = c.system_status().await;
    assert!(status.state.is_activated);
    assert!(status.ready);
    assert_eq!(
        status.license.as_ref().map(|l| l.organization.as_str()),
        Some("Lakeside Pharmacy")
    );
    assert!(!status.recent_audit.is_empty());
}
