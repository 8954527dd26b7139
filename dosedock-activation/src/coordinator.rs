//! The activation coordinator.
//!
//! One explicit instance, owned by the application's composition root and
//! passed down by handle. It is the sole source of truth for "is this
//! install activated": every mutation funnels through one apply routine
//! that snapshots the previous state, replaces the current one, writes one
//! audit entry, and emits exactly one change event.
//!
//! At most one validation pass runs at a time. Callers that arrive while a
//! pass is in flight await its result over a watch channel instead of
//! starting a redundant pass, and every new pass bumps a supersede
//! generation that cancels stale hardware queries between their backoff
//! sleeps.

use crate::audit::{AuditEntry, AuditLog};
use crate::config::{ActivationConfig, ValidationMode};
use crate::error::ActivationResult;
use crate::events::{StateChange, StateChangeBus, ValidationStep};
use crate::policy::{ValidationOutcome, Validator};
use crate::state::{ActivationSource, ActivationState, LicenseInfo, SystemStatus};
use crate::store::SettingsStore;
use chrono::Utc;
use dosedock_companion::{BindingClient, SupersedeSource, SupersedeToken, WifiJoiner};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tracing::{info, warn};

/// Boundary to the hardware-lock controller. Invoked after any pass that
/// leaves the system activated; implementations must be idempotent.
pub trait HardwareBringup: Send + Sync {
    fn on_activated(&self, state: &ActivationState);
}

enum PassKind {
    Startup,
    Full(ActivationSource),
}

enum PassRole {
    Leader(watch::Sender<Option<ActivationState>>),
    Follower(watch::Receiver<Option<ActivationState>>),
}

/// Process-wide activation state machine.
pub struct ActivationCoordinator {
    config: ActivationConfig,
    validator: Validator,
    state: RwLock<ActivationState>,
    license: RwLock<Option<LicenseInfo>>,
    initialized: Mutex<bool>,
    in_flight: Mutex<Option<watch::Receiver<Option<ActivationState>>>>,
    supersede: SupersedeSource,
    bus: StateChangeBus,
    audit: Arc<AuditLog>,
    bringup: Option<Arc<dyn HardwareBringup>>,
}

impl ActivationCoordinator {
    /// Builds the coordinator for production: companion client against the
    /// configured (or default) device address, WiFi join capability
    /// resolved once.
    pub fn new(config: ActivationConfig, store: Arc<dyn SettingsStore>) -> ActivationResult<Self> {
        let client = match &config.companion_base_url {
            Some(url) => BindingClient::with_base_url(url)?,
            None => BindingClient::new()?,
        };
        let mut coordinator = Self::with_client(config, store, client);
        coordinator.validator.set_wifi_joiner(WifiJoiner::resolve());
        Ok(coordinator)
    }

    /// Builds the coordinator over an injected companion client. No WiFi
    /// join capability is installed; tests and embedded setups add one
    /// explicitly if they need it.
    pub fn with_client(
        config: ActivationConfig,
        store: Arc<dyn SettingsStore>,
        client: BindingClient,
    ) -> Self {
        let audit = Arc::new(AuditLog::default());
        let mode = config.validation_mode();
        let validator =
            Validator::with_audit(config.clone(), store, client, Arc::clone(&audit));

        Self {
            config,
            validator,
            state: RwLock::new(ActivationState::initial(mode)),
            license: RwLock::new(None),
            initialized: Mutex::new(false),
            in_flight: Mutex::new(None),
            supersede: SupersedeSource::new(),
            bus: StateChangeBus::default(),
            audit,
            bringup: None,
        }
    }

    /// Installs the hardware bring-up handle.
    pub fn set_hardware_bringup(&mut self, handle: Arc<dyn HardwareBringup>) {
        self.bringup = Some(handle);
    }

    // ── Queried operations ───────────────────────────────────────

    /// The current state. No side effects.
    pub async fn current_state(&self) -> ActivationState {
        self.state.read().await.clone()
    }

    /// Derived readiness predicate, recomputed on every call.
    pub async fn is_system_ready(&self) -> bool {
        let state = self.state.read().await;
        state.is_activated
            && (state.validation_mode == ValidationMode::Bypass
                || state.companion_available
                || state.license_type.bypasses_hardware_binding()
                || self.config.internal_build)
    }

    /// The last successfully extracted license summary.
    pub async fn license_info(&self) -> Option<LicenseInfo> {
        self.license.read().await.clone()
    }

    /// Diagnostic snapshot: state, readiness, license, recent audit trail.
    pub async fn system_status(&self) -> SystemStatus {
        SystemStatus {
            state: self.current_state().await,
            ready: self.is_system_ready().await,
            license: self.license_info().await,
            recent_audit: self.audit.snapshot(),
        }
    }

    /// The audit trail, oldest first.
    pub fn audit_trail(&self) -> Vec<AuditEntry> {
        self.audit.snapshot()
    }

    // ── Observation ──────────────────────────────────────────────

    /// Registers an in-process state-change observer.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.bus.subscribe()
    }

    /// Attaches the UI state-change channel.
    pub fn attach_ui_channel(&self, sender: mpsc::UnboundedSender<StateChange>) {
        self.bus.attach_ui_channel(sender);
    }

    /// Attaches a channel receiving step-level validation progress.
    pub fn attach_progress_channel(&self, sender: mpsc::UnboundedSender<ValidationStep>) {
        self.validator.attach_progress_channel(sender);
    }

    // ── Validation entry points ──────────────────────────────────

    /// Startup initialization. Idempotent per process: later calls return
    /// the current state without running another pass. Never fails; any
    /// internal error degrades to an unactivated state.
    pub async fn initialize(&self) -> ActivationState {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return self.current_state().await;
        }
        let state = self.run_pass(PassKind::Startup).await;
        *initialized = true;
        state
    }

    /// Runs the full validation tier. Applies exactly one transition per
    /// pass regardless of outcome; concurrent callers receive the result
    /// of the pass already in flight.
    pub async fn perform_full_validation(&self, source: ActivationSource) -> ActivationState {
        self.run_pass(PassKind::Full(source)).await
    }

    /// User-triggered check.
    pub async fn validate(&self) -> ActivationState {
        self.perform_full_validation(ActivationSource::ManualCheck).await
    }

    /// Records a companion availability change. No transition and no event
    /// unless the flag actually changes.
    pub async fn update_companion_availability(
        &self,
        available: bool,
        reason: &str,
    ) -> ActivationState {
        self.apply(
            |previous| {
                if previous.companion_available == available {
                    return None;
                }
                let mut next = previous.clone();
                next.companion_available = available;
                next.companion_status_reason = Some(reason.to_string());
                Some(next)
            },
            reason,
        )
        .await
    }

    // ── Pass orchestration ───────────────────────────────────────

    /// In-flight guard: the first caller becomes the leader and runs the
    /// pass; everyone arriving before it finishes follows its result.
    async fn run_pass(&self, kind: PassKind) -> ActivationState {
        let role = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(receiver) => PassRole::Follower(receiver.clone()),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    *slot = Some(receiver);
                    PassRole::Leader(sender)
                }
            }
        };

        match role {
            PassRole::Follower(mut receiver) => {
                loop {
                    {
                        let value = receiver.borrow();
                        if let Some(state) = value.as_ref() {
                            return state.clone();
                        }
                    }
                    if receiver.changed().await.is_err() {
                        // leader vanished without publishing
                        return self.current_state().await;
                    }
                }
            }
            PassRole::Leader(sender) => {
                let token = self.supersede.issue();
                let state = match kind {
                    PassKind::Startup => self.startup_pass(&token).await,
                    PassKind::Full(source) => self.full_pass(source, &token).await,
                };
                let _ = sender.send(Some(state.clone()));
                *self.in_flight.lock().await = None;
                state
            }
        }
    }

    /// Startup tier: bypass activates unconditionally, otherwise quick
    /// validation with best-effort license info extraction.
    async fn startup_pass(&self, _token: &SupersedeToken) -> ActivationState {
        let mode = self.config.validation_mode();

        let (activated, reason) = if mode == ValidationMode::Bypass {
            info!("activation bypassed by configuration");
            (true, "activation bypassed by configuration".to_string())
        } else {
            match self.validator.quick_validation().await {
                Ok(true) => (true, "startup quick validation passed".to_string()),
                Ok(false) => (false, "startup quick validation failed".to_string()),
                Err(e) => {
                    warn!(error = %e, "startup validation errored; degrading to unactivated");
                    (false, format!("startup validation error: {e}"))
                }
            }
        };

        // parse failure here degrades to a production license type rather
        // than aborting startup
        let license = if activated {
            self.validator.peek_license_info()
        } else {
            None
        };
        if let Some(info) = &license {
            *self.license.write().await = Some(info.clone());
        }

        let state = self
            .apply(
                |previous| {
                    let mut next = previous.clone();
                    next.is_activated = activated;
                    next.validation_mode = mode;
                    next.source = ActivationSource::Startup;
                    if let Some(info) = &license {
                        next.license_type = info.license_type;
                        next.organization = Some(info.organization.clone());
                    }
                    Some(next)
                },
                &reason,
            )
            .await;

        self.trigger_bringup(&state);
        state
    }

    /// Full tier: delegates to the validator and folds its outcome into
    /// one transition.
    async fn full_pass(&self, source: ActivationSource, token: &SupersedeToken) -> ActivationState {
        let outcome = self.validator.full_validation(token).await;
        self.apply_outcome(outcome, source).await
    }

    async fn apply_outcome(
        &self,
        outcome: ValidationOutcome,
        source: ActivationSource,
    ) -> ActivationState {
        if let Some(info) = &outcome.license {
            *self.license.write().await = Some(info.clone());
        }
        let mode = self.config.validation_mode();

        let state = self
            .apply(
                |previous| {
                    let mut next = previous.clone();
                    next.is_activated = outcome.activated;
                    next.validation_mode = mode;
                    next.source = source;
                    if let Some(available) = outcome.companion_available {
                        next.companion_available = available;
                        next.companion_status_reason =
                            (!available).then(|| outcome.reason.clone());
                    }
                    if let Some(info) = &outcome.license {
                        next.license_type = info.license_type;
                        next.organization = Some(info.organization.clone());
                    }
                    Some(next)
                },
                &outcome.reason,
            )
            .await;

        self.trigger_bringup(&state);
        state
    }

    /// The single mutation path. Snapshot previous, replace current, write
    /// one audit entry, emit exactly one change event. Returning `None`
    /// from the builder means no transition: no audit entry, no event.
    async fn apply(
        &self,
        build: impl FnOnce(&ActivationState) -> Option<ActivationState>,
        reason: &str,
    ) -> ActivationState {
        let mut guard = self.state.write().await;
        let previous = guard.clone();
        let Some(mut next) = build(&previous) else {
            return previous;
        };
        next.last_checked = Some(Utc::now());
        *guard = next.clone();
        drop(guard);

        self.audit.transition(
            previous.is_activated,
            next.is_activated,
            reason,
            next.license_type,
            next.organization.as_deref(),
        );
        self.bus.publish(StateChange {
            previous_state: previous,
            new_state: next.clone(),
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        next
    }

    fn trigger_bringup(&self, state: &ActivationState) {
        if state.is_activated {
            if let Some(bringup) = &self.bringup {
                bringup.on_activated(state);
            }
        }
    }
}
