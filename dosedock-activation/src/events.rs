//! State-change notification.
//!
//! Observers learn of activation changes only through these events; there
//! is nothing to poll. Only the coordinator's apply routine publishes, so
//! one transition is always exactly one event.

use crate::state::ActivationState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Events buffered per subscriber before the oldest is dropped.
const CHANNEL_CAPACITY: usize = 32;

/// One activation state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub previous_state: ActivationState,
    pub new_state: ActivationState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Step-level progress of a full validation pass, reported so the UI can
/// show which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationStep {
    FileLoading,
    ExpiryCheck,
    OrganizationCheck,
    HardwareCheck,
    Saving,
}

/// Publish/subscribe registry for state changes: in-process subscribers on
/// a broadcast channel, plus one optional attached UI channel.
pub struct StateChangeBus {
    broadcast: broadcast::Sender<StateChange>,
    ui: Mutex<Option<mpsc::UnboundedSender<StateChange>>>,
}

impl Default for StateChangeBus {
    fn default() -> Self {
        let (broadcast, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            broadcast,
            ui: Mutex::new(None),
        }
    }
}

impl StateChangeBus {
    /// Registers an in-process observer.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.broadcast.subscribe()
    }

    /// Attaches the UI channel, replacing any previous one.
    pub fn attach_ui_channel(&self, sender: mpsc::UnboundedSender<StateChange>) {
        *self.ui.lock().unwrap() = Some(sender);
    }

    /// Publishes one event to every observer. Only the coordinator's apply
    /// routine may call this.
    pub(crate) fn publish(&self, change: StateChange) {
        // no subscribers is fine
        let _ = self.broadcast.send(change.clone());

        let mut ui = self.ui.lock().unwrap();
        if let Some(sender) = ui.as_ref() {
            if sender.send(change).is_err() {
                debug!("ui channel closed, detaching");
                *ui = None;
            }
        }
    }
}

/// Attachable sink for validation progress steps.
#[derive(Default)]
pub struct ProgressSink {
    sender: Mutex<Option<mpsc::UnboundedSender<ValidationStep>>>,
}

impl ProgressSink {
    /// Attaches a progress channel, replacing any previous one.
    pub fn attach(&self, sender: mpsc::UnboundedSender<ValidationStep>) {
        *self.sender.lock().unwrap() = Some(sender);
    }

    pub(crate) fn report(&self, step: ValidationStep) {
        let mut sender = self.sender.lock().unwrap();
        if let Some(tx) = sender.as_ref() {
            if tx.send(step).is_err() {
                *sender = None;
            }
        }
    }
}
