//! Activation state coordination for DoseDock.
//!
//! This crate ties the license decoder and the companion device client into
//! the process-wide activation state machine:
//! - One validated configuration value built at startup
//! - The persisted activation flag (single sentinel in the settings record)
//! - Quick (local-only) and full (decrypt + expiry + hardware) validation
//! - The activation coordinator: single-writer state, one audit entry and
//!   one change event per transition, coalescing in-flight guard
//!
//! # Design Principles
//!
//! - **One writer**: all state mutation funnels through the coordinator's
//!   apply routine. Observers subscribe; nothing polls.
//! - **Fail closed**: expiry, organization mismatch, hardware mismatch, and
//!   an unreachable device all fail validation on the default path.
//! - **Never crash startup**: any internal failure during initialization
//!   degrades to a safe unactivated state.

mod audit;
mod config;
mod coordinator;
mod error;
mod events;
mod policy;
mod state;
mod store;

pub use audit::{AuditEntry, AuditLog};
pub use config::{
    ActivationConfig, Environment, ValidationMode, ENV_BYPASS, ENV_COMPANION_URL, ENV_DATA_DIR,
    ENV_ENVIRONMENT, ENV_INTERNAL_BUILD, ENV_LICENSE_PATH, ENV_ORGANIZATION, ENV_REAL_HARDWARE,
};
pub use coordinator::{ActivationCoordinator, HardwareBringup};
pub use error::{ActivationError, ActivationResult};
pub use events::{StateChange, StateChangeBus, ValidationStep};
pub use policy::{ValidationOutcome, Validator};
pub use state::{ActivationSource, ActivationState, LicenseInfo, SystemStatus};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore, ACTIVATION_SENTINEL};
