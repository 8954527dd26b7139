//! Activation configuration.
//!
//! All environment-variable reads for the subsystem happen here, once, at
//! startup. Everything downstream receives the resulting value; nothing
//! else consults the environment.

use serde::Serialize;
use std::env;
use std::path::PathBuf;

pub const ENV_ENVIRONMENT: &str = "DOSEDOCK_ENV";
pub const ENV_BYPASS: &str = "DOSEDOCK_BYPASS_VALIDATION";
pub const ENV_REAL_HARDWARE: &str = "DOSEDOCK_REAL_HARDWARE";
pub const ENV_INTERNAL_BUILD: &str = "DOSEDOCK_INTERNAL_BUILD";
pub const ENV_LICENSE_PATH: &str = "DOSEDOCK_LICENSE_PATH";
pub const ENV_COMPANION_URL: &str = "DOSEDOCK_COMPANION_URL";
pub const ENV_ORGANIZATION: &str = "DOSEDOCK_ORGANIZATION";
pub const ENV_DATA_DIR: &str = "DOSEDOCK_DATA_DIR";

/// How license validation behaves for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// No hardware requirement; development escape hatch.
    Bypass,
    /// Non-production environment explicitly validating against a real
    /// companion device.
    RealHardware,
    /// Customer deployment default.
    Production,
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bypass => "bypass",
            Self::RealHardware => "real-hardware",
            Self::Production => "production",
        };
        f.write_str(s)
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// The one validated configuration value for the activation subsystem,
/// constructed once at startup and passed down by handle.
#[derive(Debug, Clone, Default)]
pub struct ActivationConfig {
    pub environment: Environment,
    /// Skip all hardware binding requirements.
    pub bypass_validation: bool,
    /// In a non-production environment, validate against a real device.
    pub real_hardware: bool,
    /// Internal company build; relaxes the system-ready predicate.
    pub internal_build: bool,
    /// Explicit license file location, checked before the default search list.
    pub license_path_override: Option<PathBuf>,
    /// Companion device base URL override.
    pub companion_base_url: Option<String>,
    /// When set, full validation requires the license's organization to match.
    pub expected_organization: Option<String>,
    /// Settings record directory override.
    pub data_dir_override: Option<PathBuf>,
}

impl ActivationConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            environment: match env::var(ENV_ENVIRONMENT).ok().as_deref() {
                Some(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                    Environment::Development
                }
                _ => Environment::Production,
            },
            bypass_validation: env_flag(ENV_BYPASS),
            real_hardware: env_flag(ENV_REAL_HARDWARE),
            internal_build: env_flag(ENV_INTERNAL_BUILD),
            license_path_override: env::var(ENV_LICENSE_PATH).ok().map(PathBuf::from),
            companion_base_url: env::var(ENV_COMPANION_URL).ok().filter(|v| !v.is_empty()),
            expected_organization: env::var(ENV_ORGANIZATION).ok().filter(|v| !v.is_empty()),
            data_dir_override: env::var(ENV_DATA_DIR).ok().map(PathBuf::from),
        }
    }

    /// Resolves the effective validation mode. Fully determined by
    /// configuration: bypass flag, then real-hardware in a non-production
    /// environment, then the production default.
    #[must_use]
    pub fn validation_mode(&self) -> ValidationMode {
        if self.bypass_validation {
            ValidationMode::Bypass
        } else if self.environment != Environment::Production && self.real_hardware {
            ValidationMode::RealHardware
        } else {
            ValidationMode::Production
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| {
        v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
    })
}
