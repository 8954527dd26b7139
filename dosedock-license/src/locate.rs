//! License file location.
//!
//! The container can live in several places depending on how the install was
//! provisioned. The search is a fixed, ordered list; the first path that
//! exists and is readable wins. An explicit override (from configuration)
//! always takes priority.

use crate::error::{LicenseError, LicenseResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical license file name.
pub const LICENSE_FILE_NAME: &str = "dosedock.lic";

/// File name used by pre-2.0 installers.
const LEGACY_FILE_NAME: &str = "license.json";

/// Builds the ordered default search list: platform data directory,
/// production resource directories, working-directory variants, then the
/// legacy fallback locations.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(data) = dirs::data_dir() {
        paths.push(data.join("DoseDock").join(LICENSE_FILE_NAME));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/opt/dosedock/resources").join(LICENSE_FILE_NAME));
        paths.push(PathBuf::from("/usr/local/share/dosedock").join(LICENSE_FILE_NAME));
    }
    #[cfg(target_os = "macos")]
    {
        paths.push(
            PathBuf::from("/Applications/DoseDock.app/Contents/Resources")
                .join(LICENSE_FILE_NAME),
        );
    }
    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ProgramData\DoseDock").join(LICENSE_FILE_NAME));
    }

    paths.push(PathBuf::from(LICENSE_FILE_NAME));
    paths.push(PathBuf::from("resources").join(LICENSE_FILE_NAME));

    // Pre-2.0 installers dropped license.json next to the binary or under
    // the user's home directory.
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".dosedock").join(LEGACY_FILE_NAME));
    }
    paths.push(PathBuf::from(LEGACY_FILE_NAME));

    paths
}

/// Returns the first existing, readable license file path.
///
/// `override_path`, when given, is checked first and exclusively does not
/// fall through silently: a configured override that is missing still lets
/// the default list run, but is logged.
pub fn locate(override_path: Option<&Path>) -> LicenseResult<PathBuf> {
    if let Some(p) = override_path {
        if is_readable(p) {
            debug!(path = %p.display(), "license file found at override path");
            return Ok(p.to_path_buf());
        }
        debug!(path = %p.display(), "license override path not readable, trying defaults");
    }

    for candidate in default_search_paths() {
        if is_readable(&candidate) {
            debug!(path = %candidate.display(), "license file found");
            return Ok(candidate);
        }
    }

    Err(LicenseError::FileNotFound(
        "no license file at any searched location".to_string(),
    ))
}

/// Existing and readable means we can actually open it, not just stat it.
fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
