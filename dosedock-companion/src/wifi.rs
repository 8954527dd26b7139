//! Platform WiFi join capability.
//!
//! The companion device runs its own access point; on installs where the
//! host is not already on that network, the validator can ask the OS to
//! join it. The capability is resolved once at startup into an optional
//! handle. No handle means the platform has no usable join command and the
//! validator simply skips the join step.

use crate::error::{CompanionError, CompanionResult};
use tracing::{debug, info};

/// Which platform tool performs the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinTool {
    /// NetworkManager CLI (Linux).
    Nmcli,
    /// `networksetup` (macOS).
    NetworkSetup,
    /// `netsh wlan` (Windows); requires a pre-provisioned profile.
    Netsh,
}

impl JoinTool {
    fn program(self) -> &'static str {
        match self {
            Self::Nmcli => "nmcli",
            Self::NetworkSetup => "networksetup",
            Self::Netsh => "netsh",
        }
    }
}

/// Resolved WiFi join capability.
#[derive(Debug, Clone)]
pub struct WifiJoiner {
    tool: JoinTool,
}

impl WifiJoiner {
    /// Resolves the platform join tool, probing that it is actually
    /// invocable. Returns `None` where no tool exists; callers hold the
    /// result as an optional capability rather than re-probing per call.
    pub fn resolve() -> Option<Self> {
        let tool = if cfg!(target_os = "linux") {
            JoinTool::Nmcli
        } else if cfg!(target_os = "macos") {
            JoinTool::NetworkSetup
        } else if cfg!(target_os = "windows") {
            JoinTool::Netsh
        } else {
            return None;
        };

        let probe = std::process::Command::new(tool.program())
            .arg(match tool {
                JoinTool::Nmcli => "--version",
                JoinTool::NetworkSetup => "-version",
                JoinTool::Netsh => "/?",
            })
            .output();

        match probe {
            Ok(_) => {
                debug!(tool = tool.program(), "wifi join capability resolved");
                Some(Self { tool })
            }
            Err(e) => {
                debug!(tool = tool.program(), error = %e, "no wifi join capability");
                None
            }
        }
    }

    /// Joins the given network. Blocks until the platform tool exits.
    pub async fn join(&self, ssid: &str, password: &str) -> CompanionResult<()> {
        info!(%ssid, "joining companion network");

        let mut command = tokio::process::Command::new(self.tool.program());
        match self.tool {
            JoinTool::Nmcli => {
                command.args(["dev", "wifi", "connect", ssid, "password", password]);
            }
            JoinTool::NetworkSetup => {
                command.args(["-setairportnetwork", "en0", ssid, password]);
            }
            JoinTool::Netsh => {
                command.args(["wlan", "connect", &format!("name={ssid}")]);
            }
        }

        let output = command
            .output()
            .await
            .map_err(|e| CompanionError::WifiJoin(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompanionError::WifiJoin(format!(
                "{} exited with {}: {}",
                self.tool.program(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
