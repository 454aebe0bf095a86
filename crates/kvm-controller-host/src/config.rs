use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Controller-host configuration loaded from an optional TOML file, layered
/// under the CLI flags handled in `main`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerHostConfig {
    /// Capture host to dial.
    pub capture_addr: SocketAddr,

    /// Local display geometry, used for left/right-edge detection and the
    /// handoff warp targets (§4.4, §4.5).
    pub local_frame_width: f64,
    pub local_frame_height: f64,

    /// Platform virtual-key code for the synthetic mission-control press.
    pub mission_control_key: u16,

    /// Display mode requested from the Capture host once it reports
    /// virtual-display support, or `None` to mirror its primary display.
    pub desired_display_width: Option<u32>,
    pub desired_display_height: Option<u32>,
    pub desired_display_scale: f64,
    pub desired_display_refresh_rate: u32,
}

impl Default for ControllerHostConfig {
    fn default() -> Self {
        Self {
            capture_addr: "127.0.0.1:50505".parse().unwrap(),
            local_frame_width: 1920.0,
            local_frame_height: 1080.0,
            mission_control_key: 0xa0,
            desired_display_width: None,
            desired_display_height: None,
            desired_display_scale: 2.0,
            desired_display_refresh_rate: 60,
        }
    }
}

impl ControllerHostConfig {
    /// Assembles the `(width, height, scale, refresh_rate)` tuple the
    /// session sends as `DesiredDisplayMode`, or `None` if no explicit
    /// size was configured (mirror the Capture host's primary display).
    #[must_use]
    pub fn desired_display_mode(&self) -> Option<(u32, u32, f64, u32)> {
        let width = self.desired_display_width?;
        let height = self.desired_display_height?;
        Some((width, height, self.desired_display_scale, self.desired_display_refresh_rate))
    }
}

/// Load the controller-host configuration from a TOML file.
///
/// Returns the default configuration if the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<ControllerHostConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("/etc/kvm-controller-host/config.toml"),
    };

    if !path.exists() {
        tracing::debug!(?path, "controller-host config not found, using defaults");
        return Ok(ControllerHostConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read controller-host config: {}", path.display()))?;

    let config: ControllerHostConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse controller-host config: {}", path.display()))?;

    tracing::info!(?path, "controller-host configuration loaded");
    Ok(config)
}
