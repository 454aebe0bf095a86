use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Capture-host configuration loaded from an optional TOML file, layered
/// under the CLI flags handled in `main`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureHostConfig {
    /// Address to bind the session listener to.
    pub bind: SocketAddr,

    /// Advertised in `Capabilities`; purely informational to the peer.
    pub host_os_version: String,

    /// Whether this host can create a virtual display for the session
    /// (§4.8). `false` pins capture to the primary display.
    pub supports_virtual_display: bool,

    /// Target encoder frame rate.
    pub target_frame_rate: u32,

    /// Platform virtual-key code for the synthetic mission-control press
    /// (§4.4 gesture translation).
    pub mission_control_key: u16,
}

impl Default for CaptureHostConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:50505".parse().unwrap(),
            host_os_version: std::env::consts::OS.to_string(),
            supports_virtual_display: true,
            target_frame_rate: 30,
            mission_control_key: 0xa0,
        }
    }
}

/// Load the capture-host configuration from a TOML file.
///
/// Returns the default configuration if the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<CaptureHostConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("/etc/kvm-capture-host/config.toml"),
    };

    if !path.exists() {
        tracing::debug!(?path, "capture-host config not found, using defaults");
        return Ok(CaptureHostConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read capture-host config: {}", path.display()))?;

    let config: CaptureHostConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse capture-host config: {}", path.display()))?;

    tracing::info!(?path, "capture-host configuration loaded");
    Ok(config)
}
