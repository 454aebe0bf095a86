//! Capture-role host process (§3, §4): listens for a single Controller
//! connection, streams encoded video from a screen source, and injects
//! whatever input the Controller forwards.
//!
//! Real OS screen capture, hardware encoding, and input injection are
//! external collaborators outside this crate's scope (see spec's
//! Non-goals); this binary drives the session engine with a synthetic
//! screen source and the in-process injection/clipboard backends so the
//! wire protocol, handoff, and display-negotiation logic all run
//! end-to-end.

mod config;
mod solid_color;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kvm_clipboard::ArboardClipboard;
use kvm_platform::{
    Permission, PermissionStatus, RecordingCursorControl, RecordingInputSink, StubPermissionProbe, StubVideoEncoder,
    StubVirtualDisplay, VirtualDisplay,
};
use kvm_session::{CaptureConfig, CaptureSession};
use kvm_video::Codec;
use tokio::net::TcpListener;
use tracing_subscriber::filter::LevelFilter;

use crate::solid_color::SolidColorScreenSource;

#[derive(Debug, Parser)]
#[command(name = "kvm-capture-host", version, about = "Capture-role KVM session host")]
struct Cli {
    /// Path to a TOML config file. Defaults to /etc/kvm-capture-host/config.toml
    /// if present, otherwise built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase log verbosity: unset = info, -v = debug, -vv = trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level_filter(cli.verbose).to_string())),
        )
        .init();

    let mut host_config = config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        host_config.bind.set_port(port);
    }

    tracing::info!(bind = %host_config.bind, "starting capture host");

    let listener = TcpListener::bind(host_config.bind)
        .await
        .with_context(|| format!("failed to bind {}", host_config.bind))?;

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        tracing::info!(%peer, "controller connected; superseding any prior session");

        let clipboard = match ArboardClipboard::new() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "clipboard backend unavailable, dropping connection");
                continue;
            }
        };

        let (reader, writer) = stream.into_split();
        let sink = RecordingInputSink::new();
        let vdisplay = StubVirtualDisplay::new(kvm_platform::DisplayMode {
            width: 1920,
            height: 1080,
            scale: 1.0,
            display_id: 1,
            is_virtual: false,
        });
        let primary = vdisplay.primary_mode();

        let session_config = CaptureConfig {
            host_os_version: host_config.host_os_version.clone(),
            supports_virtual_display: host_config.supports_virtual_display,
            screen_min_x: 0.0,
            screen_max_x: f64::from(primary.width),
            target_frame_rate: host_config.target_frame_rate,
            mission_control_key: host_config.mission_control_key,
        };

        let cursor_control =
            RecordingCursorControl::new((f64::from(primary.width) / 2.0, f64::from(primary.height) / 2.0));
        let mut permission = StubPermissionProbe::new();
        permission.set(Permission::ScreenCapture, PermissionStatus::Granted);
        let mut session = CaptureSession::new(
            reader,
            writer,
            sink,
            clipboard,
            vdisplay,
            cursor_control,
            permission,
            session_config,
        );
        let screen = SolidColorScreenSource::new([0x20, 0x40, 0x80, 0xff]);
        let encoder = StubVideoEncoder::new(Codec::H264);

        if let Err(e) = session.start(screen, encoder).await {
            tracing::warn!(error = %e, "failed to start capture session");
            continue;
        }

        if let Err(e) = session.run().await {
            tracing::warn!(%peer, error = %e, "capture session ended");
        } else {
            tracing::info!(%peer, "capture session ended");
        }
    }
}
