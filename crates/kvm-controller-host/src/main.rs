//! Controller-role host process (§3, §4): dials a Capture host, decodes
//! its video stream, and forwards local input while REMOTE.
//!
//! Real local input capture and cursor primitives are external
//! collaborators outside this crate's scope (see spec's Non-goals); this
//! binary drives the session engine with the in-process recording input
//! tap and stub decoder so the wire protocol, handoff, and display
//! negotiation logic all run end-to-end against a real Capture host.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kvm_clipboard::ArboardClipboard;
use kvm_platform::{Permission, PermissionStatus, RecordingInputTap, StubPermissionProbe, StubVideoDecoder};
use kvm_session::{ControllerConfig, ControllerSession};
use tokio::net::TcpStream;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "kvm-controller-host", version, about = "Controller-role KVM session host")]
struct Cli {
    /// Path to a TOML config file. Defaults to /etc/kvm-controller-host/config.toml
    /// if present, otherwise built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture host to dial, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Capture host port, overriding the config file.
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
    if let Some(host) = &cli.host {
        let port = cli.port.unwrap_or(host_config.capture_addr.port());
        host_config.capture_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid host/port: {host}:{port}"))?;
    } else if let Some(port) = cli.port {
        host_config.capture_addr.set_port(port);
    }

    tracing::info!(capture_addr = %host_config.capture_addr, "connecting to capture host");

    let stream = TcpStream::connect(host_config.capture_addr)
        .await
        .with_context(|| format!("failed to connect to {}", host_config.capture_addr))?;
    let (reader, writer) = stream.into_split();

    let tap = RecordingInputTap::new((0.0, host_config.local_frame_height / 2.0), vec![]);
    let decoder = StubVideoDecoder::new(
        host_config.desired_display_width.unwrap_or(1920),
        host_config.desired_display_height.unwrap_or(1080),
    );
    let clipboard = ArboardClipboard::new().context("clipboard backend unavailable")?;
    let mut permission = StubPermissionProbe::new();
    permission.set(Permission::Accessibility, PermissionStatus::Granted);

    let session_config = ControllerConfig {
        local_frame_height: host_config.local_frame_height,
        screen_min_x: 0.0,
        screen_max_x: host_config.local_frame_width,
        screen_mid_y: host_config.local_frame_height / 2.0,
        mission_control_key: host_config.mission_control_key,
        desired_display_mode: host_config.desired_display_mode(),
    };

    let mut session = ControllerSession::new(reader, writer, tap, decoder, clipboard, permission, session_config);

    if let Err(e) = session.run().await {
        tracing::warn!(error = %e, "controller session ended");
        return Err(e.into());
    }

    tracing::info!("controller session ended");
    Ok(())
}
