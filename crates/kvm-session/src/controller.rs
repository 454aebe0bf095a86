//! Controller-side session: taps local input, forwards it while REMOTE,
//! decodes the inbound video stream, and drives the left-edge handoff
//! trigger (§4.4, §4.5 Controller half).

use std::time::{Duration, Instant};

use kvm_clipboard::{ClipboardProvider, ClipboardSyncer, POLL_INTERVAL as CLIPBOARD_POLL_INTERVAL};
use kvm_edge::{Edge, EdgeDetector, Screen};
use kvm_platform::{DecodeEvent, InputTap, InputTapEvent, Permission, PermissionProbe, PermissionStatus, VideoDecoder};
use kvm_proto::{DemuxItem, Demultiplexer, FrameWriter, Message, MouseButton, MouseEventType};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;
use crate::handoff::{ControllerHandoff, HandoffState};
use crate::video_health::VideoHealth;

/// Geometry and identity configuration fixed for the life of a session.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub local_frame_height: f64,
    pub screen_min_x: f64,
    pub screen_max_x: f64,
    pub screen_mid_y: f64,
    pub mission_control_key: u16,
    pub desired_display_mode: Option<(u32, u32, f64, u32)>,
}

impl ControllerConfig {
    /// The fixed screen-centre point the cursor-lock loop re-warps to
    /// while REMOTE (§4.4), so the local pointer does not drift off-screen
    /// while remote input is being tapped and swallowed.
    #[must_use]
    fn screen_center(&self) -> (f64, f64) {
        ((self.screen_min_x + self.screen_max_x) / 2.0, self.screen_mid_y)
    }
}

/// Cadence of the cursor-lock loop (§4.4: "every tick (~16 ms)").
const CURSOR_LOCK_INTERVAL: Duration = Duration::from_millis(16);

/// What the Capture side most recently told us about itself.
#[derive(Debug, Clone, Copy, Default)]
struct CaptureGeometry {
    width: u32,
    height: u32,
    scale: f64,
}

pub struct ControllerSession<R, W, Tap, Dec, Clip, Perm> {
    demux: Demultiplexer<R>,
    writer: FrameWriter<W>,
    tap: Tap,
    decoder: Dec,
    clipboard: ClipboardSyncer<Clip>,
    handoff: ControllerHandoff,
    edge: EdgeDetector,
    video_health: VideoHealth,
    /// Gates entry into REMOTE on the accessibility permission (§7,
    /// §9 note 4: a probe invoked lazily at each state transition that
    /// requires it, rather than checked once and cached).
    permission: Perm,
    config: ControllerConfig,
    capture_geometry: CaptureGeometry,
}

impl<R, W, Tap, Dec, Clip, Perm> ControllerSession<R, W, Tap, Dec, Clip, Perm>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    Tap: InputTap,
    Dec: VideoDecoder,
    Clip: ClipboardProvider,
    Perm: PermissionProbe,
{
    pub fn new(
        reader: R,
        writer: W,
        tap: Tap,
        decoder: Dec,
        clipboard: Clip,
        permission: Perm,
        config: ControllerConfig,
    ) -> Self {
        Self {
            demux: Demultiplexer::new(reader),
            writer: FrameWriter::new(writer),
            tap,
            decoder,
            clipboard: ClipboardSyncer::new(clipboard),
            handoff: ControllerHandoff::new(),
            edge: EdgeDetector::new(Screen { min_x: config.screen_min_x as i32, max_x: config.screen_max_x as i32 }),
            video_health: VideoHealth::new(),
            permission,
            config,
            capture_geometry: CaptureGeometry::default(),
        }
    }

    /// Handle one inbound structured record, returning any messages to
    /// send back in response. Pure aside from `self.tap`'s cursor
    /// primitives, so it is directly unit-testable.
    fn handle_structured(&mut self, msg: Message) -> Vec<Message> {
        match msg {
            Message::Capabilities { supports_virtual_display, host_os_version } => {
                tracing::info!(%host_os_version, supports_virtual_display, "capture capabilities received");
                if supports_virtual_display {
                    if let Some((w, h, scale, refresh)) = self.config.desired_display_mode {
                        return vec![Message::DesiredDisplayMode { width: w, height: h, scale, refresh_rate: refresh }];
                    }
                }
                vec![]
            }
            Message::ScreenInfo { width, height, .. } => {
                self.capture_geometry = CaptureGeometry { width, height, scale: 1.0 };
                vec![]
            }
            Message::VirtualDisplayReady { width, height, scale, is_virtual, .. } => {
                self.capture_geometry = CaptureGeometry { width, height, scale };
                tracing::info!(width, height, scale, is_virtual, "capture display mode settled");
                vec![]
            }
            Message::ControlRelease => {
                if self.handoff.return_to_local() {
                    self.tap.show_cursor();
                    self.tap.associate_cursor();
                    let (x, y) = crate::handoff::compute_return_to_local_warp_target(
                        self.config.screen_min_x,
                        self.config.screen_mid_y,
                    );
                    self.tap.warp_cursor(x, y);
                    self.edge.arm_cooldown(Instant::now());
                }
                vec![]
            }
            Message::Clipboard { id, payload, .. } => {
                if let Err(e) = self.clipboard.apply_remote(id, payload) {
                    tracing::warn!(error = %e, "failed to apply inbound clipboard update");
                }
                vec![]
            }
            Message::Unknown => vec![],
            other => {
                tracing::trace!(kind = other.kind_str(), "ignoring message not expected on the Controller side");
                vec![]
            }
        }
    }

    fn handle_video_frame(&mut self, flags: u8, timestamp_ms: u32, payload: Vec<u8>) {
        let is_keyframe = flags & kvm_proto::wire::FLAG_KEYFRAME != 0;
        match self.decoder.decode(&payload, u64::from(timestamp_ms)) {
            Ok(events) => {
                if is_keyframe {
                    self.video_health.record_keyframe_success();
                }
                for event in events {
                    match event {
                        DecodeEvent::ParameterSetChanged(desc) => {
                            tracing::info!(?desc.codec, "rebuilding decoder for new parameter sets");
                        }
                        DecodeEvent::Frame(frame) => {
                            tracing::trace!(width = frame.width, height = frame.height, "frame decoded");
                        }
                    }
                }
            }
            Err(e) if is_keyframe => {
                tracing::debug!(error = %e, "dropping keyframe");
                if self.video_health.record_keyframe_failure() {
                    tracing::warn!("video unavailable: three consecutive keyframes failed to decode");
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "dropping slice, waiting for next keyframe");
                self.video_health.record_slice_dropped();
            }
        }
    }

    /// Translate and, if currently REMOTE, forward one tapped local input
    /// event. Also evaluates the left-edge trigger while LOCAL. Returns
    /// messages to send.
    fn handle_tap_event(&mut self, event: InputTapEvent, now: Instant) -> Vec<Message> {
        if self.handoff.state() == HandoffState::Local {
            if let InputTapEvent::MouseMove { x, dx, y, .. } = &event {
                if let Some(Edge::Left) = self.edge.on_move(*x as i32, *dx as i32, now) {
                    if self.permission.check_and_prompt(Permission::Accessibility) != PermissionStatus::Granted {
                        tracing::error!("accessibility permission not granted; refusing to enter remote control");
                        return vec![];
                    }
                    match self.handoff.enter_remote(
                        true,
                        self.config.local_frame_height,
                        *y,
                        f64::from(self.capture_geometry.width),
                        f64::from(self.capture_geometry.height),
                        self.capture_geometry.scale.max(1.0),
                    ) {
                        Ok(warp) => {
                            self.tap.hide_cursor();
                            self.tap.disassociate_cursor();
                            return vec![warp];
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "left-edge trigger could not enter REMOTE");
                        }
                    }
                }
            }
            return vec![];
        }

        translate_tap_event(event).into_iter().collect()
    }

    /// Drive the session until the transport closes or errors.
    ///
    /// # Errors
    /// Returns [`SessionError`] on transport failure.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let mut clipboard_tick = tokio::time::interval(CLIPBOARD_POLL_INTERVAL);
        let mut tap_tick = tokio::time::interval(Duration::from_millis(4));
        let mut cursor_lock_tick = tokio::time::interval(CURSOR_LOCK_INTERVAL);

        loop {
            tokio::select! {
                item = self.demux.next_item() => {
                    match item? {
                        None => return Ok(()),
                        Some(DemuxItem::Structured(msg)) => {
                            for out in self.handle_structured(msg) {
                                self.writer.send_structured(&out).await?;
                            }
                        }
                        Some(DemuxItem::Video { flags, timestamp_ms, payload }) => {
                            self.handle_video_frame(flags, timestamp_ms, payload);
                        }
                    }
                }
                _ = clipboard_tick.tick() => {
                    if self.handoff.state() == HandoffState::Remote {
                        if let Ok(Some(update)) = self.clipboard.poll_local() {
                            self.writer.send_structured(&Message::Clipboard {
                                id: update.id,
                                kind: kvm_proto::ClipboardKind::Text,
                                payload: update.text,
                                timestamp_ms: timestamp_now_ms(),
                            }).await?;
                        }
                    }
                }
                _ = tap_tick.tick() => {
                    while let Some(event) = self.tap.poll_event() {
                        for out in self.handle_tap_event(event, Instant::now()) {
                            self.writer.send_structured(&out).await?;
                        }
                    }
                }
                _ = cursor_lock_tick.tick() => {
                    if self.handoff.state() == HandoffState::Remote {
                        let (x, y) = self.config.screen_center();
                        self.tap.warp_cursor(x, y);
                    }
                }
            }
        }
    }
}

fn translate_tap_event(event: InputTapEvent) -> Option<Message> {
    match event {
        InputTapEvent::Key { code, modifiers, is_down } => Some(Message::Keyboard { code, modifiers, is_down }),
        InputTapEvent::MouseMove { x, y, dx, dy } => Some(Message::Mouse {
            event_type: MouseEventType::Move,
            x,
            y,
            dx,
            dy,
            button: None,
            clicks: 0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            scroll_phase: Default::default(),
            momentum_phase: Default::default(),
        }),
        InputTapEvent::MouseButton { button, is_down, clicks, x, y } => Some(Message::Mouse {
            event_type: mouse_button_event_type(button, is_down),
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            button: Some(button),
            clicks,
            scroll_x: 0.0,
            scroll_y: 0.0,
            scroll_phase: Default::default(),
            momentum_phase: Default::default(),
        }),
        InputTapEvent::Scroll { x, y, scroll_x, scroll_y, phase, momentum } => Some(Message::Mouse {
            event_type: MouseEventType::Scroll,
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            button: None,
            clicks: 0,
            scroll_x,
            scroll_y,
            scroll_phase: phase,
            momentum_phase: momentum,
        }),
        InputTapEvent::Gesture { kind, direction, dx, dy, phase } => Some(Message::Gesture {
            gesture_kind: kind,
            direction,
            dx,
            dy,
            phase,
        }),
    }
}

fn mouse_button_event_type(button: MouseButton, is_down: bool) -> MouseEventType {
    match (button, is_down) {
        (MouseButton::Left, true) => MouseEventType::LeftDown,
        (MouseButton::Left, false) => MouseEventType::LeftUp,
        (MouseButton::Right, true) => MouseEventType::RightDown,
        (MouseButton::Right, false) => MouseEventType::RightUp,
        (MouseButton::Other, true) => MouseEventType::OtherDown,
        (MouseButton::Other, false) => MouseEventType::OtherUp,
    }
}

fn timestamp_now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvm_clipboard::StubClipboard;
    use kvm_platform::{DecoderError, PixelBuffer, PixelFormat, StubPermissionProbe};
    use std::io::Cursor;

    struct NeverDecoder;
    impl VideoDecoder for NeverDecoder {
        fn decode(&mut self, _annexb: &[u8], _timestamp_ms: u64) -> Result<Vec<DecodeEvent>, DecoderError> {
            Ok(vec![DecodeEvent::Frame(PixelBuffer {
                width: 1,
                height: 1,
                format: PixelFormat::Bgra,
                data: vec![0; 4],
                timestamp_ms: 0,
            })])
        }
    }

    fn granted_permission() -> StubPermissionProbe {
        let mut probe = StubPermissionProbe::new();
        probe.set(Permission::Accessibility, PermissionStatus::Granted);
        probe
    }

    fn session() -> ControllerSession<
        Cursor<Vec<u8>>,
        Vec<u8>,
        kvm_platform::RecordingInputTap,
        NeverDecoder,
        StubClipboard,
        StubPermissionProbe,
    > {
        let config = ControllerConfig {
            local_frame_height: 1080.0,
            screen_min_x: 0.0,
            screen_max_x: 1920.0,
            screen_mid_y: 1080.0,
            mission_control_key: 0xa0,
            desired_display_mode: Some((3840, 2160, 2.0, 60)),
        };
        ControllerSession::new(
            Cursor::new(Vec::new()),
            Vec::new(),
            kvm_platform::RecordingInputTap::new((0.0, 540.0), vec![]),
            NeverDecoder,
            StubClipboard::new(),
            granted_permission(),
            config,
        )
    }

    #[test]
    fn capabilities_with_virtual_display_support_triggers_desired_mode() {
        let mut s = session();
        let out = s.handle_structured(Message::Capabilities {
            supports_virtual_display: true,
            host_os_version: "test".into(),
        });
        assert_eq!(
            out,
            vec![Message::DesiredDisplayMode { width: 3840, height: 2160, scale: 2.0, refresh_rate: 60 }]
        );
    }

    #[test]
    fn scenario_display_negotiation_fallback_sends_nothing() {
        // §8 scenario 5.
        let mut s = session();
        let out = s.handle_structured(Message::Capabilities {
            supports_virtual_display: false,
            host_os_version: "test".into(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn scenario_handoff_round_trip_via_tap_event() {
        // §8 scenario 1: full path through handle_tap_event.
        let mut s = session();
        s.capture_geometry = CaptureGeometry { width: 3840, height: 2160, scale: 2.0 };
        let moves = s.handle_tap_event(
            InputTapEvent::MouseMove { x: 0.0, y: 540.0, dx: -3.0, dy: 0.0 },
            Instant::now(),
        );
        assert_eq!(moves, vec![Message::WarpCursor { x: 3820.0, y: 540.0 }]);
        assert_eq!(s.handoff.state(), HandoffState::Remote);
        assert_eq!(s.tap.hide_calls, 1);
        assert_eq!(s.tap.disassociate_calls, 1);

        let forwarded = s.handle_tap_event(
            InputTapEvent::MouseMove { x: -5.0, y: 540.0, dx: -5.0, dy: 0.0 },
            Instant::now(),
        );
        assert_eq!(
            forwarded,
            vec![Message::Mouse {
                event_type: MouseEventType::Move,
                x: -5.0,
                y: 540.0,
                dx: -5.0,
                dy: 0.0,
                button: None,
                clicks: 0,
                scroll_x: 0.0,
                scroll_y: 0.0,
                scroll_phase: Default::default(),
                momentum_phase: Default::default(),
            }]
        );
    }

    #[test]
    fn control_release_returns_to_local_and_warps_and_shows_cursor() {
        let mut s = session();
        s.handoff.enter_remote(true, 1080.0, 540.0, 3840.0, 2160.0, 2.0).unwrap();
        let out = s.handle_structured(Message::ControlRelease);
        assert!(out.is_empty());
        assert_eq!(s.handoff.state(), HandoffState::Local);
        assert_eq!(s.tap.show_calls, 1);
        assert_eq!(s.tap.associate_calls, 1);
        assert_eq!(s.tap.warp_calls, vec![(3.0, 1080.0)]);
    }

    #[test]
    fn control_release_while_local_is_a_no_op() {
        let mut s = session();
        let out = s.handle_structured(Message::ControlRelease);
        assert!(out.is_empty());
        assert_eq!(s.tap.warp_calls.len(), 0);
    }

    #[test]
    fn left_edge_trigger_is_refused_without_accessibility_permission() {
        let mut s = session();
        s.permission = StubPermissionProbe::new(); // denied by default
        s.capture_geometry = CaptureGeometry { width: 3840, height: 2160, scale: 2.0 };
        let out = s.handle_tap_event(
            InputTapEvent::MouseMove { x: 0.0, y: 540.0, dx: -3.0, dy: 0.0 },
            Instant::now(),
        );
        assert!(out.is_empty());
        assert_eq!(s.handoff.state(), HandoffState::Local);
        assert_eq!(s.tap.hide_calls, 0);
    }

    #[test]
    fn screen_center_is_midpoint_of_configured_bounds() {
        let config = ControllerConfig {
            local_frame_height: 1080.0,
            screen_min_x: 0.0,
            screen_max_x: 1920.0,
            screen_mid_y: 540.0,
            mission_control_key: 0xa0,
            desired_display_mode: None,
        };
        assert_eq!(config.screen_center(), (960.0, 540.0));
    }
}
