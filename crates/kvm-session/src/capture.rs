//! Capture-side session: injects received input, negotiates display mode,
//! streams encoded video, and drives the right-edge handoff release
//! (§4.4, §4.5, §4.8 Capture half).

use std::time::{Duration, Instant};

use kvm_clipboard::{ClipboardProvider, ClipboardSyncer, POLL_INTERVAL as CLIPBOARD_POLL_INTERVAL};
use kvm_edge::{Edge, EdgeDetector, Screen};
use kvm_platform::{
    CursorControl, InputSink, Permission, PermissionProbe, PermissionStatus, ScreenSource, VideoEncoder,
    VirtualDisplay,
};
use kvm_proto::{DemuxItem, Demultiplexer, FrameWriter, Message, MouseEventType};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::capture_worker::{self, CaptureEvent, CaptureWorkerHandle, EVENT_QUEUE_CAPACITY};
use crate::display::DisplayNegotiator;
use crate::error::SessionError;
use crate::gesture::apply_gesture;
use crate::handoff::CaptureHandoff;

/// Upper bound on keyframe period (§4.3: "a keyframe period of ≤ 2 s").
pub const KEYFRAME_PERIOD: Duration = Duration::from_secs(2);

/// Host-identity and geometry configuration fixed for the life of a
/// session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub host_os_version: String,
    pub supports_virtual_display: bool,
    pub screen_min_x: f64,
    pub screen_max_x: f64,
    pub target_frame_rate: u32,
    pub mission_control_key: u16,
}

pub struct CaptureSession<R, W, Sink, Clip, VDisplay, Cursor, Perm> {
    demux: Demultiplexer<R>,
    writer: FrameWriter<W>,
    sink: Sink,
    clipboard: ClipboardSyncer<Clip>,
    handoff: CaptureHandoff,
    edge: EdgeDetector,
    negotiator: DisplayNegotiator,
    vdisplay: VDisplay,
    /// Hidden for the duration the Capture host is under remote control,
    /// shown again the moment the right-edge detector releases it
    /// (§4.5 "mirror transitions"). Distinct from `sink`, which posts the
    /// synthetic events that actually move the OS cursor.
    cursor_control: Cursor,
    /// Gates `start`'s video stream on the screen-capture permission
    /// (§7, §9 note 4: a probe invoked lazily at each state transition
    /// that requires it, rather than checked once and cached).
    permission: Perm,
    config: CaptureConfig,
    worker: Option<CaptureWorkerHandle>,
    events: Option<mpsc::Receiver<CaptureEvent>>,
    video_streaming: bool,
    /// Last known cursor position in Capture-host coordinates, tracked
    /// from inbound `WarpCursor`/`Mouse` messages so gesture translation
    /// (§4.4) has somewhere to apply a synthetic double-click.
    cursor: (f64, f64),
}

impl<R, W, Sink, Clip, VDisplay, Cursor, Perm> CaptureSession<R, W, Sink, Clip, VDisplay, Cursor, Perm>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    Sink: InputSink,
    Clip: ClipboardProvider,
    VDisplay: VirtualDisplay,
    Cursor: CursorControl,
    Perm: PermissionProbe,
{
    pub fn new(
        reader: R,
        writer: W,
        sink: Sink,
        clipboard: Clip,
        vdisplay: VDisplay,
        cursor_control: Cursor,
        permission: Perm,
        config: CaptureConfig,
    ) -> Self {
        let primary = vdisplay.primary_mode();
        Self {
            demux: Demultiplexer::new(reader),
            writer: FrameWriter::new(writer),
            sink,
            clipboard: ClipboardSyncer::new(clipboard),
            handoff: CaptureHandoff::new(),
            edge: EdgeDetector::new(Screen {
                min_x: config.screen_min_x as i32,
                max_x: config.screen_max_x as i32,
            }),
            negotiator: DisplayNegotiator::new(),
            vdisplay,
            cursor_control,
            permission,
            config,
            worker: None,
            events: None,
            video_streaming: false,
            cursor: (f64::from(primary.width) / 2.0, f64::from(primary.height) / 2.0),
        }
    }

    /// Start the capture worker against `screen`/`encoder`, and send the
    /// initial `Capabilities` handshake (and, if virtual displays aren't
    /// supported, the fallback `ScreenInfo` — §8 scenario 5).
    ///
    /// Refuses to start the video stream — without failing the handshake
    /// — if the screen-capture permission is not granted (§7).
    ///
    /// # Errors
    /// Returns [`SessionError`] on transport failure.
    pub async fn start<ScreenImpl, Enc>(&mut self, screen: ScreenImpl, encoder: Enc) -> Result<(), SessionError>
    where
        ScreenImpl: ScreenSource + 'static,
        Enc: VideoEncoder + 'static,
    {
        let primary = self.vdisplay.primary_mode();

        if self.permission.check_and_prompt(Permission::ScreenCapture) == PermissionStatus::Granted {
            let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            self.worker = Some(capture_worker::spawn(
                screen,
                encoder,
                primary.width,
                primary.height,
                self.config.target_frame_rate,
                tx,
            ));
            self.events = Some(rx);
            self.video_streaming = true;
        } else {
            tracing::error!("screen-capture permission not granted; refusing to start video stream");
        }

        self.writer
            .send_structured(&Message::Capabilities {
                supports_virtual_display: self.config.supports_virtual_display,
                host_os_version: self.config.host_os_version.clone(),
            })
            .await?;

        if !self.config.supports_virtual_display {
            self.writer
                .send_structured(&Message::ScreenInfo {
                    width: primary.width,
                    height: primary.height,
                    is_virtual: false,
                    display_id: primary.display_id,
                })
                .await?;
        }
        Ok(())
    }

    /// Handle one inbound structured record, returning any messages to
    /// send back in response. Side effects land on `self.sink`, `self.
    /// handoff`, `self.edge`, `self.negotiator`, `self.vdisplay`, and
    /// `self.worker` — the same "pure aside from the platform
    /// collaborators" shape as the Controller side.
    fn handle_structured(&mut self, msg: Message, now: Instant) -> Vec<Message> {
        match msg {
            Message::WarpCursor { x, y } => {
                self.sink.post_mouse_move(x, y);
                self.cursor = (x, y);
                self.handoff.on_warp_cursor();
                self.cursor_control.hide_cursor();
                self.edge.note_warp(now);
                vec![]
            }
            Message::Keyboard { code, modifiers, is_down } => {
                self.sink.post_key(code, modifiers, is_down);
                vec![]
            }
            Message::Mouse {
                event_type,
                x,
                y,
                dx,
                scroll_x,
                scroll_y,
                button,
                clicks,
                scroll_phase,
                momentum_phase,
                ..
            } => {
                self.cursor = (x, y);
                match event_type {
                    MouseEventType::Move => self.sink.post_mouse_move(x, y),
                    MouseEventType::Scroll => {
                        self.sink.post_scroll(x, y, scroll_x, scroll_y, scroll_phase, momentum_phase);
                    }
                    other => {
                        if let Some(button) = button {
                            let is_down = matches!(
                                other,
                                MouseEventType::LeftDown
                                    | MouseEventType::RightDown
                                    | MouseEventType::OtherDown
                            );
                            self.sink.post_mouse_button(button, is_down, clicks, x, y);
                        }
                    }
                }

                if self.handoff.under_remote_control() {
                    if let Some(Edge::Right) = self.edge.on_move(x as i32, dx as i32, now) {
                        self.cursor_control.show_cursor();
                        return vec![self.handoff.on_right_edge_fired()];
                    }
                }
                vec![]
            }
            Message::Gesture { gesture_kind, direction, dx, dy, phase } => {
                apply_gesture(&mut self.sink, gesture_kind, direction, dx, dy, phase, self.cursor, self.config.mission_control_key);
                vec![]
            }
            Message::StartVideoStream => {
                self.video_streaming = true;
                vec![]
            }
            Message::StopVideoStream => {
                self.video_streaming = false;
                vec![]
            }
            Message::DesiredDisplayMode { width, height, scale, refresh_rate } => {
                if !self.negotiator.propose(width, height) {
                    return vec![];
                }
                self.video_streaming = false;
                let mode = match self.vdisplay.create(width, height, scale, refresh_rate) {
                    Ok(mode) => mode,
                    Err(e) => {
                        tracing::warn!(error = %e, "virtual display creation failed, falling back to mirror mode");
                        self.vdisplay.primary_mode()
                    }
                };
                if let Some(worker) = &self.worker {
                    worker.reconfigure(mode.width, mode.height, self.config.target_frame_rate);
                }
                self.video_streaming = true;
                vec![Message::VirtualDisplayReady {
                    width: mode.width,
                    height: mode.height,
                    scale: mode.scale,
                    display_id: mode.display_id,
                    is_virtual: mode.is_virtual,
                }]
            }
            Message::Clipboard { id, payload, .. } => {
                if let Err(e) = self.clipboard.apply_remote(id, payload) {
                    tracing::warn!(error = %e, "failed to apply inbound clipboard update");
                }
                vec![]
            }
            Message::Unknown => vec![],
            other => {
                tracing::trace!(kind = other.kind_str(), "ignoring message not expected on the Capture side");
                vec![]
            }
        }
    }

    fn handle_capture_event(&mut self, event: CaptureEvent) -> Option<(bool, u32, Vec<u8>)> {
        match event {
            CaptureEvent::Frame(frame) if self.video_streaming => {
                Some((frame.is_keyframe, frame.timestamp_ms as u32, frame.payload))
            }
            CaptureEvent::Frame(_) => None,
            CaptureEvent::Stopped => {
                tracing::warn!("capture worker stopped");
                None
            }
            CaptureEvent::Error(e) => {
                tracing::warn!(error = %e, "capture worker error");
                None
            }
        }
    }

    /// Drive the session until the transport closes or errors.
    ///
    /// # Errors
    /// Returns [`SessionError`] on transport failure.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let mut clipboard_tick = tokio::time::interval(CLIPBOARD_POLL_INTERVAL);
        let mut keyframe_tick = tokio::time::interval(KEYFRAME_PERIOD);

        loop {
            let have_events = self.events.is_some();
            tokio::select! {
                item = self.demux.next_item() => {
                    match item? {
                        None => return Ok(()),
                        Some(DemuxItem::Structured(msg)) => {
                            for out in self.handle_structured(msg, Instant::now()) {
                                self.writer.send_structured(&out).await?;
                            }
                        }
                        Some(DemuxItem::Video { .. }) => {
                            tracing::trace!("ignoring unexpected video frame received on the Capture side");
                        }
                    }
                }
                event = async { self.events.as_mut().unwrap().recv().await }, if have_events => {
                    match event {
                        Some(event) => {
                            if let Some((is_keyframe, timestamp_ms, payload)) = self.handle_capture_event(event) {
                                self.writer.send_frame(is_keyframe, timestamp_ms, &payload).await?;
                            }
                        }
                        None => self.events = None,
                    }
                }
                _ = clipboard_tick.tick() => {
                    if let Ok(Some(update)) = self.clipboard.poll_local() {
                        self.writer.send_structured(&Message::Clipboard {
                            id: update.id,
                            kind: kvm_proto::ClipboardKind::Text,
                            payload: update.text,
                            timestamp_ms: timestamp_now_ms(),
                        }).await?;
                    }
                }
                _ = keyframe_tick.tick() => {
                    if let Some(worker) = &self.worker {
                        worker.force_keyframe();
                    }
                }
            }
        }
    }
}

fn timestamp_now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
