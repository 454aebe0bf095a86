//! Control state machine and its handoff geometry (§4.5).

use kvm_proto::Message;

/// Horizontal pixel offset from the Capture's physical width used to pin
/// the warp target just inside the right edge on entry to REMOTE.
pub const CAPTURE_EDGE_PIN_OFFSET: f64 = 20.0;
/// Horizontal pixel offset from the Controller's left edge used when
/// warping the local cursor back on return to LOCAL.
pub const LOCAL_RETURN_EDGE_OFFSET: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    Local,
    Remote,
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("transport is not connected")]
    TransportNotConnected,
    #[error("already in REMOTE state")]
    AlreadyRemote,
}

/// Target position for the `WarpCursor` sent when entering REMOTE.
///
/// `cursor_y` is mapped proportionally into the Capture's *logical*
/// (scale-compensated) coordinate space — the wire's `scale` field is
/// what lets a physically-larger Capture display preserve the same
/// relative vertical position. The horizontal coordinate is pinned to
/// the Capture's physical width, not its logical width, since it needs
/// to land just inside the physical right edge.
#[must_use]
pub fn compute_enter_remote_warp_target(
    controller_frame_height: f64,
    cursor_y: f64,
    capture_width_px: f64,
    capture_height_px: f64,
    capture_scale: f64,
) -> (f64, f64) {
    let capture_height_logical = capture_height_px / capture_scale;
    let y_ratio = cursor_y / controller_frame_height;
    let target_y = y_ratio * capture_height_logical;
    let target_x = capture_width_px - CAPTURE_EDGE_PIN_OFFSET;
    (target_x, target_y)
}

/// Target position for the local cursor warp performed on return to
/// LOCAL: just inside the left edge, at the mid-height of the leftmost
/// display.
#[must_use]
pub fn compute_return_to_local_warp_target(screen_min_x: f64, screen_mid_y: f64) -> (f64, f64) {
    (screen_min_x + LOCAL_RETURN_EDGE_OFFSET, screen_mid_y)
}

/// Controller-side half of the handoff state machine.
#[derive(Debug)]
pub struct ControllerHandoff {
    state: HandoffState,
}

impl ControllerHandoff {
    #[must_use]
    pub fn new() -> Self {
        Self { state: HandoffState::Local }
    }

    #[must_use]
    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// LOCAL → REMOTE, triggered by the left-edge detector or a hotkey.
    /// Returns the `WarpCursor` message to send before flipping state, or
    /// an error if a precondition fails.
    pub fn enter_remote(
        &mut self,
        transport_connected: bool,
        controller_frame_height: f64,
        cursor_y: f64,
        capture_width_px: f64,
        capture_height_px: f64,
        capture_scale: f64,
    ) -> Result<Message, HandoffError> {
        if !transport_connected {
            return Err(HandoffError::TransportNotConnected);
        }
        if self.state == HandoffState::Remote {
            return Err(HandoffError::AlreadyRemote);
        }
        let (x, y) = compute_enter_remote_warp_target(
            controller_frame_height,
            cursor_y,
            capture_width_px,
            capture_height_px,
            capture_scale,
        );
        self.state = HandoffState::Remote;
        Ok(Message::WarpCursor { x, y })
    }

    /// REMOTE → LOCAL. No-op (returns `false`) if already LOCAL, per the
    /// handoff-race rule in §7.
    pub fn return_to_local(&mut self) -> bool {
        if self.state == HandoffState::Local {
            return false;
        }
        self.state = HandoffState::Local;
        true
    }

    /// Transport dropped: unconditionally force LOCAL.
    pub fn on_transport_not_ready(&mut self) {
        self.state = HandoffState::Local;
    }
}

impl Default for ControllerHandoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture-side mirror of the handoff state machine: it only tracks
/// whether it is currently under remote control, driven entirely by
/// `WarpCursor` (enter) and its own right-edge detector (exit, emitting
/// `ControlRelease`).
#[derive(Debug)]
pub struct CaptureHandoff {
    under_remote_control: bool,
}

impl CaptureHandoff {
    #[must_use]
    pub fn new() -> Self {
        Self { under_remote_control: false }
    }

    #[must_use]
    pub fn under_remote_control(&self) -> bool {
        self.under_remote_control
    }

    /// `WarpCursor` received while no session is active is dropped by the
    /// caller before this is invoked; once invoked, always enters remote
    /// control.
    pub fn on_warp_cursor(&mut self) {
        self.under_remote_control = true;
    }

    /// The right-edge detector fired: emit `ControlRelease` and exit
    /// remote control.
    pub fn on_right_edge_fired(&mut self) -> Message {
        self.under_remote_control = false;
        Message::ControlRelease
    }
}

impl Default for CaptureHandoff {
    fn default() -> Self {
        Self::new()
    }
}
