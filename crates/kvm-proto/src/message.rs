//! Structured message model for the session protocol.
//!
//! Every variant here is one "structured record" in the sense of the wire
//! format: serialized as a single JSON object with a `kind` tag, terminated
//! on the wire by a `0x0A`. Using `serde_json` for the encoding gives us the
//! "first byte is `{`" framing invariant for free, and `#[serde(other)]`
//! gives us tolerance of unknown tags without hand-rolled dispatch.

use serde::{Deserialize, Serialize};

/// A structured (textual) protocol message.
///
/// `C→A` / `A→C` in doc comments follow the spec's direction column
/// (Controller→Capture / Capture→Controller); `Clipboard` flows both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    /// C→A: a single key transition.
    Keyboard {
        /// Platform virtual key code.
        code: u16,
        /// Modifier bitmask (shift/ctrl/alt/cmd/etc, platform-defined bits).
        modifiers: u64,
        /// `true` on key-down, `false` on key-up.
        is_down: bool,
    },
    /// C→A: a mouse motion, button, or scroll event.
    Mouse {
        event_type: MouseEventType,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        #[serde(default)]
        button: Option<MouseButton>,
        #[serde(default)]
        clicks: u32,
        #[serde(default)]
        scroll_x: f64,
        #[serde(default)]
        scroll_y: f64,
        #[serde(default)]
        scroll_phase: ScrollPhase,
        #[serde(default)]
        momentum_phase: MomentumPhase,
    },
    /// C→A: a high-level trackpad gesture.
    Gesture {
        gesture_kind: GestureKind,
        #[serde(default)]
        direction: Option<GestureDirection>,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        #[serde(default)]
        phase: ScrollPhase,
    },
    /// C→A: warp the local cursor to `(x, y)` in Capture-host coordinates.
    WarpCursor { x: f64, y: f64 },
    /// C→A: start the video stream.
    StartVideoStream,
    /// C→A: stop the video stream.
    StopVideoStream,
    /// C→A: the Controller's advisory preference for capture geometry.
    DesiredDisplayMode {
        width: u32,
        height: u32,
        scale: f64,
        refresh_rate: u32,
    },
    /// A→C: the Capture host's real display geometry.
    ScreenInfo {
        width: u32,
        height: u32,
        is_virtual: bool,
        display_id: u32,
    },
    /// A→C: release control back to the Controller-local input.
    ControlRelease,
    /// A→C: the mode the Capture host actually realised, in response to
    /// `DesiredDisplayMode` (possibly a mirror-mode fallback).
    VirtualDisplayReady {
        width: u32,
        height: u32,
        scale: f64,
        display_id: u32,
        is_virtual: bool,
    },
    /// A→C: capabilities advertised on connect.
    Capabilities {
        supports_virtual_display: bool,
        host_os_version: String,
    },
    /// Both directions: a clipboard update.
    Clipboard {
        id: u64,
        #[serde(default)]
        kind: ClipboardKind,
        payload: String,
        timestamp_ms: u64,
    },
    /// Catch-all for any tag this build does not recognise. Carries no
    /// fields (per spec: unknown tags are ignored, not inspected) but lets
    /// decoding succeed instead of failing the whole record.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Human-readable tag, for logging. Matches the wire `kind` string.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Keyboard { .. } => "keyboard",
            Self::Mouse { .. } => "mouse",
            Self::Gesture { .. } => "gesture",
            Self::WarpCursor { .. } => "warpCursor",
            Self::StartVideoStream => "startVideoStream",
            Self::StopVideoStream => "stopVideoStream",
            Self::DesiredDisplayMode { .. } => "desiredDisplayMode",
            Self::ScreenInfo { .. } => "screenInfo",
            Self::ControlRelease => "controlRelease",
            Self::VirtualDisplayReady { .. } => "virtualDisplayReady",
            Self::Capabilities { .. } => "capabilities",
            Self::Clipboard { .. } => "clipboard",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    Move,
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    LeftDrag,
    RightDrag,
    OtherDown,
    OtherUp,
    OtherDrag,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Right,
    Other,
}

/// High-precision scroll phase, mirroring native trackpad scroll semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollPhase {
    #[default]
    None,
    MayBegin,
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// Momentum (inertial) scroll phase, distinct from the finger-driven
/// [`ScrollPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MomentumPhase {
    #[default]
    None,
    Began,
    Changed,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureKind {
    Swipe,
    SmartZoom,
    MissionControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipboardKind {
    #[default]
    Text,
}
