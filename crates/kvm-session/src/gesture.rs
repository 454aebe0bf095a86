//! Gesture-to-primitive translation on the injection side (§4.4).

use kvm_platform::InputSink;
use kvm_proto::{GestureDirection, GestureKind, MomentumPhase, MouseButton, ScrollPhase};

/// Swipe gestures are re-posted as scroll-wheel events scaled by this
/// factor.
pub const SWIPE_SCROLL_SCALE: f64 = 8.0;

/// Translate one `Gesture` message into calls against `sink`, at the
/// current injected cursor position `(x, y)`.
pub fn apply_gesture(
    sink: &mut dyn InputSink,
    kind: GestureKind,
    _direction: Option<GestureDirection>,
    dx: f64,
    dy: f64,
    phase: ScrollPhase,
    cursor: (f64, f64),
    mission_control_key: u16,
) {
    match kind {
        GestureKind::Swipe => {
            sink.post_scroll(
                cursor.0,
                cursor.1,
                dx * SWIPE_SCROLL_SCALE,
                dy * SWIPE_SCROLL_SCALE,
                phase,
                MomentumPhase::None,
            );
        }
        GestureKind::SmartZoom => {
            sink.post_mouse_button(MouseButton::Left, true, 2, cursor.0, cursor.1);
            sink.post_mouse_button(MouseButton::Left, false, 2, cursor.0, cursor.1);
        }
        GestureKind::MissionControl => {
            sink.post_key(mission_control_key, 0, true);
            sink.post_key(mission_control_key, 0, false);
        }
    }
}
