//! Input-sink contract: the Capture-side destination for synthetic input
//! events (§6, §4.4).

use kvm_proto::{MomentumPhase, MouseButton, ScrollPhase};

/// Posts synthetic input events into the local session. Gesture
/// translation (swipe → scaled scroll, smart-zoom → double-click,
/// mission-control → platform key) happens one layer up, in the session
/// logic that drives this sink — the sink only exposes the primitives.
pub trait InputSink: Send {
    fn post_key(&mut self, code: u16, modifiers: u64, is_down: bool);
    fn post_mouse_move(&mut self, x: f64, y: f64);
    fn post_mouse_button(&mut self, button: MouseButton, is_down: bool, clicks: u32, x: f64, y: f64);
    fn post_scroll(
        &mut self,
        x: f64,
        y: f64,
        scroll_x: f64,
        scroll_y: f64,
        phase: ScrollPhase,
        momentum: MomentumPhase,
    );
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Key { code: u16, modifiers: u64, is_down: bool },
    MouseMove { x: f64, y: f64 },
    MouseButton {
        button: MouseButton,
        is_down: bool,
        clicks: u32,
        x: f64,
        y: f64,
    },
    Scroll {
        x: f64,
        y: f64,
        scroll_x: f64,
        scroll_y: f64,
        phase: ScrollPhase,
        momentum: MomentumPhase,
    },
}

/// Test double recording every posted call, in order.
#[derive(Debug, Default)]
pub struct RecordingInputSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingInputSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSink for RecordingInputSink {
    fn post_key(&mut self, code: u16, modifiers: u64, is_down: bool) {
        self.calls.push(SinkCall::Key { code, modifiers, is_down });
    }

    fn post_mouse_move(&mut self, x: f64, y: f64) {
        self.calls.push(SinkCall::MouseMove { x, y });
    }

    fn post_mouse_button(&mut self, button: MouseButton, is_down: bool, clicks: u32, x: f64, y: f64) {
        self.calls.push(SinkCall::MouseButton { button, is_down, clicks, x, y });
    }

    fn post_scroll(
        &mut self,
        x: f64,
        y: f64,
        scroll_x: f64,
        scroll_y: f64,
        phase: ScrollPhase,
        momentum: MomentumPhase,
    ) {
        self.calls.push(SinkCall::Scroll { x, y, scroll_x, scroll_y, phase, momentum });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_are_recorded_in_order() {
        let mut sink = RecordingInputSink::new();
        sink.post_mouse_move(1.0, 2.0);
        sink.post_mouse_button(MouseButton::Left, true, 1, 1.0, 2.0);
        assert_eq!(sink.calls.len(), 2);
        assert_eq!(sink.calls[0], SinkCall::MouseMove { x: 1.0, y: 2.0 });
    }
}
