//! Input-tap contract: the Controller-side source of local input events
//! and cursor primitives (§6, §4.5).

use kvm_proto::{GestureDirection, GestureKind, MomentumPhase, MouseButton, ScrollPhase};

use crate::cursor::CursorControl;

#[derive(Debug, Clone, PartialEq)]
pub enum InputTapEvent {
    Key { code: u16, modifiers: u64, is_down: bool },
    MouseMove { x: f64, y: f64, dx: f64, dy: f64 },
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
    Gesture {
        kind: GestureKind,
        direction: Option<GestureDirection>,
        dx: f64,
        dy: f64,
        phase: ScrollPhase,
    },
}

/// Source of local input events plus (via [`CursorControl`]) the cursor
/// primitives the control state machine needs for handoff (§4.5).
pub trait InputTap: CursorControl {
    /// Pull the next queued event, if any. Non-blocking; the reactor
    /// polls this alongside the transport and clipboard timer.
    fn poll_event(&mut self) -> Option<InputTapEvent>;
}

/// Test double that replays a canned event queue and records every
/// cursor-primitive call, per the "testable with stub implementations
/// that record calls" design note.
#[derive(Debug, Default)]
pub struct RecordingInputTap {
    events: std::collections::VecDeque<InputTapEvent>,
    cursor: (f64, f64),
    pub warp_calls: Vec<(f64, f64)>,
    pub hide_calls: u32,
    pub show_calls: u32,
    pub disassociate_calls: u32,
    pub associate_calls: u32,
}

impl RecordingInputTap {
    #[must_use]
    pub fn new(cursor: (f64, f64), events: Vec<InputTapEvent>) -> Self {
        Self {
            events: events.into(),
            cursor,
            ..Default::default()
        }
    }
}

impl InputTap for RecordingInputTap {
    fn poll_event(&mut self) -> Option<InputTapEvent> {
        self.events.pop_front()
    }
}

impl CursorControl for RecordingInputTap {
    fn cursor_position(&self) -> (f64, f64) {
        self.cursor
    }

    fn warp_cursor(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
        self.warp_calls.push((x, y));
    }

    fn hide_cursor(&mut self) {
        self.hide_calls += 1;
    }

    fn show_cursor(&mut self) {
        self.show_calls += 1;
    }

    fn disassociate_cursor(&mut self) {
        self.disassociate_calls += 1;
    }

    fn associate_cursor(&mut self) {
        self.associate_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warp_cursor_updates_reported_position() {
        let mut tap = RecordingInputTap::new((0.0, 540.0), vec![]);
        tap.warp_cursor(3820.0, 540.0);
        assert_eq!(tap.cursor_position(), (3820.0, 540.0));
        assert_eq!(tap.warp_calls, vec![(3820.0, 540.0)]);
    }

    #[test]
    fn events_are_delivered_in_queue_order() {
        let e1 = InputTapEvent::Key { code: 1, modifiers: 0, is_down: true };
        let e2 = InputTapEvent::Key { code: 1, modifiers: 0, is_down: false };
        let mut tap = RecordingInputTap::new((0.0, 0.0), vec![e1.clone(), e2.clone()]);
        assert_eq!(tap.poll_event(), Some(e1));
        assert_eq!(tap.poll_event(), Some(e2));
        assert_eq!(tap.poll_event(), None);
    }
}
