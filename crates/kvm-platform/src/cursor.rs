//! Cursor-control primitives (§6), shared by the Controller's input tap
//! (warping/hiding the local cursor on entry to REMOTE, §4.5) and the
//! Capture side (warping/hiding the local cursor for the duration it is
//! under the Controller's control, §4.5 "mirror transitions").

pub trait CursorControl: Send {
    fn cursor_position(&self) -> (f64, f64);
    fn warp_cursor(&mut self, x: f64, y: f64);
    fn hide_cursor(&mut self);
    fn show_cursor(&mut self);
    /// Lock the cursor to its current position so local motion does not
    /// also move the system pointer while REMOTE.
    fn disassociate_cursor(&mut self);
    fn associate_cursor(&mut self);
}

/// Test double recording every cursor-primitive call, shared by both
/// sides' stubs.
#[derive(Debug, Default)]
pub struct RecordingCursorControl {
    cursor: (f64, f64),
    pub warp_calls: Vec<(f64, f64)>,
    pub hide_calls: u32,
    pub show_calls: u32,
    pub disassociate_calls: u32,
    pub associate_calls: u32,
}

impl RecordingCursorControl {
    #[must_use]
    pub fn new(cursor: (f64, f64)) -> Self {
        Self { cursor, ..Default::default() }
    }
}

impl CursorControl for RecordingCursorControl {
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
