//! Screen-source contract (§6: "a push source delivering pixel buffers
//! with nominal resolution and frame timing").

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Bgra,
    Rgba,
}

impl PixelFormat {
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}

#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Error)]
pub enum ScreenSourceError {
    #[error("screen source unavailable: {0}")]
    Unavailable(String),
    #[error("screen source stopped")]
    Stopped,
}

/// A push source of captured frames. Implementations configure target
/// dimensions and frame rate once, then deliver frames through
/// [`ScreenSource::next_frame`] until they stop or error.
pub trait ScreenSource: Send {
    fn configure(&mut self, width: u32, height: u32, frame_rate: u32) -> Result<(), ScreenSourceError>;

    /// Block (the caller is expected to run this on a dedicated worker,
    /// per §5: "the screen-capture callback runs on a separate
    /// high-priority worker") until a frame is ready, or the source
    /// stops/errors.
    fn next_frame(&mut self) -> Result<PixelBuffer, ScreenSourceError>;
}

/// Deterministic stub: yields a fixed sequence of frames, then
/// [`ScreenSourceError::Stopped`].
pub struct StubScreenSource {
    frames: std::collections::VecDeque<PixelBuffer>,
    configured: Option<(u32, u32, u32)>,
}

impl StubScreenSource {
    #[must_use]
    pub fn new(frames: Vec<PixelBuffer>) -> Self {
        Self {
            frames: frames.into(),
            configured: None,
        }
    }

    #[must_use]
    pub fn configured_params(&self) -> Option<(u32, u32, u32)> {
        self.configured
    }
}

impl ScreenSource for StubScreenSource {
    fn configure(&mut self, width: u32, height: u32, frame_rate: u32) -> Result<(), ScreenSourceError> {
        self.configured = Some((width, height, frame_rate));
        Ok(())
    }

    fn next_frame(&mut self) -> Result<PixelBuffer, ScreenSourceError> {
        self.frames.pop_front().ok_or(ScreenSourceError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_yields_frames_then_stops() {
        let frame = PixelBuffer {
            width: 10,
            height: 10,
            format: PixelFormat::Bgra,
            data: vec![0; 400],
            timestamp_ms: 0,
        };
        let mut src = StubScreenSource::new(vec![frame.clone()]);
        src.configure(10, 10, 30).unwrap();
        assert_eq!(src.configured_params(), Some((10, 10, 30)));
        assert!(src.next_frame().is_ok());
        assert!(matches!(src.next_frame(), Err(ScreenSourceError::Stopped)));
    }
}
