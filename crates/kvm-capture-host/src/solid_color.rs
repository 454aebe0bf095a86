//! A synthetic, continuously-running screen source that paints a solid
//! BGRA colour into every frame.
//!
//! Grounded in the teacher's `StaticDisplay`/`create_blue_bitmap` fallback
//! (used there when live PipeWire/portal capture is unavailable): rather
//! than a finite canned sequence, a real host process needs a source that
//! keeps producing frames indefinitely at the negotiated frame rate.

use std::thread::sleep;
use std::time::{Duration, Instant};

use kvm_platform::{PixelBuffer, PixelFormat, ScreenSource, ScreenSourceError};

pub struct SolidColorScreenSource {
    color: [u8; 4],
    width: u32,
    height: u32,
    frame_period: Duration,
    started_at: Option<Instant>,
}

impl SolidColorScreenSource {
    #[must_use]
    pub fn new(color: [u8; 4]) -> Self {
        Self {
            color,
            width: 0,
            height: 0,
            frame_period: Duration::from_millis(33),
            started_at: None,
        }
    }

    fn paint(&self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&self.color);
        }
        data
    }
}

impl ScreenSource for SolidColorScreenSource {
    fn configure(&mut self, width: u32, height: u32, frame_rate: u32) -> Result<(), ScreenSourceError> {
        if width == 0 || height == 0 {
            return Err(ScreenSourceError::Unavailable("zero-sized display".into()));
        }
        self.width = width;
        self.height = height;
        self.frame_period = Duration::from_millis(1000 / u64::from(frame_rate.max(1)));
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<PixelBuffer, ScreenSourceError> {
        let started_at = self
            .started_at
            .ok_or_else(|| ScreenSourceError::Unavailable("not configured".into()))?;

        sleep(self.frame_period);

        Ok(PixelBuffer {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra,
            data: self.paint(),
            timestamp_ms: started_at.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_rejects_zero_dimensions() {
        let mut src = SolidColorScreenSource::new([1, 2, 3, 4]);
        assert!(matches!(src.configure(0, 10, 30), Err(ScreenSourceError::Unavailable(_))));
    }

    #[test]
    fn frames_are_painted_with_the_configured_color() {
        let mut src = SolidColorScreenSource::new([10, 20, 30, 255]);
        src.configure(2, 2, 30).unwrap();
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.data.len(), 16);
        assert_eq!(&frame.data[0..4], &[10, 20, 30, 255]);
    }
}
