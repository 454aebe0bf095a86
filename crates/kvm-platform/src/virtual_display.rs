//! Virtual-display creation (§4.8): the Capture side attempts to create a
//! virtual display at the Controller's requested mode, falling back to
//! mirroring the primary display when creation fails or is unsupported.

use thiserror::Error;

/// A realised display mode, reported back to the Controller as
/// `VirtualDisplayReady` (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub display_id: u32,
    pub is_virtual: bool,
}

#[derive(Debug, Error)]
pub enum VirtualDisplayError {
    #[error("virtual display creation failed: {0}")]
    CreateFailed(String),
}

/// Creates (or resizes) a virtual display, or reports the real primary
/// display's mode as the mirror-mode fallback (§7 Resource: "cannot
/// create virtual display → fall back to mirror mode; not fatal").
pub trait VirtualDisplay: Send {
    fn primary_mode(&self) -> DisplayMode;

    /// Attempt to create a virtual display at `(width, height, scale,
    /// refresh_rate)`. On `Err`, the caller falls back to
    /// [`VirtualDisplay::primary_mode`].
    fn create(
        &mut self,
        width: u32,
        height: u32,
        scale: f64,
        refresh_rate: u32,
    ) -> Result<DisplayMode, VirtualDisplayError>;
}

/// Test double with a settable primary mode and success/failure toggle.
pub struct StubVirtualDisplay {
    primary: DisplayMode,
    should_fail: bool,
    next_display_id: u32,
    pub create_calls: Vec<(u32, u32, f64, u32)>,
}

impl StubVirtualDisplay {
    #[must_use]
    pub fn new(primary: DisplayMode) -> Self {
        Self { primary, should_fail: false, next_display_id: 100, create_calls: Vec::new() }
    }

    #[must_use]
    pub fn always_fails(primary: DisplayMode) -> Self {
        Self { should_fail: true, ..Self::new(primary) }
    }
}

impl VirtualDisplay for StubVirtualDisplay {
    fn primary_mode(&self) -> DisplayMode {
        self.primary
    }

    fn create(
        &mut self,
        width: u32,
        height: u32,
        scale: f64,
        refresh_rate: u32,
    ) -> Result<DisplayMode, VirtualDisplayError> {
        self.create_calls.push((width, height, scale, refresh_rate));
        if self.should_fail {
            return Err(VirtualDisplayError::CreateFailed("stub configured to fail".into()));
        }
        let display_id = self.next_display_id;
        self.next_display_id += 1;
        Ok(DisplayMode { width, height, scale, display_id, is_virtual: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> DisplayMode {
        DisplayMode { width: 1920, height: 1080, scale: 1.0, display_id: 1, is_virtual: false }
    }

    #[test]
    fn successful_create_reports_requested_geometry_as_virtual() {
        let mut vd = StubVirtualDisplay::new(primary());
        let mode = vd.create(3840, 2160, 2.0, 60).unwrap();
        assert_eq!(mode, DisplayMode { width: 3840, height: 2160, scale: 2.0, display_id: 100, is_virtual: true });
    }

    #[test]
    fn failed_create_leaves_primary_mode_as_fallback() {
        let mut vd = StubVirtualDisplay::always_fails(primary());
        assert!(vd.create(3840, 2160, 2.0, 60).is_err());
        assert_eq!(vd.primary_mode(), primary());
    }
}
