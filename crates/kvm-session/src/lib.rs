//! Session engine: the control state machine, display-mode negotiation,
//! and the per-session reactor that ties the wire protocol (`kvm-proto`)
//! to the platform collaborators (`kvm-platform`) on both the Controller
//! and Capture sides (§4.5, §5, §9).

pub mod capture;
pub mod capture_worker;
pub mod controller;
pub mod display;
pub mod error;
pub mod gesture;
pub mod handoff;
pub mod video_health;

pub use capture::{CaptureConfig, CaptureSession, KEYFRAME_PERIOD};
pub use capture_worker::{CaptureEvent, CaptureWorkerHandle};
pub use controller::{ControllerConfig, ControllerSession};
pub use display::DisplayNegotiator;
pub use error::SessionError;
pub use gesture::apply_gesture;
pub use handoff::{CaptureHandoff, ControllerHandoff, HandoffError, HandoffState};
pub use video_health::VideoHealth;
