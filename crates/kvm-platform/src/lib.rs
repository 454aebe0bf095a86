//! Platform collaborator contracts (§6) and recording/stub test doubles
//! for each, per the "small trait-like abstractions ... testable with
//! stub implementations" design note (§9).

pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod input_sink;
pub mod input_tap;
pub mod permission;
pub mod screen;
pub mod virtual_display;

pub use cursor::{CursorControl, RecordingCursorControl};
pub use decoder::{DecodeEvent, DecoderError, StubVideoDecoder, VideoDecoder};
pub use encoder::{EncodedFrame, EncoderError, StubVideoEncoder, VideoEncoder};
pub use input_sink::{InputSink, RecordingInputSink, SinkCall};
pub use input_tap::{InputTap, InputTapEvent, RecordingInputTap};
pub use permission::{Permission, PermissionProbe, PermissionStatus, StubPermissionProbe};
pub use screen::{PixelBuffer, PixelFormat, ScreenSource, ScreenSourceError, StubScreenSource};
pub use virtual_display::{DisplayMode, StubVirtualDisplay, VirtualDisplay, VirtualDisplayError};
