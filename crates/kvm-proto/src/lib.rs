//! Wire primitives and message model for the KVM session protocol (§2-§4.2
//! of the session spec): byte framing, integer endianness, message typing,
//! and the structured/binary transport multiplex built on top of them.

pub mod message;
pub mod transport;
pub mod wire;

pub use message::{
    ClipboardKind, GestureDirection, GestureKind, Message, MomentumPhase, MouseButton,
    MouseEventType, ScrollPhase,
};
pub use transport::{DemuxItem, Demultiplexer, FrameWriter, TransportError};
pub use wire::{FrameHeader, WireError, FRAME_HEADER_LEN, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
