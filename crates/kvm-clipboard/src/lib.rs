//! Text clipboard synchronisation (§4.7).

pub mod provider;
pub mod syncer;

pub use provider::{ArboardClipboard, ClipboardError, ClipboardProvider, StubClipboard};
pub use syncer::{ClipboardSyncer, ClipboardUpdate, MAX_PAYLOAD_BYTES, POLL_INTERVAL};
