//! Session-level error type (§7).

use kvm_clipboard::ClipboardError;
use kvm_platform::{DecoderError, EncoderError, ScreenSourceError};
use kvm_proto::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Decoder(#[from] DecoderError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    #[error(transparent)]
    ScreenSource(#[from] ScreenSourceError),
}
