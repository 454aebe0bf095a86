//! Clipboard backends: a real one over [`arboard`] (grounded in the
//! teacher's `clipboard.rs`, which reaches for the same crate) and an
//! in-memory stub for tests.

use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard backend unavailable: {0}")]
    Backend(String),
}

/// Minimal text-clipboard contract the syncer needs. Only plain text is in
/// scope (§4.7), matching the teacher's own CF_UNICODETEXT/CF_TEXT-only
/// clipboard backend.
pub trait ClipboardProvider {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError>;
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Real system clipboard access via `arboard`.
pub struct ArboardClipboard {
    inner: arboard::Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = arboard::Clipboard::new().map_err(|e| ClipboardError::Backend(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardProvider for ArboardClipboard {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipboardError::Backend(e.to_string())),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text.to_owned())
            .map_err(|e| ClipboardError::Backend(e.to_string()))
    }
}

/// In-memory stand-in for tests and for environments without clipboard
/// access (headless hosts). `push_external` simulates a change made by
/// something other than [`ClipboardSyncer`], as would happen when the
/// user actually copies something locally.
#[derive(Debug, Default)]
pub struct StubClipboard {
    content: Mutex<Option<String>>,
}

impl StubClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_external(&self, text: impl Into<String>) {
        *self.content.lock().unwrap() = Some(text.into());
    }
}

impl ClipboardProvider for StubClipboard {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        Ok(self.content.lock().unwrap().clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        *self.content.lock().unwrap() = Some(text.to_owned());
        Ok(())
    }
}
