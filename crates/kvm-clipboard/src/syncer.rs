//! Polling clipboard synchronisation with monotonic-id debounce (§4.7).
//!
//! This crate owns the comparison/debounce logic only; the 200 ms poll
//! cadence itself is driven by the caller (the session reactor's
//! `tokio::time::interval`), per §5's rule that only I/O, the clipboard
//! poll timer, and the capture callback are asynchronous suspension
//! points — this crate has no async dependency at all.

use std::time::Duration;

use crate::provider::{ClipboardError, ClipboardProvider};

/// §4.7 poll cadence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Payloads larger than this are dropped rather than synced.
pub const MAX_PAYLOAD_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardUpdate {
    pub id: u64,
    pub text: String,
}

/// Wraps a [`ClipboardProvider`] with the change-detection and
/// apply-debounce state machine from §4.7.
pub struct ClipboardSyncer<P> {
    provider: P,
    last_observed: Option<String>,
    next_id: u64,
    last_applied_id: Option<u64>,
}

impl<P: ClipboardProvider> ClipboardSyncer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            last_observed: None,
            next_id: 0,
            last_applied_id: None,
        }
    }

    /// Sample the local clipboard. Returns an update to send when the
    /// content changed since the last call (by either side — local user
    /// copy or our own `apply_remote`), is non-empty, and is within the
    /// size cap.
    pub fn poll_local(&mut self) -> Result<Option<ClipboardUpdate>, ClipboardError> {
        let Some(text) = self.provider.read_text()? else {
            return Ok(None);
        };
        if text.is_empty() || text.len() > MAX_PAYLOAD_BYTES {
            return Ok(None);
        }
        if self.last_observed.as_deref() == Some(text.as_str()) {
            return Ok(None);
        }
        self.last_observed = Some(text.clone());
        self.next_id += 1;
        Ok(Some(ClipboardUpdate { id: self.next_id, text }))
    }

    /// Apply an inbound `Clipboard` message. Returns `true` if it was
    /// actually applied (id differed from the last applied one).
    ///
    /// After applying, `last_observed` is updated to the applied text so
    /// the next `poll_local` does not re-emit it as a fresh local change
    /// (the "re-reads change-counter after apply" rule in §4.7).
    pub fn apply_remote(&mut self, id: u64, text: String) -> Result<bool, ClipboardError> {
        if self.last_applied_id == Some(id) {
            return Ok(false);
        }
        self.provider.write_text(&text)?;
        self.last_applied_id = Some(id);
        self.last_observed = Some(text);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StubClipboard;

    #[test]
    fn local_change_emits_update_with_incrementing_id() {
        let stub = StubClipboard::new();
        stub.push_external("hello");
        let mut syncer = ClipboardSyncer::new(stub);

        let update = syncer.poll_local().unwrap().unwrap();
        assert_eq!(update, ClipboardUpdate { id: 1, text: "hello".into() });

        // No change: no update.
        assert!(syncer.poll_local().unwrap().is_none());
    }

    #[test]
    fn apply_remote_is_idempotent_on_repeated_id() {
        let stub = StubClipboard::new();
        let mut syncer = ClipboardSyncer::new(stub);

        assert!(syncer.apply_remote(1, "from peer".into()).unwrap());
        // Re-sent id=1: ignored, no second write, no echo.
        assert!(!syncer.apply_remote(1, "from peer".into()).unwrap());
    }

    #[test]
    fn applying_remote_text_does_not_echo_back_on_next_poll() {
        let stub = StubClipboard::new();
        let mut syncer = ClipboardSyncer::new(stub);

        syncer.apply_remote(1, "from peer".into()).unwrap();
        // The stub's content now equals the applied text; polling must
        // not treat this as a fresh local change.
        assert!(syncer.poll_local().unwrap().is_none());
    }

    #[test]
    fn empty_and_oversized_payloads_are_not_synced() {
        let stub = StubClipboard::new();
        stub.push_external("");
        let mut syncer = ClipboardSyncer::new(stub);
        assert!(syncer.poll_local().unwrap().is_none());

        let stub = StubClipboard::new();
        stub.push_external("x".repeat(MAX_PAYLOAD_BYTES + 1));
        let mut syncer = ClipboardSyncer::new(stub);
        assert!(syncer.poll_local().unwrap().is_none());
    }
}
