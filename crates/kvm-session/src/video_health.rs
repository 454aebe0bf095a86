//! Video-unavailable tracking (§7 Codec error taxonomy: "if three
//! consecutive keyframes fail, surface a user-visible 'video unavailable'
//! state while continuing input forwarding").

/// Consecutive failed keyframe decodes before surfacing "video
/// unavailable".
pub const CONSECUTIVE_KEYFRAME_FAILURE_LIMIT: u32 = 3;

#[derive(Debug, Default)]
pub struct VideoHealth {
    consecutive_keyframe_failures: u32,
    unavailable: bool,
}

impl VideoHealth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// A keyframe failed to decode (e.g. missing parameter set). Returns
    /// `true` the moment this failure pushes the state into
    /// "unavailable" (i.e. the caller should surface the user-visible
    /// error now, not on every subsequent failure).
    pub fn record_keyframe_failure(&mut self) -> bool {
        self.consecutive_keyframe_failures += 1;
        if self.consecutive_keyframe_failures >= CONSECUTIVE_KEYFRAME_FAILURE_LIMIT && !self.unavailable {
            self.unavailable = true;
            return true;
        }
        false
    }

    /// A keyframe decoded successfully: clear the run and, if we were
    /// unavailable, recover.
    pub fn record_keyframe_success(&mut self) {
        self.consecutive_keyframe_failures = 0;
        self.unavailable = false;
    }

    /// A non-keyframe slice was dropped (missing parameter set): per §7
    /// this waits for the next keyframe and does not itself count toward
    /// the keyframe-failure limit.
    pub fn record_slice_dropped(&self) {
        tracing::debug!("dropping slice with no known parameter set, awaiting next keyframe");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_consecutive_keyframe_failures_surface_unavailable_once() {
        let mut health = VideoHealth::new();
        assert!(!health.record_keyframe_failure());
        assert!(!health.record_keyframe_failure());
        assert!(health.record_keyframe_failure());
        assert!(health.is_unavailable());
        // Further failures don't re-surface the transition.
        assert!(!health.record_keyframe_failure());
    }

    #[test]
    fn success_resets_and_recovers() {
        let mut health = VideoHealth::new();
        health.record_keyframe_failure();
        health.record_keyframe_failure();
        health.record_keyframe_failure();
        assert!(health.is_unavailable());
        health.record_keyframe_success();
        assert!(!health.is_unavailable());
        assert!(!health.record_keyframe_failure());
        assert!(!health.record_keyframe_failure());
    }
}
