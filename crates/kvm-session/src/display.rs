//! Display-mode negotiation (§4.8).

/// A `DesiredDisplayMode` is only honoured if it differs from the
/// currently pending mode by more than this many pixels, in either
/// dimension.
pub const REDUNDANT_MODE_THRESHOLD_PX: i64 = 100;

/// Tracks the Capture side's currently pending requested mode and
/// decides whether a newly received `DesiredDisplayMode` should be
/// acted on.
#[derive(Debug, Default)]
pub struct DisplayNegotiator {
    pending: Option<(u32, u32)>,
}

impl DisplayNegotiator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this proposal differs enough from the pending
    /// one (or there is no pending one yet) to act on, and records it as
    /// the new pending mode when it does.
    pub fn propose(&mut self, width: u32, height: u32) -> bool {
        let honor = match self.pending {
            None => true,
            Some((pw, ph)) => {
                (i64::from(width) - i64::from(pw)).abs() > REDUNDANT_MODE_THRESHOLD_PX
                    || (i64::from(height) - i64::from(ph)).abs() > REDUNDANT_MODE_THRESHOLD_PX
            }
        };
        if honor {
            self.pending = Some((width, height));
        }
        honor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_proposal_is_always_honoured() {
        let mut neg = DisplayNegotiator::new();
        assert!(neg.propose(3840, 2160));
    }

    #[test]
    fn exactly_threshold_difference_is_not_honoured() {
        let mut neg = DisplayNegotiator::new();
        neg.propose(3840, 2160);
        assert!(!neg.propose(3940, 2160));
        assert!(!neg.propose(3840, 2260));
    }

    #[test]
    fn past_threshold_difference_is_honoured() {
        let mut neg = DisplayNegotiator::new();
        neg.propose(3840, 2160);
        assert!(neg.propose(3941, 2160));
        assert!(neg.propose(3840, 2261));
    }

    #[test]
    fn negative_direction_change_also_counts() {
        let mut neg = DisplayNegotiator::new();
        neg.propose(3840, 2160);
        assert!(neg.propose(3000, 2160));
    }
}
