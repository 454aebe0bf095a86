//! Screen-edge geometry and cooldown-gated trigger detection (§4.6),
//! shared by the Controller's left-edge detector and the Capture's
//! right-edge detector.

use std::time::{Duration, Instant};

/// Tunable defaults from §4.6.
pub const DEFAULT_EDGE_INSET: i32 = 1;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);
/// Capture-side suppression window after a `WarpCursor`, so the synthetic
/// warp has time to settle before the right edge can re-fire.
pub const WARP_SETTLE_WINDOW: Duration = Duration::from_millis(500);

/// The horizontal extent of a display (or the union of a display span),
/// in the coordinate space the cursor position is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub min_x: i32,
    pub max_x: i32,
}

/// Which edge a transition fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

/// Edge-triggered, cooldown-gated detector. One instance per side: the
/// Controller watches for [`Edge::Left`], the Capture for [`Edge::Right`].
#[derive(Debug)]
pub struct EdgeDetector {
    screen: Screen,
    edge_inset: i32,
    cooldown: Duration,
    last_trigger: Option<Instant>,
    suppressed_until: Option<Instant>,
}

impl EdgeDetector {
    #[must_use]
    pub fn new(screen: Screen) -> Self {
        Self::with_params(screen, DEFAULT_EDGE_INSET, DEFAULT_COOLDOWN)
    }

    #[must_use]
    pub fn with_params(screen: Screen, edge_inset: i32, cooldown: Duration) -> Self {
        Self {
            screen,
            edge_inset,
            cooldown,
            last_trigger: None,
            suppressed_until: None,
        }
    }

    /// Feed a cursor-move observation: absolute `x` and the delta `dx`
    /// that produced it. Returns the edge that fired, if any.
    ///
    /// `dx <= 0` (moving further left, or stationary at the boundary) is
    /// required for a left-edge fire; no delta condition is required for
    /// the right edge.
    pub fn on_move(&mut self, x: i32, dx: i32, now: Instant) -> Option<Edge> {
        if let Some(until) = self.suppressed_until {
            if now < until {
                return None;
            }
        }
        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) < self.cooldown {
                return None;
            }
        }

        let edge = if x <= self.screen.min_x + self.edge_inset && dx <= 0 {
            Some(Edge::Left)
        } else if x >= self.screen.max_x - self.edge_inset {
            Some(Edge::Right)
        } else {
            None
        };

        if edge.is_some() {
            self.last_trigger = Some(now);
        }
        edge
    }

    /// Arm the cooldown without a real trigger — used on REMOTE → LOCAL
    /// transition, where the warped-back cursor sits at the left edge and
    /// must not immediately re-fire it.
    pub fn arm_cooldown(&mut self, now: Instant) {
        self.last_trigger = Some(now);
    }

    /// Suppress right-edge firing for [`WARP_SETTLE_WINDOW`] after a
    /// `WarpCursor` lands, so the synthetic warp can settle.
    pub fn note_warp(&mut self, now: Instant) {
        self.suppressed_until = Some(now + WARP_SETTLE_WINDOW);
    }
}
