//! Camera-blocked heuristic: a frame whose mean brightness is nearly black
//! means the lens is covered.

/// Mean RGB brightness below which a frame counts as blocked.
pub const BLOCKED_BRIGHTNESS: f64 = 20.0;

#[must_use]
pub fn is_blocked(brightness: f64) -> bool {
    brightness < BLOCKED_BRIGHTNESS
}

/// Tracks the blocked/unblocked edge so a covered lens counts once per episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockDetector {
    blocked: bool,
}

impl BlockDetector {
    /// Feed one brightness sample. Returns true only on the transition into blocked.
    pub fn observe(&mut self, brightness: f64) -> bool {
        let now_blocked = is_blocked(brightness);
        let entered = now_blocked && !self.blocked;
        self.blocked = now_blocked;
        entered
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}
