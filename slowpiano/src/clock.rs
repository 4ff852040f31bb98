//! Scroll clock
//!
//! Turns frame timestamps into a scroll distance. Position is derived from
//! elapsed wall-clock time, not frame count, so the roll moves at the same
//! speed at 30 fps and at 144 fps and shrugs off dropped frames.

/// Monotonic scroll position in pixels.
#[derive(Debug, Clone)]
pub struct ScrollClock {
    /// Pixels per second
    rate: f64,
    position: f64,
    /// Timestamp (seconds) of the previous frame, if any
    last: Option<f64>,
}

impl ScrollClock {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            position: 0.0,
            last: None,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Advance to the frame at `now` (seconds, any epoch) and return the
    /// distance moved.
    ///
    /// The first frame after construction or [`reset_anchor`] only records
    /// its timestamp. A timestamp that goes backwards or is not finite
    /// re-anchors without moving.
    ///
    /// [`reset_anchor`]: ScrollClock::reset_anchor
    pub fn advance(&mut self, now: f64) -> f64 {
        if !now.is_finite() {
            log::trace!("ignoring non-finite frame timestamp");
            return 0.0;
        }
        let dt = match self.last.replace(now) {
            Some(prev) if now >= prev => now - prev,
            Some(prev) => {
                log::debug!("frame clock went backwards ({} -> {}), re-anchoring", prev, now);
                0.0
            }
            None => 0.0,
        };
        let step = self.rate * dt;
        self.position += step;
        step
    }

    /// Forget the previous timestamp so the next frame does not jump by
    /// however long the roll was paused or unmounted.
    pub fn reset_anchor(&mut self) {
        self.last = None;
    }
}
