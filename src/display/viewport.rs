/// Fraction of the placement that must be visible before loading
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.1;

/// How far below the fold loading may start early
pub const DEFAULT_PREFETCH_MARGIN_PX: f64 = 200.0;

/// One observation of the placement relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntersectionEntry {
    /// Partly or fully on screen; `ratio` is in `0.0..=1.0`
    Visible { ratio: f64 },
    /// Entirely off screen, `distance_px` away from the nearest viewport edge
    Offscreen { distance_px: f64 },
}

/// Single-shot viewport observer for one placement
#[derive(Debug, Clone)]
pub struct ViewportTrigger {
    threshold: f64,
    margin_px: f64,
    observing: bool,
}

impl Default for ViewportTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_THRESHOLD, DEFAULT_PREFETCH_MARGIN_PX)
    }
}

impl ViewportTrigger {
    pub fn new(threshold: f64, margin_px: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            margin_px: margin_px.max(0.0),
            observing: true,
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Returns `true` exactly once: on the first entry close enough to the
    /// viewport. The observer disconnects itself when it fires.
    pub fn observe(&mut self, entry: IntersectionEntry) -> bool {
        if !self.observing {
            return false;
        }

        let fire = match entry {
            IntersectionEntry::Visible { ratio } => ratio >= self.threshold,
            IntersectionEntry::Offscreen { distance_px } => distance_px <= self.margin_px,
        };

        if fire {
            self.disconnect();
        }
        fire
    }

    pub fn disconnect(&mut self) {
        self.observing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_threshold() {
        let mut trigger = ViewportTrigger::default();
        assert!(!trigger.observe(IntersectionEntry::Visible { ratio: 0.05 }));
        assert!(trigger.observe(IntersectionEntry::Visible { ratio: 0.1 }));
        assert!(!trigger.is_observing());
    }

    #[test]
    fn test_prefetch_margin() {
        let mut trigger = ViewportTrigger::new(0.1, 200.0);
        assert!(!trigger.observe(IntersectionEntry::Offscreen { distance_px: 600.0 }));
        assert!(trigger.observe(IntersectionEntry::Offscreen { distance_px: 150.0 }));
    }

    #[test]
    fn test_fires_at_most_once() {
        let mut trigger = ViewportTrigger::default();
        assert!(trigger.observe(IntersectionEntry::Visible { ratio: 1.0 }));
        assert!(!trigger.observe(IntersectionEntry::Visible { ratio: 1.0 }));
    }
}
