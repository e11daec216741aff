//! Boundary sentinels and the monitor that reports when they near the viewport.

use std::collections::HashMap;

use tracing::trace;

/// Markers placed at the first and last materialized rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Leading,
    Trailing,
}

/// Reports whether boundary sentinels are close to the visible area.
///
/// Implementations must tolerate repeated `observe`/`unobserve` calls and
/// never report an unregistered sentinel as near.
pub trait ProximityMonitor {
    fn observe(&mut self, sentinel: Sentinel);

    fn unobserve(&mut self, sentinel: Sentinel);

    /// Moves a sentinel to a vertical content offset.
    fn place(&mut self, sentinel: Sentinel, offset: f32);

    fn is_near(&self, sentinel: Sentinel) -> bool;

    /// Visible `(top, bottom)` in content coordinates, when known.
    fn viewport_span(&self) -> Option<(f32, f32)> {
        None
    }
}

/// Geometric monitor driven by scroll offset and viewport height.
#[derive(Debug, Clone)]
pub struct ScrollProximity {
    threshold: f32,
    viewport_top: f32,
    viewport_height: f32,
    sentinels: HashMap<Sentinel, Option<f32>>,
}

impl ScrollProximity {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            viewport_top: 0.0,
            viewport_height: 0.0,
            sentinels: HashMap::new(),
        }
    }

    pub fn set_viewport(&mut self, top: f32, height: f32) {
        self.viewport_top = if top.is_finite() { top.max(0.0) } else { 0.0 };
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        trace!(top = self.viewport_top, height = self.viewport_height, "viewport moved");
    }

    pub fn viewport_top(&self) -> f32 {
        self.viewport_top
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    #[cfg(test)]
    pub fn is_observed(&self, sentinel: Sentinel) -> bool {
        self.sentinels.contains_key(&sentinel)
    }
}

impl ProximityMonitor for ScrollProximity {
    fn observe(&mut self, sentinel: Sentinel) {
        self.sentinels.entry(sentinel).or_insert(None);
    }

    fn unobserve(&mut self, sentinel: Sentinel) {
        self.sentinels.remove(&sentinel);
    }

    fn place(&mut self, sentinel: Sentinel, offset: f32) {
        if let Some(slot) = self.sentinels.get_mut(&sentinel) {
            *slot = Some(offset);
        }
    }

    fn is_near(&self, sentinel: Sentinel) -> bool {
        let Some(Some(offset)) = self.sentinels.get(&sentinel).copied() else {
            return false;
        };
        match sentinel {
            Sentinel::Leading => offset >= self.viewport_top - self.threshold,
            Sentinel::Trailing => {
                offset <= self.viewport_top + self.viewport_height + self.threshold
            }
        }
    }

    fn viewport_span(&self) -> Option<(f32, f32)> {
        Some((self.viewport_top, self.viewport_top + self.viewport_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_sentinels_are_never_near() {
        let mut monitor = ScrollProximity::new(300.0);
        monitor.place(Sentinel::Leading, 0.0);
        assert!(!monitor.is_near(Sentinel::Leading));

        monitor.observe(Sentinel::Leading);
        // Observed but not yet placed.
        assert!(!monitor.is_near(Sentinel::Leading));
        monitor.place(Sentinel::Leading, 0.0);
        assert!(monitor.is_near(Sentinel::Leading));

        monitor.unobserve(Sentinel::Leading);
        monitor.unobserve(Sentinel::Leading);
        assert!(!monitor.is_near(Sentinel::Leading));
    }

    #[test]
    fn test_observe_is_idempotent() {
        let mut monitor = ScrollProximity::new(300.0);
        monitor.observe(Sentinel::Trailing);
        monitor.place(Sentinel::Trailing, 100.0);
        monitor.observe(Sentinel::Trailing);
        monitor.set_viewport(0.0, 400.0);
        assert!(monitor.is_near(Sentinel::Trailing));
    }

    #[test]
    fn test_threshold_geometry() {
        let mut monitor = ScrollProximity::new(300.0);
        monitor.observe(Sentinel::Leading);
        monitor.observe(Sentinel::Trailing);
        monitor.set_viewport(1000.0, 400.0);

        monitor.place(Sentinel::Leading, 600.0);
        assert!(!monitor.is_near(Sentinel::Leading));
        monitor.place(Sentinel::Leading, 700.0);
        assert!(monitor.is_near(Sentinel::Leading));
        monitor.place(Sentinel::Leading, 5000.0);
        assert!(monitor.is_near(Sentinel::Leading));

        monitor.place(Sentinel::Trailing, 1700.0);
        assert!(monitor.is_near(Sentinel::Trailing));
        monitor.place(Sentinel::Trailing, 1701.0);
        assert!(!monitor.is_near(Sentinel::Trailing));
        monitor.place(Sentinel::Trailing, 0.0);
        assert!(monitor.is_near(Sentinel::Trailing));

        assert_eq!(monitor.viewport_span(), Some((1000.0, 1400.0)));
    }
}
