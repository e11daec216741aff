//! The materialized index window.
//!
//! `WindowManager` owns the inclusive range of indices that currently have
//! view elements. Every mutation returns a `WindowDiff` listing exactly the
//! indices that must be destroyed and created; callers apply removals first.

use tracing::trace;

use crate::config::DEFAULT_STRIDE_ROWS;
use crate::layout::GridLayout;

/// Inclusive range of materialized indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
}

impl WindowRange {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// Indices leaving and entering the window, both ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowDiff {
    pub removed: Vec<usize>,
    pub created: Vec<usize>,
}

impl WindowDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.created.is_empty()
    }

    fn between(old: Option<WindowRange>, new: Option<WindowRange>) -> Self {
        let mut diff = Self::default();
        if let Some(old) = old {
            diff.removed = (old.start..=old.end)
                .filter(|&i| !new.is_some_and(|n| n.contains(i)))
                .collect();
        }
        if let Some(new) = new {
            diff.created = (new.start..=new.end)
                .filter(|&i| !old.is_some_and(|o| o.contains(i)))
                .collect();
        }
        diff
    }

    fn replace(old: Option<WindowRange>, new: Option<WindowRange>) -> Self {
        Self {
            removed: old.map(|r| (r.start..=r.end).collect()).unwrap_or_default(),
            created: new.map(|r| (r.start..=r.end).collect()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowManager {
    range: Option<WindowRange>,
    max_index: Option<usize>,
    capacity: usize,
    columns: usize,
    stride_rows: usize,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(DEFAULT_STRIDE_ROWS)
    }
}

impl WindowManager {
    pub fn new(stride_rows: usize) -> Self {
        Self {
            range: None,
            max_index: None,
            capacity: 0,
            columns: 1,
            stride_rows: stride_rows.max(1),
        }
    }

    /// Builds a manager around an explicit range, bypassing layout.
    #[cfg(test)]
    pub fn with_state(
        range: WindowRange,
        max_index: usize,
        capacity: usize,
        columns: usize,
    ) -> Self {
        Self {
            range: Some(range),
            max_index: Some(max_index),
            capacity,
            columns: columns.max(1),
            stride_rows: DEFAULT_STRIDE_ROWS,
        }
    }

    pub fn range(&self) -> Option<WindowRange> {
        self.range
    }

    #[cfg(test)]
    pub fn max_index(&self) -> Option<usize> {
        self.max_index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range.is_some_and(|r| r.contains(index))
    }

    /// True when the window cannot move further backwards.
    pub fn at_start(&self) -> bool {
        self.range.map_or(true, |r| r.start == 0)
    }

    /// True when the window cannot move further forwards.
    pub fn at_end(&self) -> bool {
        match (self.range, self.max_index) {
            (Some(r), Some(max)) => r.end == max,
            _ => true,
        }
    }

    fn stride(&self) -> usize {
        self.columns * self.stride_rows
    }

    fn adopt(&mut self, layout: &GridLayout) {
        self.max_index = layout.max_index;
        self.capacity = layout.capacity.max(1);
        self.columns = layout.columns.max(1);
    }

    /// Places the window at the top of a freshly computed layout.
    pub fn initialize(&mut self, layout: &GridLayout) -> WindowDiff {
        let old = self.range;
        self.adopt(layout);
        self.range = self.max_index.map(|max| WindowRange {
            start: 0,
            end: (self.capacity - 1).min(max),
        });
        trace!(range = ?self.range, "window initialized");
        WindowDiff::replace(old, self.range)
    }

    /// Adopts new geometry without moving the window.
    ///
    /// Callers follow this with a dropping `shift_range`, since old indices
    /// no longer map to the same positions.
    pub fn relayout(&mut self, layout: &GridLayout) {
        self.adopt(layout);
    }

    pub fn shift_forwards(&mut self) -> WindowDiff {
        let (Some(old), Some(max)) = (self.range, self.max_index) else {
            return WindowDiff::default();
        };
        let distance = self.stride().min(max.saturating_sub(old.end));
        if distance == 0 {
            return WindowDiff::default();
        }

        let new = WindowRange {
            start: old.start + distance,
            end: old.end + distance,
        };
        // When the stride exceeds the window the two ranges do not overlap.
        let diff = WindowDiff {
            removed: (old.start..new.start.min(old.end + 1)).collect(),
            created: ((old.end + 1).max(new.start)..=new.end).collect(),
        };
        trace!(?old, ?new, distance, "window shifted forwards");
        self.range = Some(new);
        diff
    }

    pub fn shift_backwards(&mut self) -> WindowDiff {
        let Some(old) = self.range else {
            return WindowDiff::default();
        };
        let distance = self.stride().min(old.start);
        if distance == 0 {
            return WindowDiff::default();
        }

        let new = WindowRange {
            start: old.start - distance,
            end: old.end - distance,
        };
        let diff = WindowDiff {
            removed: ((new.end + 1).max(old.start)..=old.end).collect(),
            created: (new.start..old.start.min(new.end + 1)).collect(),
        };
        trace!(?old, ?new, distance, "window shifted backwards");
        self.range = Some(new);
        diff
    }

    /// Moves the window to an absolute start index.
    ///
    /// The target is clamped to `[0, max_index]` and aligned to the start of
    /// its row. A target too close to the end is pulled back so the window
    /// still holds `capacity` indices. With `drop_existing` every current
    /// index is removed and the whole new range created, even where the two
    /// overlap.
    pub fn shift_range(&mut self, target_start: usize, drop_existing: bool) -> WindowDiff {
        let old = self.range;
        let Some(max) = self.max_index else {
            self.range = None;
            return WindowDiff::replace(old, None);
        };

        let clamped = target_start.min(max);
        // `capacity` and `max + 1` are both whole rows, so this stays aligned.
        let last_full_start = (max + 1).saturating_sub(self.capacity);
        let start = (clamped - clamped % self.columns).min(last_full_start);
        let new = WindowRange {
            start,
            end: (start + self.capacity - 1).min(max),
        };
        self.range = Some(new);
        trace!(?old, ?new, drop_existing, "window recentered");

        if drop_existing {
            WindowDiff::replace(old, Some(new))
        } else {
            WindowDiff::between(old, Some(new))
        }
    }

    /// Removes the whole window.
    pub fn teardown(&mut self) -> WindowDiff {
        let old = self.range.take();
        WindowDiff::replace(old, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout, CellSize};
    use std::collections::BTreeSet;

    const CELL: CellSize = CellSize::new(150.0, 100.0);

    fn range(start: usize, end: usize) -> WindowRange {
        WindowRange { start, end }
    }

    fn assert_invariant(wm: &WindowManager) {
        if let (Some(r), Some(max)) = (wm.range(), wm.max_index()) {
            assert!(r.start <= r.end, "{:?}", r);
            assert!(r.end <= max, "{:?} max {}", r, max);
            if r.start > 0 && r.end < max {
                assert_eq!(r.len(), wm.capacity());
            }
        }
    }

    /// Applies diffs to a set and checks it always equals the window.
    fn apply(live: &mut BTreeSet<usize>, diff: &WindowDiff) {
        for i in &diff.removed {
            live.remove(i);
        }
        for i in &diff.created {
            live.insert(*i);
        }
    }

    fn live_matches(live: &BTreeSet<usize>, wm: &WindowManager) {
        let expected: BTreeSet<usize> = wm
            .range()
            .map(|r| (r.start..=r.end).collect())
            .unwrap_or_default();
        assert_eq!(*live, expected);
    }

    #[test]
    fn test_initialize_reference_layout() {
        let layout = compute_layout(700.0, 400.0, 10, CELL, 25.0);
        let mut wm = WindowManager::default();
        let diff = wm.initialize(&layout);
        let expected_end = (layout.capacity - 1).min(11);
        assert_eq!(wm.range(), Some(range(0, expected_end)));
        assert_eq!(diff.created, (0..=expected_end).collect::<Vec<_>>());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_initialize_empty() {
        let layout = compute_layout(700.0, 400.0, 0, CELL, 25.0);
        let mut wm = WindowManager::default();
        assert!(wm.initialize(&layout).is_empty());
        assert_eq!(wm.range(), None);
        assert!(wm.shift_forwards().is_empty());
        assert!(wm.shift_backwards().is_empty());
        assert!(wm.shift_range(10, false).is_empty());
    }

    #[test]
    fn test_shift_forwards_reference_case() {
        let mut wm = WindowManager::with_state(range(0, 15), 39, 16, 4);
        let diff = wm.shift_forwards();
        assert_eq!(wm.range(), Some(range(20, 35)));
        assert_eq!(diff.removed, (0..=15).collect::<Vec<_>>());
        assert_eq!(diff.created, (20..=35).collect::<Vec<_>>());

        let mut live: BTreeSet<usize> = (0..=15).collect();
        apply(&mut live, &diff);
        assert_eq!(live, (20..=35).collect());
    }

    #[test]
    fn test_shift_forwards_overlapping() {
        let mut wm = WindowManager::with_state(range(0, 79), 399, 80, 4);
        let diff = wm.shift_forwards();
        assert_eq!(wm.range(), Some(range(20, 99)));
        assert_eq!(diff.removed, (0..20).collect::<Vec<_>>());
        assert_eq!(diff.created, (80..=99).collect::<Vec<_>>());
    }

    #[test]
    fn test_shift_forwards_clamps_at_end() {
        let mut wm = WindowManager::with_state(range(0, 79), 87, 80, 4);
        let diff = wm.shift_forwards();
        assert_eq!(wm.range(), Some(range(8, 87)));
        assert_eq!(diff.created.len(), 8);
        assert!(wm.at_end());
        assert!(wm.shift_forwards().is_empty());
    }

    #[test]
    fn test_shift_backwards_clamps_at_start() {
        let mut wm = WindowManager::with_state(range(8, 87), 399, 80, 4);
        let diff = wm.shift_backwards();
        assert_eq!(wm.range(), Some(range(0, 79)));
        assert_eq!(diff.removed, (80..=87).collect::<Vec<_>>());
        assert_eq!(diff.created, (0..8).collect::<Vec<_>>());
        assert!(wm.shift_backwards().is_empty());
    }

    #[test]
    fn test_forwards_then_backwards_round_trip() {
        let mut wm = WindowManager::with_state(range(40, 119), 399, 80, 4);
        let before = wm.range();
        wm.shift_forwards();
        wm.shift_backwards();
        assert_eq!(wm.range(), before);
    }

    #[test]
    fn test_disjoint_backwards_shift() {
        let mut wm = WindowManager::with_state(range(40, 47), 399, 8, 4);
        let mut live: BTreeSet<usize> = (40..=47).collect();
        let diff = wm.shift_backwards();
        assert_eq!(wm.range(), Some(range(20, 27)));
        apply(&mut live, &diff);
        live_matches(&live, &wm);
    }

    #[test]
    fn test_shift_range_diff_and_drop() {
        let mut wm = WindowManager::with_state(range(0, 79), 399, 80, 4);
        let diff = wm.shift_range(42, false);
        // 42 aligns down to the start of its row.
        assert_eq!(wm.range(), Some(range(40, 119)));
        assert_eq!(diff.removed, (0..40).collect::<Vec<_>>());
        assert_eq!(diff.created, (80..=119).collect::<Vec<_>>());

        let diff = wm.shift_range(40, true);
        assert_eq!(diff.removed, (40..=119).collect::<Vec<_>>());
        assert_eq!(diff.created, (40..=119).collect::<Vec<_>>());
    }

    #[test]
    fn test_shift_range_clamps_target() {
        let mut wm = WindowManager::with_state(range(0, 79), 399, 80, 4);
        wm.shift_range(10_000, false);
        assert_eq!(wm.range(), Some(range(320, 399)));
        assert_invariant(&wm);
    }

    #[test]
    fn test_jump_to_end_then_scroll_up_keeps_capacity() {
        let layout = compute_layout(700.0, 400.0, 1000, CELL, 25.0);
        let mut wm = WindowManager::default();
        let mut live = BTreeSet::new();
        apply(&mut live, &wm.initialize(&layout));

        apply(&mut live, &wm.shift_range(990, false));
        let after_jump = wm.range().unwrap();
        assert_eq!(after_jump.end, 999);
        assert_eq!(after_jump.len(), wm.capacity());
        assert_eq!(after_jump.start % wm.columns(), 0);

        for _ in 0..2 {
            apply(&mut live, &wm.shift_backwards());
            let r = wm.range().unwrap();
            assert_eq!(r.len(), wm.capacity());
            live_matches(&live, &wm);
        }
    }

    #[test]
    fn test_shift_range_short_collection_keeps_start() {
        // Fewer items than capacity: the window covers everything from 0.
        let mut wm = WindowManager::with_state(range(0, 11), 11, 80, 4);
        wm.shift_range(8, false);
        assert_eq!(wm.range(), Some(range(0, 11)));
    }

    #[test]
    fn test_teardown() {
        let mut wm = WindowManager::with_state(range(4, 11), 39, 8, 4);
        let diff = wm.teardown();
        assert_eq!(diff.removed, (4..=11).collect::<Vec<_>>());
        assert_eq!(wm.range(), None);
    }

    #[test]
    fn test_invariant_under_mixed_sequences() {
        for n in [1usize, 3, 17, 100, 999] {
            for viewport in [150.0f32, 700.0, 1900.0] {
                let layout = compute_layout(viewport, 300.0, n, CELL, 25.0);
                let mut wm = WindowManager::default();
                let mut live = BTreeSet::new();
                apply(&mut live, &wm.initialize(&layout));
                live_matches(&live, &wm);

                // Deterministic pseudo-random walk over the operations.
                let mut state = (n as u64) * 31 + viewport as u64;
                for _ in 0..200 {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let diff = match (state >> 33) % 5 {
                        0 | 1 => wm.shift_forwards(),
                        2 | 3 => wm.shift_backwards(),
                        _ => {
                            let target = ((state >> 17) as usize) % (n + 10);
                            wm.shift_range(target, (state & 1) == 0)
                        }
                    };
                    apply(&mut live, &diff);
                    assert_invariant(&wm);
                    live_matches(&live, &wm);
                }
            }
        }
    }

    #[test]
    fn test_shift_cost_is_bounded_by_stride() {
        let layout = compute_layout(700.0, 400.0, 10_000, CELL, 25.0);
        let mut wm = WindowManager::default();
        wm.initialize(&layout);
        let diff = wm.shift_forwards();
        assert_eq!(diff.created.len(), layout.columns * DEFAULT_STRIDE_ROWS);
        assert_eq!(diff.removed.len(), layout.columns * DEFAULT_STRIDE_ROWS);
    }
}
