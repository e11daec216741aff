//! `VirtualGrid`: one layout, window, selection and adapter around a collection.
//!
//! The grid is driven entirely by its host: viewport changes arrive through
//! the proximity monitor followed by `on_proximity_signal` (or the periodic
//! `recheck`), resizes through `resize`, and input through `on_pointer` and
//! `on_key`. Nothing here touches an item that is not materialized except
//! through the collection itself.

use tracing::{debug, info, trace, warn};

use crate::config::GridConfig;
use crate::error::GridResult;
use crate::grid::adapter::{ElementField, RenderSurface, ViewAdapter};
use crate::grid::input::{Direction, GridKey, PointerButton, PointerEvent};
use crate::grid::proximity::{ProximityMonitor, ScrollProximity, Sentinel};
use crate::grid::selection::{SelectionDelta, SelectionModel};
use crate::grid::window::{WindowDiff, WindowManager, WindowRange};
use crate::layout::GridLayout;
use crate::models::ItemCollection;

/// How a reconciliation pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No sentinel asked for another shift.
    Settled { steps: usize },
    /// Stopped at the step limit with shifts still pending.
    Capped { steps: usize },
}

impl ReconcileOutcome {
    pub fn steps(&self) -> usize {
        match *self {
            Self::Settled { steps } | Self::Capped { steps } => steps,
        }
    }
}

pub struct VirtualGrid<S: RenderSurface, P: ProximityMonitor> {
    config: GridConfig,
    items: ItemCollection,
    layout: GridLayout,
    window: WindowManager,
    selection: SelectionModel,
    adapter: ViewAdapter<S>,
    monitor: P,
    attached: bool,
}

impl<S: RenderSurface, P: ProximityMonitor> VirtualGrid<S, P> {
    pub fn new(items: ItemCollection, config: GridConfig, surface: S, monitor: P) -> GridResult<Self> {
        config.validate()?;
        let layout = GridLayout::compute(
            0.0,
            0.0,
            items.len(),
            config.cell,
            config.gap,
            config.buffer_rows,
        );
        Ok(Self {
            window: WindowManager::new(config.stride_rows),
            config,
            items,
            layout,
            selection: SelectionModel::new(),
            adapter: ViewAdapter::new(surface),
            monitor,
            attached: false,
        })
    }

    pub fn items(&self) -> &ItemCollection {
        &self.items
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn adapter(&self) -> &ViewAdapter<S> {
        &self.adapter
    }

    pub fn surface(&self) -> &S {
        self.adapter.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.adapter.surface_mut()
    }

    pub fn monitor(&self) -> &P {
        &self.monitor
    }

    #[cfg(test)]
    pub fn monitor_mut(&mut self) -> &mut P {
        &mut self.monitor
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    fn layout_for(&self, width: f32, height: f32) -> GridLayout {
        GridLayout::compute(
            width,
            height,
            self.items.len(),
            self.config.cell,
            self.config.gap,
            self.config.buffer_rows,
        )
    }

    /// Starts from a previous grid's selection, dropping ids this collection
    /// does not contain. Call before `attach` so new elements pick it up.
    pub fn adopt_selection(&mut self, mut selection: SelectionModel) {
        let delta = selection.retain_valid(&self.items);
        if !delta.is_empty() {
            debug!(dropped = delta.changed.len(), "selection pruned to the new collection");
        }
        self.selection = selection;
    }

    /// Lays the grid out for the first time and materializes the initial window.
    pub fn attach(&mut self, width: f32, height: f32) -> GridResult<ReconcileOutcome> {
        self.layout = self.layout_for(width, height);
        self.adapter.surface_mut().set_content_extent(&self.layout);

        let diff = self.window.initialize(&self.layout);
        self.attached = true;
        self.apply(&diff)?;

        info!(
            items = self.items.len(),
            columns = self.layout.columns,
            rows = self.layout.total_rows,
            capacity = self.layout.capacity,
            "grid attached"
        );
        self.reconcile()
    }

    /// Destroys every element and stops observing sentinels.
    pub fn detach(&mut self) {
        self.adapter.teardown();
        self.window.teardown();
        self.monitor.unobserve(Sentinel::Leading);
        self.monitor.unobserve(Sentinel::Trailing);
        self.attached = false;
        debug!("grid detached");
    }

    /// Re-lays the grid for a new viewport size.
    ///
    /// Indices map to new positions once the column count changes, so the
    /// whole window is rebuilt around the row at the current scroll offset.
    pub fn resize(&mut self, width: f32, height: f32) -> GridResult<ReconcileOutcome> {
        if !self.attached {
            return self.attach(width, height);
        }
        let layout = self.layout_for(width, height);
        if layout == self.layout {
            return self.reconcile();
        }

        let top = self.monitor.viewport_span().map_or(0.0, |(top, _)| top);
        let old_columns = self.layout.columns;
        self.layout = layout;
        self.adapter.teardown();
        self.window.relayout(&self.layout);

        let first_row = self.layout.row_at_offset(top);
        let target = first_row.saturating_sub(self.layout.buffer_rows) * self.layout.columns;
        let diff = self.window.shift_range(target, true);
        self.adapter.surface_mut().set_content_extent(&self.layout);
        self.apply(&diff)?;

        debug!(
            old_columns,
            columns = self.layout.columns,
            range = ?self.window.range(),
            "grid resized"
        );
        self.reconcile()
    }

    /// Entry point for the monitor's boundary notifications.
    pub fn on_proximity_signal(&mut self) -> GridResult<ReconcileOutcome> {
        self.reconcile()
    }

    /// Periodic safety-net check for monitors that miss a signal.
    pub fn recheck(&mut self) -> GridResult<ReconcileOutcome> {
        trace!("periodic recheck");
        self.reconcile()
    }

    /// Whether the host should keep scheduling `recheck`.
    pub fn needs_recheck(&self) -> bool {
        self.attached
            && self.window.range().is_some()
            && !(self.window.at_start() && self.window.at_end())
    }

    /// Shifts the window until no sentinel asks for more, or the step limit hits.
    pub fn reconcile(&mut self) -> GridResult<ReconcileOutcome> {
        if !self.attached {
            return Ok(ReconcileOutcome::Settled { steps: 0 });
        }
        let limit = self.config.max_reconcile_steps;
        for step in 0..limit {
            let Some(range) = self.window.range() else {
                return Ok(ReconcileOutcome::Settled { steps: step });
            };

            let diff = if let Some(target) = self.jump_target(range) {
                debug!(?range, target, "viewport left the window, jumping");
                self.window.shift_range(target, false)
            } else {
                let leading = self.monitor.is_near(Sentinel::Leading);
                let trailing = self.monitor.is_near(Sentinel::Trailing);
                if trailing && !leading && !self.window.at_end() {
                    self.window.shift_forwards()
                } else if leading && !trailing && !self.window.at_start() {
                    self.window.shift_backwards()
                } else {
                    // Both sentinels near means they cannot tell the direction;
                    // fall back to which visible edge the window misses.
                    match self.uncovered_edge(range) {
                        Some(Sentinel::Trailing) => self.window.shift_forwards(),
                        Some(Sentinel::Leading) => self.window.shift_backwards(),
                        None => return Ok(ReconcileOutcome::Settled { steps: step }),
                    }
                }
            };
            self.apply(&diff)?;
        }

        warn!(
            steps = limit,
            range = ?self.window.range(),
            "reconciliation hit the step limit"
        );
        Ok(ReconcileOutcome::Capped { steps: limit })
    }

    /// Start index to jump to when the viewport lies wholly outside `range`.
    fn jump_target(&self, range: WindowRange) -> Option<usize> {
        let (top, bottom) = self.monitor.viewport_span()?;
        let first_visible = self.layout.row_at_offset(top);
        let last_visible = self.layout.row_at_offset(bottom);
        let first_row = self.layout.row_of(range.start);
        let last_row = self.layout.row_of(range.end);
        if last_visible >= first_row && first_visible <= last_row {
            return None;
        }
        Some(first_visible.saturating_sub(self.layout.buffer_rows) * self.layout.columns)
    }

    /// Side of the viewport whose rows the window does not reach, if any.
    fn uncovered_edge(&self, range: WindowRange) -> Option<Sentinel> {
        let (top, bottom) = self.monitor.viewport_span()?;
        let last_visible = self.layout.row_at_offset(bottom);
        if last_visible > self.layout.row_of(range.end) && !self.window.at_end() {
            return Some(Sentinel::Trailing);
        }
        let first_visible = self.layout.row_at_offset(top);
        if first_visible < self.layout.row_of(range.start) && !self.window.at_start() {
            return Some(Sentinel::Leading);
        }
        None
    }

    /// Applies a window diff to the adapter.
    ///
    /// A failed creation leaves the window ahead of the elements, so the
    /// grid detaches itself and the caller must `attach` again.
    fn apply(&mut self, diff: &WindowDiff) -> GridResult<()> {
        if !diff.is_empty() {
            if let Err(err) = self
                .adapter
                .apply(diff, &self.items, &self.selection, &self.layout)
            {
                warn!(error = %err, "materialization failed, detaching grid");
                self.detach();
                return Err(err);
            }
        }
        self.place_sentinels();
        Ok(())
    }

    fn place_sentinels(&mut self) {
        match self.window.range() {
            Some(range) => {
                self.monitor.observe(Sentinel::Leading);
                self.monitor.observe(Sentinel::Trailing);
                let leading = self.layout.row_top(self.layout.row_of(range.start));
                let trailing = self.layout.row_bottom(self.layout.row_of(range.end));
                self.monitor.place(Sentinel::Leading, leading);
                self.monitor.place(Sentinel::Trailing, trailing);
            }
            None => {
                self.monitor.unobserve(Sentinel::Leading);
                self.monitor.unobserve(Sentinel::Trailing);
            }
        }
    }

    /// Pushes a selection change into the materialized elements and the surface.
    fn commit(&mut self, delta: SelectionDelta) {
        if delta.is_empty() {
            return;
        }
        for &id in &delta.changed {
            let selected = self.selection.is_selected(id);
            self.adapter.update_state(id, ElementField::Selected(selected));
        }
        if delta.primary_changed() {
            if let Some(old) = delta.primary_before {
                self.adapter.update_state(old, ElementField::Primary(false));
            }
            if let Some(new) = delta.primary_after {
                self.adapter.update_state(new, ElementField::Primary(true));
                if let Some(item) = self.items.by_id(new) {
                    self.adapter.surface_mut().show_preview(item);
                }
            }
        }
        let summary = self.selection.summary();
        self.adapter.surface_mut().selection_summary(&summary);
    }

    /// Handles a press on a materialized element. Returns false when ignored.
    pub fn on_pointer(&mut self, event: PointerEvent) -> bool {
        if !self.adapter.is_materialized(event.index) {
            return false;
        }
        let Some(id) = self.items.get(event.index).map(|item| item.id) else {
            return false;
        };

        let delta = match event.button {
            PointerButton::Secondary => {
                if self.selection.is_selected(id) {
                    SelectionDelta::default()
                } else {
                    self.selection
                        .select_only(id, &self.items)
                        .then(self.selection.set_primary(Some(id), &self.items))
                }
            }
            PointerButton::Primary if event.modifiers.shift => {
                let anchor = self.selection.primary();
                let delta = self
                    .selection
                    .select_range(anchor.unwrap_or(id), id, &self.items);
                if anchor.is_none() {
                    delta.then(self.selection.set_primary(Some(id), &self.items))
                } else {
                    delta
                }
            }
            PointerButton::Primary if event.modifiers.ctrl => {
                let delta = self.selection.toggle(id, &self.items);
                if self.selection.is_selected(id) {
                    delta.then(self.selection.set_primary(Some(id), &self.items))
                } else {
                    delta
                }
            }
            PointerButton::Primary => self
                .selection
                .select_only(id, &self.items)
                .then(self.selection.set_primary(Some(id), &self.items)),
        };
        self.commit(delta);

        match event.button {
            PointerButton::Secondary => {
                if let Some(item) = self.items.get(event.index) {
                    self.adapter.surface_mut().open_context_menu(item);
                }
            }
            PointerButton::Primary if event.clicks >= 2 => {
                if let Some(item) = self.items.get(event.index) {
                    self.adapter.surface_mut().open_detail(item);
                }
            }
            PointerButton::Primary => {}
        }
        true
    }

    /// Handles a key press. Returns false when the key had no effect.
    pub fn on_key(&mut self, key: GridKey) -> bool {
        match key {
            GridKey::Navigate(direction) => self.navigate(direction),
            GridKey::Activate => {
                let Some(item) = self.selection.primary().and_then(|id| self.items.by_id(id))
                else {
                    return false;
                };
                self.adapter.surface_mut().open_detail(item);
                true
            }
            GridKey::Escape => {
                if self.selection.is_empty() && self.selection.primary().is_none() {
                    return false;
                }
                let delta = self.selection.clear();
                self.commit(delta);
                true
            }
        }
    }

    /// Materialized neighbor of the primary item in `direction`.
    fn neighbor(&self, direction: Direction) -> Option<usize> {
        let Some(primary) = self.selection.primary() else {
            return self.adapter.first_index();
        };
        // A primary scrolled out of the window has no materialized neighbors.
        let index = self.adapter.index_of(primary)?;
        let columns = self.layout.columns;
        match direction {
            Direction::Up => index
                .checked_sub(columns)
                .filter(|&i| self.adapter.is_materialized(i)),
            Direction::Down => index
                .checked_add(columns)
                .filter(|&i| self.adapter.is_materialized(i)),
            Direction::Left => self.adapter.previous_index(index),
            Direction::Right => self.adapter.next_index(index),
        }
    }

    fn navigate(&mut self, direction: Direction) -> bool {
        let Some(target) = self.neighbor(direction) else {
            return false;
        };
        let Some(id) = self.items.get(target).map(|item| item.id) else {
            return false;
        };
        let delta = self
            .selection
            .select_only(id, &self.items)
            .then(self.selection.set_primary(Some(id), &self.items));
        self.commit(delta);
        self.adapter.surface_mut().reveal(target, &self.layout);
        trace!(?direction, target, "navigated");
        true
    }
}

impl<S: RenderSurface> VirtualGrid<S, ScrollProximity> {
    /// Moves the viewport top and reconciles.
    pub fn scroll_to(&mut self, top: f32) -> GridResult<ReconcileOutcome> {
        let height = self.monitor.viewport_height();
        self.monitor.set_viewport(top, height);
        self.on_proximity_signal()
    }

    /// Updates viewport size, attaching on first use.
    pub fn fit_viewport(&mut self, width: f32, height: f32) -> GridResult<ReconcileOutcome> {
        let top = self.monitor.viewport_top();
        self.monitor.set_viewport(top, height);
        self.resize(width, height)
    }
}
