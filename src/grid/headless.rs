//! In-memory rendering surface used by the scroll simulation and tests.

use tracing::debug;

use crate::error::GridResult;
use crate::grid::adapter::{ElementField, RenderSurface, ViewElement};
use crate::layout::GridLayout;
use crate::models::{ItemId, MediaItem};

// Element state and request logs are read back by tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone)]
pub struct HeadlessElement {
    pub index: usize,
    pub id: ItemId,
    pub position: (f32, f32),
    pub selected: bool,
    pub primary: bool,
    pub attached: bool,
}

impl ViewElement for HeadlessElement {
    fn item_id(&self) -> ItemId {
        self.id
    }

    fn on_attach(&mut self) {
        self.attached = true;
    }

    fn on_state_change(&mut self, field: ElementField) {
        match field {
            ElementField::Selected(on) => self.selected = on,
            ElementField::Primary(on) => self.primary = on,
        }
    }

    fn on_detach(&mut self) {
        self.attached = false;
    }
}

/// Records element order and every request the grid makes.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    order: Vec<usize>,
    built: usize,
    detached: usize,
    peak: usize,
    pub previews: Vec<ItemId>,
    pub details: Vec<ItemId>,
    pub context_menus: Vec<ItemId>,
    pub summaries: Vec<String>,
    pub reveals: Vec<usize>,
    pub extent: Option<(f32, f32)>,
}

impl HeadlessSurface {
    /// Indices of attached elements, in surface order.
    pub fn order(&self) -> Vec<usize> {
        self.order.clone()
    }

    pub fn built(&self) -> usize {
        self.built
    }

    pub fn detached(&self) -> usize {
        self.detached
    }

    /// Largest number of simultaneously attached elements seen.
    pub fn peak(&self) -> usize {
        self.peak
    }

    #[cfg(test)]
    pub fn last_summary(&self) -> Option<&str> {
        self.summaries.last().map(String::as_str)
    }
}

impl RenderSurface for HeadlessSurface {
    type Element = HeadlessElement;

    fn build(
        &mut self,
        index: usize,
        item: &MediaItem,
        layout: &GridLayout,
    ) -> GridResult<HeadlessElement> {
        self.built += 1;
        Ok(HeadlessElement {
            index,
            id: item.id,
            position: layout.position_of(index),
            selected: false,
            primary: false,
            attached: false,
        })
    }

    fn attach(
        &mut self,
        element: &HeadlessElement,
        _index: usize,
        after: Option<&HeadlessElement>,
    ) {
        let slot = after
            .and_then(|a| self.order.iter().position(|&i| i == a.index))
            .map_or(0, |pos| pos + 1);
        self.order.insert(slot, element.index);
        self.peak = self.peak.max(self.order.len());
    }

    fn detach(&mut self, element: &HeadlessElement) {
        if let Some(pos) = self.order.iter().position(|&i| i == element.index) {
            self.order.remove(pos);
            self.detached += 1;
        }
    }

    fn set_content_extent(&mut self, layout: &GridLayout) {
        self.extent = Some((layout.content_width(), layout.content_height()));
    }

    fn show_preview(&mut self, item: &MediaItem) {
        debug!(id = %item.id, "preview {}", item.describe());
        self.previews.push(item.id);
    }

    fn open_detail(&mut self, item: &MediaItem) {
        self.details.push(item.id);
    }

    fn open_context_menu(&mut self, item: &MediaItem) {
        self.context_menus.push(item.id);
    }

    fn selection_summary(&mut self, summary: &str) {
        self.summaries.push(summary.to_string());
    }

    fn reveal(&mut self, index: usize, _layout: &GridLayout) {
        self.reveals.push(index);
    }
}
