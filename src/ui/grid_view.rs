// GTK rendering surface for the virtual grid
// Tiles live on a `gtk::Fixed` canvas sized to the full content extent, so
// the scrolled window's scrollbar reflects every item while only the window
// of tiles exists as widgets.

use gtk4::prelude::*;
use gtk4::{glib, Adjustment, Fixed, Label, Widget};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::GridResult;
use crate::grid::{RenderSurface, ViewElement};
use crate::layout::GridLayout;
use crate::models::{ItemId, MediaItem};
use crate::ui::context_menu::ContextMenu;
use crate::ui::tile_widget::{PointerCallback, TileElement};
use crate::ui::viewer::DetailViewer;

pub struct GtkSurface {
    canvas: Fixed,
    vadjustment: Adjustment,
    preview_label: Label,
    summary_label: Label,
    viewer: Rc<DetailViewer>,
    context_menu: Rc<ContextMenu>,
    on_pointer: PointerCallback,
    tiles: HashMap<ItemId, Widget>,
}

impl GtkSurface {
    pub fn new(
        canvas: Fixed,
        vadjustment: Adjustment,
        preview_label: Label,
        summary_label: Label,
        viewer: Rc<DetailViewer>,
        context_menu: Rc<ContextMenu>,
        on_pointer: PointerCallback,
    ) -> Self {
        Self {
            canvas,
            vadjustment,
            preview_label,
            summary_label,
            viewer,
            context_menu,
            on_pointer,
            tiles: HashMap::new(),
        }
    }
}

/// Scroll value that brings `[top, bottom]` into a `page`-high view at `value`.
fn reveal_value(value: f64, page: f64, top: f64, bottom: f64) -> Option<f64> {
    if top < value {
        Some(top)
    } else if bottom > value + page {
        Some(bottom - page)
    } else {
        None
    }
}

impl RenderSurface for GtkSurface {
    type Element = TileElement;

    fn build(&mut self, index: usize, item: &MediaItem, layout: &GridLayout) -> GridResult<TileElement> {
        Ok(TileElement::new(
            index,
            item,
            layout.cell,
            layout.position_of(index),
            self.on_pointer.clone(),
        ))
    }

    fn attach(&mut self, element: &TileElement, _index: usize, after: Option<&TileElement>) {
        let widget = element.widget();
        widget.insert_after(&self.canvas, after.map(|prev| prev.widget()));
        let (x, y) = element.position();
        self.canvas.move_(widget, x as f64, y as f64);
        self.tiles.insert(element.item_id(), widget.clone());
    }

    fn detach(&mut self, element: &TileElement) {
        self.canvas.remove(element.widget());
        self.tiles.remove(&element.item_id());
    }

    fn set_content_extent(&mut self, layout: &GridLayout) {
        self.canvas.set_size_request(
            layout.content_width().ceil() as i32,
            layout.content_height().ceil() as i32,
        );
    }

    fn show_preview(&mut self, item: &MediaItem) {
        self.preview_label.set_text(&format!("> {}", item.describe()));
    }

    fn open_detail(&mut self, item: &MediaItem) {
        self.viewer.show(item);
    }

    fn open_context_menu(&mut self, item: &MediaItem) {
        match self.tiles.get(&item.id) {
            Some(anchor) => self.context_menu.popup(item, anchor),
            None => tracing::debug!(id = %item.id, "context menu for an unmaterialized item"),
        }
    }

    fn selection_summary(&mut self, summary: &str) {
        self.summary_label.set_text(summary);
    }

    fn reveal(&mut self, index: usize, layout: &GridLayout) {
        let row = layout.row_of(index);
        let top = layout.row_top(row) as f64;
        let bottom = layout.row_bottom(row) as f64;
        let adjustment = self.vadjustment.clone();
        // Scrolling re-enters the grid through value-changed; run it after the
        // current grid operation has returned.
        glib::idle_add_local_once(move || {
            if let Some(value) = reveal_value(adjustment.value(), adjustment.page_size(), top, bottom) {
                adjustment.set_value(value);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_value() {
        // Row above the view scrolls up to its top.
        assert_eq!(reveal_value(500.0, 400.0, 375.0, 475.0), Some(375.0));
        // Row below the view scrolls until its bottom is the last pixel.
        assert_eq!(reveal_value(500.0, 400.0, 875.0, 975.0), Some(575.0));
        // Fully visible rows leave the view alone.
        assert_eq!(reveal_value(500.0, 400.0, 500.0, 600.0), None);
    }
}
