// Shared context menu for grid tiles
// One popover per window, refilled for whichever item was right-clicked.

use gtk4::prelude::*;
use gtk4::{graphene, Align, Box as GtkBox, Button, Label, Orientation, Popover, Widget};
use std::rc::Rc;

use crate::models::MediaItem;
use crate::ui::viewer::{open_externally, DetailViewer};

pub struct ContextMenu {
    popover: Popover,
    content: GtkBox,
    host: Widget,
    viewer: Rc<DetailViewer>,
}

impl ContextMenu {
    pub fn new(host: &impl IsA<Widget>, viewer: Rc<DetailViewer>) -> Rc<Self> {
        let popover = Popover::new();
        popover.add_css_class("context-menu-popover");
        popover.set_has_arrow(true);
        popover.set_position(gtk4::PositionType::Bottom);
        popover.set_autohide(true);
        popover.set_parent(host);

        let content = GtkBox::new(Orientation::Vertical, 6);
        content.add_css_class("context-menu");
        content.set_margin_top(6);
        content.set_margin_bottom(6);
        content.set_margin_start(8);
        content.set_margin_end(8);
        popover.set_child(Some(&content));

        Rc::new(Self {
            popover,
            content,
            host: host.clone().upcast(),
            viewer,
        })
    }

    /// Shows the menu for `item`, pointing at `anchor`.
    pub fn popup(&self, item: &MediaItem, anchor: &Widget) {
        self.popover.popdown();
        while let Some(child) = self.content.first_child() {
            self.content.remove(&child);
        }

        let header = Label::new(Some(&item.describe()));
        header.set_halign(Align::Start);
        header.add_css_class("context-menu-title");
        self.content.append(&header);

        let sep = gtk4::Separator::new(Orientation::Horizontal);
        sep.add_css_class("context-menu-separator");
        self.content.append(&sep);

        let open_button = self.menu_button("Open");
        let viewer = self.viewer.clone();
        let popover = self.popover.clone();
        let item_for_open = item.clone();
        open_button.connect_clicked(move |_| {
            popover.popdown();
            viewer.show(&item_for_open);
        });

        let external_button = self.menu_button("Open with default app");
        let popover = self.popover.clone();
        let path = item.path.clone();
        external_button.connect_clicked(move |_| {
            popover.popdown();
            if let Err(err) = open_externally(&path) {
                tracing::warn!(error = %err, "External open failed");
            }
        });

        let copy_button = self.menu_button("Copy path");
        let popover = self.popover.clone();
        let path_text = item.path.to_string_lossy().to_string();
        copy_button.connect_clicked(move |button| {
            button.clipboard().set_text(&path_text);
            popover.popdown();
        });

        let width = anchor.width().max(1);
        let height = anchor.height().max(1);
        let center = graphene::Point::new(width as f32 / 2.0, height as f32 / 2.0);
        let (px, py) = anchor
            .compute_point(&self.host, &center)
            .map(|p| (p.x(), p.y()))
            .unwrap_or((0.0, 0.0));
        let pointing = gdk4::Rectangle::new(px.round() as i32, py.round() as i32, 1, 1);
        self.popover.set_pointing_to(Some(&pointing));
        self.popover.popup();
    }

    fn menu_button(&self, label: &str) -> Button {
        let button = Button::with_label(label);
        button.add_css_class("context-menu-item");
        button.set_halign(Align::Fill);
        button.set_hexpand(true);
        self.content.append(&button);
        button
    }
}

impl Drop for ContextMenu {
    fn drop(&mut self) {
        self.popover.unparent();
    }
}
