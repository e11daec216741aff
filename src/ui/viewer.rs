// Detail viewer for a single item
// Images decode full-size off the main thread; other kinds show their
// description with a button that hands the file to the desktop's default app.

use anyhow::{Context, Result};
use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{
    gio, glib, Align, Box as GtkBox, Button, ContentFit, EventControllerKey, Label, Orientation,
    Picture, Window,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::models::{MediaItem, MediaKind};
use crate::ui::tile_widget::{create_texture_from_rgba, decode_rgba, placeholder_texture};

const DETAIL_MAX_SIZE: u32 = 4096;

/// Opens a file with the desktop's default handler.
pub fn open_externally(path: &Path) -> Result<()> {
    let uri = gio::File::for_path(path).uri();
    gio::AppInfo::launch_default_for_uri(&uri, None::<&gio::AppLaunchContext>)
        .with_context(|| format!("Failed to open {}", path.display()))
}

struct DecodedImage {
    generation: u64,
    rgba: Vec<u8>,
    width: u32,
    height: u32,
}

/// Separate window showing one item at full size.
pub struct DetailViewer {
    self_weak: RefCell<Weak<DetailViewer>>,
    window: Window,
    picture: Picture,
    info_label: Label,
    external_button: Button,
    current: RefCell<Option<PathBuf>>,
    generation: Cell<u64>,
}

impl DetailViewer {
    pub fn new(parent: &impl IsA<Window>) -> Rc<Self> {
        let window = Window::builder()
            .title("packgrid")
            .transient_for(parent)
            .default_width(1024)
            .default_height(768)
            .hide_on_close(true)
            .build();
        window.add_css_class("detail-viewer");

        let content = GtkBox::new(Orientation::Vertical, 0);

        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Contain);
        picture.set_vexpand(true);
        picture.set_hexpand(true);
        content.append(&picture);

        let bar = GtkBox::new(Orientation::Horizontal, 8);
        bar.add_css_class("status-bar");
        let info_label = Label::new(None);
        info_label.set_halign(Align::Start);
        info_label.set_hexpand(true);
        info_label.add_css_class("status-text");
        bar.append(&info_label);

        let external_button = Button::with_label("Open externally");
        external_button.add_css_class("context-menu-item");
        bar.append(&external_button);
        content.append(&bar);

        window.set_child(Some(&content));

        let viewer = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            picture,
            info_label,
            external_button,
            current: RefCell::new(None),
            generation: Cell::new(0),
        });
        *viewer.self_weak.borrow_mut() = Rc::downgrade(&viewer);

        let viewer_weak = Rc::downgrade(&viewer);
        viewer.external_button.connect_clicked(move |_| {
            let Some(viewer) = viewer_weak.upgrade() else {
                return;
            };
            let Some(path) = viewer.current.borrow().clone() else {
                return;
            };
            if let Err(err) = open_externally(&path) {
                tracing::warn!(error = %err, "External open failed");
                viewer.info_label.set_text(&format!("> {:#}", err));
            }
        });

        let keys = EventControllerKey::new();
        let viewer_weak = Rc::downgrade(&viewer);
        keys.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            if keyval == Key::Escape || keyval == Key::q {
                if let Some(viewer) = viewer_weak.upgrade() {
                    viewer.hide();
                }
                return glib::Propagation::Stop;
            }
            glib::Propagation::Proceed
        });
        viewer.window.add_controller(keys);

        viewer
    }

    pub fn show(&self, item: &MediaItem) {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        *self.current.borrow_mut() = Some(item.path.clone());

        self.window.set_title(Some(&item.file_name));
        self.info_label.set_text(&format!("> {}", item.describe()));
        self.picture.set_paintable(Some(&placeholder_texture()));
        self.external_button.set_visible(item.kind != MediaKind::Image);

        if item.kind == MediaKind::Image {
            self.load_image(generation, item.path.clone());
        }
        self.window.present();
    }

    pub fn hide(&self) {
        // Pending decodes for the hidden item are dropped.
        self.generation.set(self.generation.get().wrapping_add(1));
        self.window.set_visible(false);
    }

    fn load_image(&self, generation: u64, path: PathBuf) {
        let (tx, rx) = flume::bounded::<DecodedImage>(1);
        std::thread::spawn(move || {
            if let Some((rgba, width, height)) = decode_rgba(&path, DETAIL_MAX_SIZE, DETAIL_MAX_SIZE)
            {
                let _ = tx.send(DecodedImage {
                    generation,
                    rgba,
                    width,
                    height,
                });
            }
        });

        let viewer_weak = self.self_weak.borrow().clone();
        glib::timeout_add_local(Duration::from_millis(16), move || match rx.try_recv() {
            Ok(decoded) => {
                if let Some(viewer) = viewer_weak.upgrade() {
                    viewer.apply_image(decoded);
                }
                glib::ControlFlow::Break
            }
            Err(flume::TryRecvError::Empty) => glib::ControlFlow::Continue,
            Err(flume::TryRecvError::Disconnected) => {
                if let Some(viewer) = viewer_weak.upgrade() {
                    if viewer.generation.get() == generation {
                        viewer.info_label.set_text("> Failed to decode image");
                    }
                }
                glib::ControlFlow::Break
            }
        });
    }

    fn apply_image(&self, decoded: DecodedImage) {
        if decoded.generation != self.generation.get() {
            return;
        }
        if let Some(texture) = create_texture_from_rgba(decoded.rgba, decoded.width, decoded.height)
        {
            self.picture.set_paintable(Some(&texture));
        }
    }
}
