// Tile element for one materialized grid item
// Thumbnails decode on worker threads and land in a shared LRU of textures

use gdk4::Texture;
use gtk4::prelude::*;
use gtk4::{gdk, glib, Align, ContentFit, GestureClick, Label, Overlay, Picture};
use image::GenericImageView;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::grid::{ElementField, Modifiers, PointerButton, PointerEvent, ViewElement};
use crate::layout::CellSize;
use crate::models::{ItemId, MediaItem, MediaKind};

const TILE_THUMB_SIZE: (u32, u32) = (300, 200);
const TILE_LOADER_THREADS: usize = 2;
const TILE_LOADER_QUEUE: usize = 512;
const TILE_CACHE_ENTRIES: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(n) => n,
    None => panic!("cache size must be non-zero"),
};

/// Receives presses on tiles.
pub type PointerCallback = Rc<dyn Fn(PointerEvent)>;

thread_local! {
    static PLACEHOLDER: Texture = solid_texture(64, 64, [0x1a, 0x1a, 0x1a, 0xff]);
    static TILE_LOADER: Rc<TileLoader> = TileLoader::new();
}

pub fn placeholder_texture() -> Texture {
    PLACEHOLDER.with(|texture| texture.clone())
}

fn solid_texture(width: usize, height: usize, rgba: [u8; 4]) -> Texture {
    let mut pixels = vec![0u8; width * height * 4];
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.copy_from_slice(&rgba);
    }
    let bytes = glib::Bytes::from_owned(pixels);
    gdk::MemoryTexture::new(
        width as i32,
        height as i32,
        gdk::MemoryFormat::R8g8b8a8,
        &bytes,
        width * 4,
    )
    .upcast()
}

#[derive(Debug)]
struct DecodeRequest {
    id: ItemId,
    path: PathBuf,
}

#[derive(Debug)]
struct DecodeResult {
    id: ItemId,
    rgba: Option<Vec<u8>>,
    width: u32,
    height: u32,
}

struct Waiter {
    picture: glib::WeakRef<Picture>,
    token: Weak<Cell<u64>>,
    expected: u64,
}

struct LoaderState {
    pending: HashSet<ItemId>,
    waiters: HashMap<ItemId, Vec<Waiter>>,
    cache: lru::LruCache<ItemId, Texture>,
}

struct TileLoader {
    request_tx: flume::Sender<DecodeRequest>,
    result_rx: flume::Receiver<DecodeResult>,
    state: RefCell<LoaderState>,
}

static NEXT_LOAD_TOKEN: AtomicU64 = AtomicU64::new(1);

impl TileLoader {
    fn new() -> Rc<Self> {
        let (request_tx, request_rx) = flume::bounded::<DecodeRequest>(TILE_LOADER_QUEUE);
        let (result_tx, result_rx) = flume::unbounded::<DecodeResult>();

        for _ in 0..TILE_LOADER_THREADS {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            std::thread::spawn(move || {
                while let Ok(req) = rx.recv() {
                    let (max_w, max_h) = TILE_THUMB_SIZE;
                    let (rgba, width, height) = match decode_rgba(&req.path, max_w, max_h) {
                        Some((data, w, h)) => (Some(data), w, h),
                        None => (None, 0, 0),
                    };
                    let _ = tx.send(DecodeResult {
                        id: req.id,
                        rgba,
                        width,
                        height,
                    });
                }
            });
        }

        let loader = Rc::new(Self {
            request_tx,
            result_rx,
            state: RefCell::new(LoaderState {
                pending: HashSet::new(),
                waiters: HashMap::new(),
                cache: lru::LruCache::new(TILE_CACHE_ENTRIES),
            }),
        });

        let loader_weak = Rc::downgrade(&loader);
        glib::timeout_add_local(Duration::from_millis(16), move || {
            if let Some(loader) = loader_weak.upgrade() {
                loader.process_results();
                glib::ControlFlow::Continue
            } else {
                glib::ControlFlow::Break
            }
        });

        loader
    }

    fn request(&self, id: ItemId, path: &Path, picture: &Picture, token: &Rc<Cell<u64>>) {
        let mut state = self.state.borrow_mut();

        if let Some(texture) = state.cache.get(&id) {
            picture.set_paintable(Some(texture));
            return;
        }

        state.waiters.entry(id).or_default().push(Waiter {
            picture: picture.downgrade(),
            token: Rc::downgrade(token),
            expected: token.get(),
        });

        if state.pending.insert(id) {
            let request = DecodeRequest {
                id,
                path: path.to_path_buf(),
            };
            if self.request_tx.try_send(request).is_err() {
                tracing::debug!(%id, "thumbnail queue full, dropping request");
                state.pending.remove(&id);
                state.waiters.remove(&id);
            }
        }
    }

    fn process_results(&self) {
        while let Ok(result) = self.result_rx.try_recv() {
            let texture = result
                .rgba
                .and_then(|rgba| create_texture_from_rgba(rgba, result.width, result.height));

            let waiters = {
                let mut state = self.state.borrow_mut();
                state.pending.remove(&result.id);
                if let Some(ref texture) = texture {
                    state.cache.put(result.id, texture.clone());
                }
                state.waiters.remove(&result.id).unwrap_or_default()
            };

            let Some(texture) = texture else {
                continue;
            };
            for waiter in waiters {
                let live = waiter
                    .token
                    .upgrade()
                    .is_some_and(|token| token.get() == waiter.expected);
                if !live {
                    continue;
                }
                if let Some(picture) = waiter.picture.upgrade() {
                    picture.set_paintable(Some(&texture));
                }
            }
        }
    }
}

/// Decodes an image and scales it to fit `max_w` x `max_h`.
pub fn decode_rgba(path: &Path, max_w: u32, max_h: u32) -> Option<(Vec<u8>, u32, u32)> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(err) => {
            tracing::debug!(error = %err, "Failed to decode {:?}", path);
            return None;
        }
    };
    let resized = img.thumbnail(max_w, max_h);
    let (width, height) = resized.dimensions();
    let rgba = resized.to_rgba8().into_raw();
    Some((rgba, width.max(1), height.max(1)))
}

pub fn create_texture_from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Option<Texture> {
    if width == 0 || height == 0 {
        return None;
    }
    let expected = (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4);
    if rgba.len() < expected {
        return None;
    }
    let bytes = glib::Bytes::from_owned(rgba);
    let texture = gdk::MemoryTexture::new(
        width as i32,
        height as i32,
        gdk::MemoryFormat::R8g8b8a8,
        &bytes,
        (width * 4) as usize,
    );
    Some(texture.upcast())
}

fn badge_text(kind: &MediaKind) -> Option<&'static str> {
    match kind {
        MediaKind::Video => Some("[V]"),
        MediaKind::Audio => Some("[A]"),
        _ => None,
    }
}

/// One tile on the grid canvas.
///
/// Widgets are private to the tile; the grid only talks to it through
/// `ViewElement`.
pub struct TileElement {
    id: ItemId,
    kind: MediaKind,
    path: PathBuf,
    position: (f32, f32),
    root: Overlay,
    picture: Picture,
    token: Rc<Cell<u64>>,
}

impl TileElement {
    pub fn new(
        index: usize,
        item: &MediaItem,
        cell: CellSize,
        position: (f32, f32),
        on_pointer: PointerCallback,
    ) -> Self {
        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Contain);
        picture.set_paintable(Some(&placeholder_texture()));
        picture.set_size_request(cell.width as i32, cell.height as i32);

        let root = Overlay::new();
        root.set_child(Some(&picture));
        root.add_css_class("tile");
        root.set_size_request(cell.width as i32, cell.height as i32);
        root.set_tooltip_text(Some(&item.describe()));

        if let Some(text) = badge_text(&item.kind) {
            let badge = Label::new(Some(text));
            badge.set_halign(Align::Start);
            badge.set_valign(Align::Start);
            badge.set_margin_start(6);
            badge.set_margin_top(4);
            badge.add_css_class("kind-badge");
            root.add_overlay(&badge);

            let name = Label::new(Some(&item.file_name));
            name.set_halign(Align::Center);
            name.set_valign(Align::End);
            name.set_margin_bottom(6);
            name.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
            name.set_max_width_chars(18);
            name.add_css_class("tile-name");
            root.add_overlay(&name);
        }

        // Listen on every button; the handler sorts primary from secondary.
        let click = GestureClick::new();
        click.set_button(0);
        click.connect_pressed(move |gesture, n_press, _x, _y| {
            let button = match gesture.current_button() {
                1 => PointerButton::Primary,
                3 => PointerButton::Secondary,
                _ => return,
            };
            let state = gesture.current_event_state();
            on_pointer(PointerEvent {
                index,
                button,
                modifiers: Modifiers {
                    ctrl: state.contains(gdk::ModifierType::CONTROL_MASK),
                    shift: state.contains(gdk::ModifierType::SHIFT_MASK),
                },
                clicks: n_press.max(1) as u32,
            });
        });
        root.add_controller(click);

        Self {
            id: item.id,
            kind: item.kind.clone(),
            path: item.path.clone(),
            position,
            root,
            picture,
            token: Rc::new(Cell::new(0)),
        }
    }

    pub fn widget(&self) -> &gtk4::Widget {
        self.root.upcast_ref()
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }
}

impl ViewElement for TileElement {
    fn item_id(&self) -> ItemId {
        self.id
    }

    fn on_attach(&mut self) {
        if self.kind != MediaKind::Image {
            return;
        }
        self.token
            .set(NEXT_LOAD_TOKEN.fetch_add(1, Ordering::Relaxed));
        TILE_LOADER.with(|loader| loader.request(self.id, &self.path, &self.picture, &self.token));
    }

    fn on_state_change(&mut self, field: ElementField) {
        let (class, on) = match field {
            ElementField::Selected(on) => ("selected", on),
            ElementField::Primary(on) => ("primary", on),
        };
        if on {
            self.root.add_css_class(class);
        } else {
            self.root.remove_css_class(class);
        }
    }

    fn on_detach(&mut self) {
        // Late thumbnails for this tile are dropped.
        self.token.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badges_follow_kind() {
        assert_eq!(badge_text(&MediaKind::Video), Some("[V]"));
        assert_eq!(badge_text(&MediaKind::Audio), Some("[A]"));
        assert_eq!(badge_text(&MediaKind::Image), None);
    }

    #[test]
    fn test_decode_missing_file() {
        assert!(decode_rgba(Path::new("/definitely/missing.png"), 300, 200).is_none());
    }
}
