use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    glib, Align, Application, ApplicationWindow, Box as GtkBox, Button, CssProvider, Entry, Fixed,
    Label, Orientation, ScrolledWindow, Settings, Window, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::runtime::Builder as TokioRuntimeBuilder;

use super::context_menu::ContextMenu;
use super::grid_view::GtkSurface;
use super::keybindings::Keybindings;
use super::tile_widget::PointerCallback;
use super::viewer::DetailViewer;
use crate::config::GridConfig;
use crate::error::GridResult;
use crate::grid::{GridKey, PointerEvent, ReconcileOutcome, ScrollProximity, VirtualGrid};
use crate::scanner::{FileScanner, ScanConfig, ScanProgress, ScanResult};

type Grid = VirtualGrid<GtkSurface, ScrollProximity>;

const HINTS: &str = "[hjkl/arrows] Move  [Enter] Open  [Esc] Clear  [o] Open dir  [r] Recursive";

/// CSS for terminal aesthetic
const GRID_CSS: &str = r#"
* {
    border-radius: 0;
    box-shadow: none;
    background-image: none;
}

window {
    background-color: #0a0a0a;
    color: #e0e0e0;
}

button {
    background-color: transparent;
    border: 1px solid #333333;
    color: #e0e0e0;
}

button:hover {
    background-color: rgba(224, 224, 224, 0.05);
    border-color: #555555;
}

.grid-canvas {
    background-color: #0a0a0a;
}

.tile {
    background-color: #121212;
    border: 1px solid #333333;
}

.tile:hover {
    border-color: #555555;
}

.tile.selected {
    border-color: #00aa66;
    border-width: 2px;
    background-color: rgba(0, 255, 136, 0.08);
}

.tile.primary {
    border-color: #00ff88;
    border-style: dashed;
    border-width: 2px;
}

.kind-badge, .tile-name {
    background-color: rgba(0, 0, 0, 0.7);
    color: #00ff88;
    padding: 2px 6px;
    font-size: 11px;
    font-weight: bold;
}

.dir-bar, .status-bar {
    font-family: monospace;
    font-size: 12px;
}

.status-text {
    color: #00ff88;
}

.status-hints {
    color: #666666;
}

.context-menu-title {
    color: #00ff88;
    font-family: monospace;
}

.context-menu-item {
    padding: 4px 8px;
}
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(GRID_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

fn expand_path_input(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(input)
}

enum ScanMessage {
    Progress(ScanProgress),
    Finished(anyhow::Result<ScanResult>),
}

/// Runs a scan on its own thread, streaming progress back.
fn spawn_scan(path: PathBuf, recursive: bool) -> flume::Receiver<ScanMessage> {
    let (tx, rx) = flume::unbounded::<ScanMessage>();
    std::thread::spawn(move || {
        let runtime = match TokioRuntimeBuilder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = tx.send(ScanMessage::Finished(Err(err.into())));
                return;
            }
        };
        let scanner = FileScanner::with_config(ScanConfig {
            recursive,
            ..ScanConfig::default()
        });
        let result = runtime.block_on(async {
            let (mut progress, handle) = scanner.scan_with_progress(path);
            while let Some(update) = progress.recv().await {
                let _ = tx.send(ScanMessage::Progress(update));
            }
            handle.await?
        });
        let _ = tx.send(ScanMessage::Finished(result));
    });
    rx
}

/// Main window hosting the virtual grid
pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    scrolled: ScrolledWindow,
    canvas: Fixed,
    dir_label: Label,
    status_label: Label,
    preview_label: Label,
    summary_label: Label,
    viewer: Rc<DetailViewer>,
    context_menu: Rc<ContextMenu>,
    keybindings: Keybindings,
    config: GridConfig,
    grid: RefCell<Option<Grid>>,
    current_path: RefCell<Option<PathBuf>>,
    scan_generation: Cell<u64>,
    recursive_scan: Cell<bool>,
    last_viewport: Cell<(i32, i32)>,
    resize_pending: Cell<bool>,
}

impl MainWindow {
    pub fn new(app: &Application, config: GridConfig, initial_path: Option<&Path>) -> Rc<Self> {
        // Load CSS before creating widgets
        load_css();
        if let Some(settings) = Settings::default() {
            settings.set_gtk_application_prefer_dark_theme(true);
        }

        let window = ApplicationWindow::builder()
            .application(app)
            .title("packgrid")
            .default_width(1280)
            .default_height(800)
            .build();

        let root = GtkBox::new(Orientation::Vertical, 0);

        let dir_bar = GtkBox::new(Orientation::Horizontal, 8);
        dir_bar.add_css_class("dir-bar");
        dir_bar.set_margin_start(8);
        dir_bar.set_margin_end(8);
        dir_bar.set_margin_top(4);
        dir_bar.set_margin_bottom(4);

        let dir_label = Label::new(Some("> No directory"));
        dir_label.set_halign(Align::Start);
        dir_label.set_hexpand(true);
        dir_label.add_css_class("dir-label");
        dir_label.set_ellipsize(gtk4::pango::EllipsizeMode::Start);
        dir_bar.append(&dir_label);

        let summary_label = Label::new(None);
        summary_label.add_css_class("status-text");
        dir_bar.append(&summary_label);
        root.append(&dir_bar);

        let canvas = Fixed::new();
        canvas.add_css_class("grid-canvas");
        canvas.set_halign(Align::Start);
        canvas.set_valign(Align::Start);

        let scrolled = ScrolledWindow::builder()
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .vscrollbar_policy(gtk4::PolicyType::Automatic)
            .vexpand(true)
            .hexpand(true)
            .child(&canvas)
            .build();
        root.append(&scrolled);

        let status_bar = GtkBox::new(Orientation::Horizontal, 8);
        status_bar.add_css_class("status-bar");
        status_bar.set_margin_start(8);
        status_bar.set_margin_end(8);
        status_bar.set_margin_top(4);
        status_bar.set_margin_bottom(4);

        let status_label = Label::new(Some("> Ready"));
        status_label.set_halign(Align::Start);
        status_label.add_css_class("status-text");
        status_bar.append(&status_label);

        let preview_label = Label::new(None);
        preview_label.set_halign(Align::Start);
        preview_label.set_hexpand(true);
        preview_label.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        preview_label.add_css_class("status-text");
        status_bar.append(&preview_label);

        let hints_label = Label::new(Some(HINTS));
        hints_label.add_css_class("status-hints");
        status_bar.append(&hints_label);
        root.append(&status_bar);

        window.set_child(Some(&root));

        let viewer = DetailViewer::new(&window);
        let context_menu = ContextMenu::new(&window, viewer.clone());
        let keybindings = Keybindings::new();
        keybindings.attach(&window);

        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            scrolled,
            canvas,
            dir_label,
            status_label,
            preview_label,
            summary_label,
            viewer,
            context_menu,
            keybindings,
            config,
            grid: RefCell::new(None),
            current_path: RefCell::new(None),
            scan_generation: Cell::new(0),
            recursive_scan: Cell::new(true),
            last_viewport: Cell::new((0, 0)),
            resize_pending: Cell::new(false),
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        main_window.setup_keybindings();
        main_window.setup_scroll_handler();
        main_window.setup_resize_observer();
        main_window.setup_recheck_timer();

        match initial_path {
            Some(path) => main_window.load_directory(path),
            None => main_window.set_status("> Press [o] to open a directory"),
        }

        main_window
    }

    pub fn present(&self) {
        self.window.present();
    }

    pub fn set_status(&self, status: &str) {
        self.status_label.set_text(status);
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.current_path.borrow().clone()
    }

    fn setup_keybindings(self: &Rc<Self>) {
        let weak_self = Rc::downgrade(self);
        self.keybindings.connect_grid_key(move |key| {
            weak_self
                .upgrade()
                .is_some_and(|window| window.on_grid_key(key))
        });

        let weak_self = Rc::downgrade(self);
        self.keybindings.connect_open_directory(move || {
            if let Some(window) = weak_self.upgrade() {
                window.prompt_open_directory();
            }
        });

        let weak_self = Rc::downgrade(self);
        self.keybindings.connect_toggle_recursive(move || {
            if let Some(window) = weak_self.upgrade() {
                window.toggle_recursive();
            }
        });

        let weak_self = Rc::downgrade(self);
        self.keybindings.connect_rescan(move || {
            if let Some(window) = weak_self.upgrade() {
                if let Some(path) = window.current_path() {
                    window.load_directory(&path);
                }
            }
        });
    }

    fn setup_scroll_handler(self: &Rc<Self>) {
        let weak_self = Rc::downgrade(self);
        self.scrolled
            .vadjustment()
            .connect_value_changed(move |adjustment| {
                if let Some(window) = weak_self.upgrade() {
                    window.on_scroll(adjustment.value() as f32);
                }
            });
    }

    fn setup_resize_observer(self: &Rc<Self>) {
        let weak_self = Rc::downgrade(self);
        self.scrolled.add_tick_callback(move |scrolled, _clock| {
            let Some(window) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            let size = (scrolled.width(), scrolled.height());
            if size.0 <= 0 || size.1 <= 0 {
                return glib::ControlFlow::Continue;
            }
            if window.last_viewport.get() != size {
                window.last_viewport.set(size);
                window.schedule_fit_debounced(Duration::from_millis(80));
            }
            glib::ControlFlow::Continue
        });
    }

    /// Periodic check that catches window shifts a missed scroll signal left undone.
    fn setup_recheck_timer(self: &Rc<Self>) {
        let weak_self = Rc::downgrade(self);
        glib::timeout_add_local(self.config.recheck_interval, move || {
            let Some(window) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            window.recheck();
            glib::ControlFlow::Continue
        });
    }

    fn schedule_fit_debounced(&self, delay: Duration) {
        if self.resize_pending.replace(true) {
            return;
        }
        let weak_self = self.self_weak.borrow().clone();
        glib::timeout_add_local(delay, move || {
            if let Some(window) = weak_self.upgrade() {
                window.resize_pending.set(false);
                window.fit_to_viewport();
            }
            glib::ControlFlow::Break
        });
    }

    /// Runs `op` against the grid unless it is absent or already borrowed.
    fn with_grid<T>(&self, op: impl FnOnce(&mut Grid) -> T) -> Option<T> {
        let mut slot = self.grid.try_borrow_mut().ok()?;
        let grid = slot.as_mut()?;
        Some(op(grid))
    }

    fn report(&self, result: GridResult<ReconcileOutcome>) {
        match result {
            Ok(ReconcileOutcome::Settled { .. }) => {}
            Ok(ReconcileOutcome::Capped { steps }) => {
                tracing::debug!(steps, "reconcile capped, periodic check will continue");
            }
            Err(err) => {
                tracing::error!(error = %err, "Grid update failed");
                self.set_status(&format!("> Error: {}", err));
            }
        }
    }

    fn fit_to_viewport(&self) {
        let (width, height) = (self.scrolled.width(), self.scrolled.height());
        if width <= 0 || height <= 0 {
            return;
        }
        if let Some(result) = self.with_grid(|grid| grid.fit_viewport(width as f32, height as f32)) {
            self.report(result);
        }
    }

    fn on_scroll(&self, top: f32) {
        // A busy grid means this signal came from inside a grid update; the
        // periodic check picks up the new offset.
        if let Some(result) = self.with_grid(|grid| grid.scroll_to(top)) {
            self.report(result);
        }
    }

    fn recheck(&self) {
        let top = self.scrolled.vadjustment().value() as f32;
        let result = self.with_grid(|grid| {
            if !grid.is_attached() {
                return None;
            }
            let moved = (grid.monitor().viewport_top() - top).abs() > 0.5;
            if moved || grid.needs_recheck() {
                Some(grid.scroll_to(top))
            } else {
                None
            }
        });
        if let Some(Some(result)) = result {
            self.report(result);
        }
    }

    fn on_pointer(&self, event: PointerEvent) {
        let handled = self.with_grid(|grid| grid.on_pointer(event));
        if handled == Some(false) {
            tracing::debug!(index = event.index, "pointer event on a stale tile");
        }
    }

    fn on_grid_key(&self, key: GridKey) -> bool {
        self.with_grid(|grid| grid.on_key(key)).unwrap_or(false)
    }

    fn pointer_callback(&self) -> PointerCallback {
        let weak_self = self.self_weak.borrow().clone();
        Rc::new(move |event| {
            if let Some(window) = weak_self.upgrade() {
                window.on_pointer(event);
            }
        })
    }

    /// Scan a directory and show its media in a fresh grid
    pub fn load_directory(&self, path: &Path) {
        let generation = self.scan_generation.get().wrapping_add(1);
        self.scan_generation.set(generation);
        *self.current_path.borrow_mut() = Some(path.to_path_buf());
        self.dir_label.set_text(&format!("> {}", path.display()));
        self.set_status(&format!("> Scanning: {}", path.display()));

        let rx = spawn_scan(path.to_path_buf(), self.recursive_scan.get());
        let weak_self = self.self_weak.borrow().clone();
        glib::timeout_add_local(Duration::from_millis(16), move || {
            let Some(window) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            if window.scan_generation.get() != generation {
                return glib::ControlFlow::Break;
            }
            loop {
                match rx.try_recv() {
                    Ok(ScanMessage::Progress(ScanProgress::Discovered { count })) => {
                        window.set_status(&format!("> Scanning: {} files found", count));
                    }
                    Ok(ScanMessage::Progress(_)) => {}
                    Ok(ScanMessage::Finished(result)) => {
                        window.apply_scan_result(result);
                        return glib::ControlFlow::Break;
                    }
                    Err(flume::TryRecvError::Empty) => return glib::ControlFlow::Continue,
                    Err(flume::TryRecvError::Disconnected) => {
                        window.set_status("> Scan stopped unexpectedly");
                        return glib::ControlFlow::Break;
                    }
                }
            }
        });
    }

    fn apply_scan_result(&self, result: anyhow::Result<ScanResult>) {
        let scanned = match result {
            Ok(scanned) => scanned,
            Err(err) => {
                tracing::error!(error = ?err, "Scan failed");
                self.set_status(&format!("> Scan failed: {:#}", err));
                return;
            }
        };

        // Ids hash paths, so a rescan keeps whatever is still on disk.
        let old = self.grid.borrow_mut().take();
        let carried = old.map(|mut old| {
            old.detach();
            old.selection().clone()
        });
        self.preview_label.set_text("");
        self.summary_label.set_text("");
        self.scrolled.vadjustment().set_value(0.0);

        let surface = GtkSurface::new(
            self.canvas.clone(),
            self.scrolled.vadjustment(),
            self.preview_label.clone(),
            self.summary_label.clone(),
            self.viewer.clone(),
            self.context_menu.clone(),
            self.pointer_callback(),
        );
        let monitor = ScrollProximity::new(self.config.proximity_threshold);
        let total = scanned.items.len();
        let mut grid = match VirtualGrid::new(scanned.items, self.config.clone(), surface, monitor) {
            Ok(grid) => grid,
            Err(err) => {
                tracing::error!(error = %err, "Failed to create grid");
                self.set_status(&format!("> Error: {}", err));
                return;
            }
        };
        if let Some(selection) = carried {
            grid.adopt_selection(selection);
            if !grid.selection().is_empty() {
                self.summary_label.set_text(&grid.selection().summary());
            }
        }
        *self.grid.borrow_mut() = Some(grid);
        self.fit_to_viewport();

        let mode = if self.recursive_scan.get() { "recursive" } else { "flat" };
        self.set_status(&format!(
            "> {} items | {} skipped | {}",
            total, scanned.skipped, mode
        ));
    }

    fn toggle_recursive(&self) {
        let recursive = !self.recursive_scan.get();
        self.recursive_scan.set(recursive);
        match self.current_path() {
            Some(path) => self.load_directory(&path),
            None => self.set_status(&format!(
                "> Recursive scan {}",
                if recursive { "on" } else { "off" }
            )),
        }
    }

    fn prompt_open_directory(&self) {
        let dialog = Window::builder()
            .title("Open directory")
            .transient_for(&self.window)
            .modal(true)
            .default_width(520)
            .build();

        let content = GtkBox::new(Orientation::Vertical, 8);
        content.set_margin_top(12);
        content.set_margin_bottom(12);
        content.set_margin_start(12);
        content.set_margin_end(12);

        let entry = Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("/path/to/folder"));
        if let Some(current) = self.current_path() {
            entry.set_text(current.to_string_lossy().as_ref());
            entry.select_region(0, -1);
        }
        content.append(&entry);

        let buttons = GtkBox::new(Orientation::Horizontal, 8);
        buttons.set_halign(Align::End);
        let cancel_button = Button::with_label("Cancel");
        let open_button = Button::with_label("Open");
        buttons.append(&cancel_button);
        buttons.append(&open_button);
        content.append(&buttons);
        dialog.set_child(Some(&content));

        let window_weak = self.self_weak.borrow().clone();
        let dialog_weak = dialog.downgrade();
        let entry_for_open = entry.clone();
        let open_action = Rc::new(move || {
            if let Some(window) = window_weak.upgrade() {
                let input = entry_for_open.text().to_string();
                let input = input.trim();
                if !input.is_empty() {
                    let path = expand_path_input(input);
                    if path.is_dir() {
                        window.load_directory(&path);
                    } else {
                        window.set_status(&format!("> Not a directory: {}", path.display()));
                    }
                }
            }
            if let Some(dialog) = dialog_weak.upgrade() {
                dialog.close();
            }
        });

        let open_action_for_button = open_action.clone();
        open_button.connect_clicked(move |_| {
            open_action_for_button();
        });

        let open_action_for_entry = open_action.clone();
        entry.connect_activate(move |_| {
            open_action_for_entry();
        });

        let dialog_for_cancel = dialog.clone();
        cancel_button.connect_clicked(move |_| {
            dialog_for_cancel.close();
        });

        dialog.set_default_widget(Some(&open_button));
        dialog.present();
        entry.grab_focus();
    }
}
