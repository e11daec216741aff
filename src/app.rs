use gtk4::prelude::*;
use gtk4::{gio, Application};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::config::GridConfig;
use crate::ui::MainWindow;

const APP_ID: &str = "io.github.packgrid";

pub struct PackGridApp {
    app: Application,
}

impl PackGridApp {
    pub fn new(initial_dir: Option<PathBuf>) -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        // Windows stay alive for as long as the application runs.
        let windows: Rc<RefCell<Vec<Rc<MainWindow>>>> = Rc::new(RefCell::new(Vec::new()));

        let windows_for_activate = windows.clone();
        app.connect_activate(move |app| {
            Self::open_window(app, initial_dir.clone(), &windows_for_activate);
        });

        let windows_for_open = windows.clone();
        app.connect_open(move |app, files, _hint| {
            let dir = files.first().and_then(|f| f.path());
            Self::open_window(app, dir, &windows_for_open);
        });

        Self { app }
    }

    /// Runs the main loop. Arguments were already consumed by `main`, so
    /// only the program name is passed on.
    pub fn run(&self) -> i32 {
        let program = std::env::args().next().unwrap_or_else(|| "packgrid".to_string());
        self.app.run_with_args(&[program]).into()
    }

    fn open_window(
        app: &Application,
        dir: Option<PathBuf>,
        windows: &Rc<RefCell<Vec<Rc<MainWindow>>>>,
    ) {
        let config = match GridConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = ?err, "Ignoring invalid PACKGRID_* settings");
                GridConfig::default()
            }
        };
        let window = MainWindow::new(app, config, dir.as_deref());
        window.present();
        windows.borrow_mut().push(window);
    }
}
