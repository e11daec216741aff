pub mod context_menu;
pub mod grid_view;
pub mod keybindings;
pub mod tile_widget;
pub mod viewer;
pub mod window;

pub use window::MainWindow;
