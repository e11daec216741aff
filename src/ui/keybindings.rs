// Keybindings for the packgrid window
//
// Keybindings:
// - Arrow keys / hjkl: Move the primary item
// - Enter: Open the detail view for the primary item
// - Escape: Clear the selection
// - o: Open directory
// - r: Toggle recursive scan
// - F5: Rescan the current directory

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{glib, EventControllerKey, PropagationPhase, Widget};
use std::cell::RefCell;
use std::rc::Rc;

use crate::grid::{Direction, GridKey};

/// Callback type for keys the grid handles; returns whether it consumed the key
pub type GridKeyCallback = Box<dyn Fn(GridKey) -> bool>;
/// Callback type for window-level commands
pub type CommandCallback = Box<dyn Fn()>;

/// Maps a key to what the grid understands.
pub fn grid_key(keyval: Key) -> Option<GridKey> {
    let key = match keyval {
        Key::Up | Key::k => GridKey::Navigate(Direction::Up),
        Key::Down | Key::j => GridKey::Navigate(Direction::Down),
        Key::Left | Key::h => GridKey::Navigate(Direction::Left),
        Key::Right | Key::l => GridKey::Navigate(Direction::Right),
        Key::Return | Key::KP_Enter => GridKey::Activate,
        Key::Escape => GridKey::Escape,
        _ => return None,
    };
    Some(key)
}

/// Keybinding manager for the grid window
pub struct Keybindings {
    controller: EventControllerKey,
    on_grid_key: Rc<RefCell<Option<GridKeyCallback>>>,
    on_open_directory: Rc<RefCell<Option<CommandCallback>>>,
    on_toggle_recursive: Rc<RefCell<Option<CommandCallback>>>,
    on_rescan: Rc<RefCell<Option<CommandCallback>>>,
}

impl Keybindings {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let on_grid_key: Rc<RefCell<Option<GridKeyCallback>>> = Rc::new(RefCell::new(None));
        let on_open_directory: Rc<RefCell<Option<CommandCallback>>> = Rc::new(RefCell::new(None));
        let on_toggle_recursive: Rc<RefCell<Option<CommandCallback>>> =
            Rc::new(RefCell::new(None));
        let on_rescan: Rc<RefCell<Option<CommandCallback>>> = Rc::new(RefCell::new(None));

        let on_grid_key_clone = on_grid_key.clone();
        let on_open_directory_clone = on_open_directory.clone();
        let on_toggle_recursive_clone = on_toggle_recursive.clone();
        let on_rescan_clone = on_rescan.clone();

        controller.connect_key_pressed(move |_controller, keyval, _keycode, state| {
            // Leave shortcuts with ctrl/alt to the rest of the window.
            if state.intersects(gdk4::ModifierType::CONTROL_MASK | gdk4::ModifierType::ALT_MASK) {
                return glib::Propagation::Proceed;
            }

            let handled = if let Some(key) = grid_key(keyval) {
                on_grid_key_clone
                    .borrow()
                    .as_ref()
                    .is_some_and(|callback| callback(key))
            } else {
                let command = match keyval {
                    Key::o => Some(&on_open_directory_clone),
                    Key::r => Some(&on_toggle_recursive_clone),
                    Key::F5 => Some(&on_rescan_clone),
                    _ => None,
                };
                match command {
                    Some(slot) => match slot.borrow().as_ref() {
                        Some(callback) => {
                            callback();
                            true
                        }
                        None => false,
                    },
                    None => false,
                }
            };

            if handled {
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });

        Self {
            controller,
            on_grid_key,
            on_open_directory,
            on_toggle_recursive,
            on_rescan,
        }
    }

    /// Attach keybindings to a widget (typically the main window)
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        widget.add_controller(self.controller.clone());
    }

    pub fn connect_grid_key<F>(&self, callback: F)
    where
        F: Fn(GridKey) -> bool + 'static,
    {
        *self.on_grid_key.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_open_directory<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        *self.on_open_directory.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_toggle_recursive<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        *self.on_toggle_recursive.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_rescan<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        *self.on_rescan.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vim_and_arrow_keys_agree() {
        assert_eq!(grid_key(Key::j), grid_key(Key::Down));
        assert_eq!(grid_key(Key::k), grid_key(Key::Up));
        assert_eq!(grid_key(Key::h), grid_key(Key::Left));
        assert_eq!(grid_key(Key::l), grid_key(Key::Right));
        assert_eq!(grid_key(Key::Right), Some(GridKey::Navigate(Direction::Right)));
    }

    #[test]
    fn test_activation_keys() {
        assert_eq!(grid_key(Key::Return), Some(GridKey::Activate));
        assert_eq!(grid_key(Key::KP_Enter), Some(GridKey::Activate));
        assert_eq!(grid_key(Key::Escape), Some(GridKey::Escape));
        assert_eq!(grid_key(Key::o), None);
    }
}
