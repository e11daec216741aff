//! Toolkit-neutral input events.

/// Navigation direction for grid movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Keys the grid reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKey {
    Navigate(Direction),
    /// Enter / Return
    Activate,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
    };
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
    };
}

/// A press on a materialized element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub index: usize,
    pub button: PointerButton,
    pub modifiers: Modifiers,
    /// 2 for a double click.
    pub clicks: u32,
}

impl PointerEvent {
    pub fn click(index: usize) -> Self {
        Self {
            index,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            clicks: 1,
        }
    }

    #[cfg(test)]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn double(mut self) -> Self {
        self.clicks = 2;
        self
    }

    pub fn secondary(mut self) -> Self {
        self.button = PointerButton::Secondary;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event_builders() {
        let event = PointerEvent::click(12)
            .with_modifiers(Modifiers::CTRL)
            .double()
            .secondary();
        assert_eq!(event.index, 12);
        assert_eq!(event.button, PointerButton::Secondary);
        assert!(event.modifiers.ctrl && !event.modifiers.shift);
        assert_eq!(event.clicks, 2);
        assert_eq!(PointerEvent::click(0).modifiers, Modifiers::default());
    }
}
