pub mod adapter;
pub mod controller;
pub mod headless;
pub mod input;
pub mod proximity;
pub mod selection;
pub mod window;

pub use controller::{ReconcileOutcome, VirtualGrid};
pub use headless::HeadlessSurface;
pub use proximity::ScrollProximity;

#[cfg(feature = "gtk")]
pub use adapter::{ElementField, RenderSurface, ViewElement};
#[cfg(feature = "gtk")]
pub use input::{Direction, GridKey, Modifiers, PointerButton, PointerEvent};
