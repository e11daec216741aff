pub mod collection;
pub mod media_item;

pub use collection::*;
pub use media_item::*;
