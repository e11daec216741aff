pub mod grid_layout;

pub use grid_layout::{CellSize, GridLayout};

#[cfg(test)]
pub use grid_layout::compute_layout;
