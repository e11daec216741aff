use thiserror::Error;

use crate::models::ItemId;

/// Errors raised by the grid core.
///
/// Out-of-range indices and unknown ids are not errors: they are ignored
/// where they occur. Everything here indicates a broken contract between
/// the collection source, the configuration and the grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("item {id} has unsupported kind {kind:?}")]
    UnsupportedKind { id: ItemId, kind: String },

    #[error("item id {id} appears at positions {first} and {second}")]
    DuplicateId {
        id: ItemId,
        first: usize,
        second: usize,
    },

    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),
}

pub type GridResult<T> = std::result::Result<T, GridError>;
