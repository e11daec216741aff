use std::collections::HashMap;

use crate::error::{GridError, GridResult};
use crate::models::{ItemId, MediaItem};

/// The ordered item sequence shown by one grid, with an id → position index.
///
/// Set once per grid instance. Positions are only meaningful for this
/// collection; anything that must survive scrolling keys on `ItemId`.
#[derive(Debug, Clone, Default)]
pub struct ItemCollection {
    items: Vec<MediaItem>,
    positions: HashMap<ItemId, usize>,
}

impl ItemCollection {
    pub fn new(items: Vec<MediaItem>) -> GridResult<Self> {
        let mut positions = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if let Some(first) = positions.insert(item.id, position) {
                return Err(GridError::DuplicateId {
                    id: item.id,
                    first,
                    second: position,
                });
            }
        }
        Ok(Self { items, positions })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at a position; padded or out-of-range indices yield `None`.
    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn by_id(&self, id: ItemId) -> Option<&MediaItem> {
        self.position(id).and_then(|position| self.items.get(position))
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_positions_follow_order() {
        let items: Vec<MediaItem> = (0..5)
            .map(|i| MediaItem::new(PathBuf::from(format!("{}.png", i))))
            .collect();
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        let collection = ItemCollection::new(items).unwrap();

        assert_eq!(collection.len(), 5);
        for (position, id) in ids.iter().enumerate() {
            assert_eq!(collection.position(*id), Some(position));
        }
        assert!(collection.get(5).is_none());
        assert!(collection.position(ItemId(0xdead)).is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let items = vec![
            MediaItem::new(PathBuf::from("a.png")),
            MediaItem::new(PathBuf::from("b.png")),
            MediaItem::new(PathBuf::from("a.png")),
        ];
        let id = items[0].id;
        let err = ItemCollection::new(items).unwrap_err();
        assert_eq!(
            err,
            GridError::DuplicateId {
                id,
                first: 0,
                second: 2
            }
        );
    }
}
