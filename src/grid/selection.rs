use std::collections::HashSet;

use tracing::trace;

use crate::models::{ItemCollection, ItemId};

/// Selected ids plus the primary (focus/anchor) id.
///
/// Keyed purely by id, so selection survives items scrolling in and out of
/// the materialized window. Every operation that names an id missing from
/// the collection does nothing.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    selected: HashSet<ItemId>,
    primary: Option<ItemId>,
}

/// Ids whose selected/primary state changed in one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDelta {
    pub changed: Vec<ItemId>,
    pub primary_before: Option<ItemId>,
    pub primary_after: Option<ItemId>,
}

impl SelectionDelta {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.primary_before == self.primary_after
    }

    pub fn primary_changed(&self) -> bool {
        self.primary_before != self.primary_after
    }

    /// Folds a later delta into this one.
    pub fn then(mut self, later: SelectionDelta) -> SelectionDelta {
        for id in later.changed {
            if !self.changed.contains(&id) {
                self.changed.push(id);
            }
        }
        self.primary_after = later.primary_after;
        self
    }
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selected.contains(&id)
    }

    pub fn primary(&self) -> Option<ItemId> {
        self.primary
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    #[cfg(test)]
    pub fn selected(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.selected.iter().copied()
    }

    fn delta(&self, changed: Vec<ItemId>, primary_before: Option<ItemId>) -> SelectionDelta {
        SelectionDelta {
            changed,
            primary_before,
            primary_after: self.primary,
        }
    }

    /// Flips membership of `id`. Removing the primary clears it.
    pub fn toggle(&mut self, id: ItemId, items: &ItemCollection) -> SelectionDelta {
        let before = self.primary;
        if !items.contains(id) {
            return self.delta(Vec::new(), before);
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        } else if self.primary == Some(id) {
            self.primary = None;
        }
        trace!(%id, selected = self.selected.len(), "selection toggled");
        self.delta(vec![id], before)
    }

    pub fn set_primary(&mut self, id: Option<ItemId>, items: &ItemCollection) -> SelectionDelta {
        let before = self.primary;
        if id.is_some_and(|id| !items.contains(id)) {
            return self.delta(Vec::new(), before);
        }
        self.primary = id;
        self.delta(Vec::new(), before)
    }

    /// Replaces the selection with `{id}`; primary is left alone.
    pub fn select_only(&mut self, id: ItemId, items: &ItemCollection) -> SelectionDelta {
        let before = self.primary;
        if !items.contains(id) {
            return self.delta(Vec::new(), before);
        }
        let was_selected = self.selected.contains(&id);
        let mut changed: Vec<ItemId> = self.selected.drain().filter(|&s| s != id).collect();
        if !was_selected {
            changed.push(id);
        }
        self.selected.insert(id);
        self.delta(changed, before)
    }

    /// Selects exactly the closed interval of positions between two ids.
    ///
    /// Positions come from the full collection, so the interval may span
    /// items that have no view element right now.
    pub fn select_range(
        &mut self,
        anchor: ItemId,
        target: ItemId,
        items: &ItemCollection,
    ) -> SelectionDelta {
        let before = self.primary;
        let (Some(a), Some(b)) = (items.position(anchor), items.position(target)) else {
            return self.delta(Vec::new(), before);
        };
        let (lo, hi) = (a.min(b), a.max(b));
        let range: HashSet<ItemId> = (lo..=hi)
            .filter_map(|position| items.get(position))
            .map(|item| item.id)
            .collect();

        let changed: Vec<ItemId> = self
            .selected
            .symmetric_difference(&range)
            .copied()
            .collect();
        self.selected = range;
        trace!(lo, hi, "range selected");
        self.delta(changed, before)
    }

    pub fn clear(&mut self) -> SelectionDelta {
        let before = self.primary;
        let changed: Vec<ItemId> = self.selected.drain().collect();
        self.primary = None;
        self.delta(changed, before)
    }

    /// Drops ids that are no longer part of the collection.
    pub fn retain_valid(&mut self, items: &ItemCollection) -> SelectionDelta {
        let before = self.primary;
        let mut changed = Vec::new();
        self.selected.retain(|id| {
            let keep = items.contains(*id);
            if !keep {
                changed.push(*id);
            }
            keep
        });
        if self.primary.is_some_and(|id| !items.contains(id)) {
            self.primary = None;
        }
        self.delta(changed, before)
    }

    pub fn summary(&self) -> String {
        selection_summary(self.selected.len())
    }
}

pub fn selection_summary(count: usize) -> String {
    match count {
        0 => "no items selected".to_string(),
        1 => "1 item selected".to_string(),
        n => format!("{} items selected", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaItem;
    use std::path::PathBuf;

    fn collection(n: usize) -> (ItemCollection, Vec<ItemId>) {
        let items: Vec<MediaItem> = (0..n)
            .map(|i| MediaItem::new(PathBuf::from(format!("{:03}.png", i))))
            .collect();
        let ids = items.iter().map(|i| i.id).collect();
        (ItemCollection::new(items).unwrap(), ids)
    }

    fn selected_set(sel: &SelectionModel) -> HashSet<ItemId> {
        sel.selected().collect()
    }

    #[test]
    fn test_toggle_and_primary() {
        let (items, ids) = collection(10);
        let mut sel = SelectionModel::new();
        let seven = ids[7];

        sel.toggle(seven, &items);
        assert_eq!(selected_set(&sel), HashSet::from([seven]));
        assert_eq!(sel.primary(), None);

        let delta = sel.set_primary(Some(seven), &items);
        assert!(delta.primary_changed());
        assert_eq!(sel.primary(), Some(seven));

        let delta = sel.toggle(seven, &items);
        assert!(sel.is_empty());
        assert_eq!(sel.primary(), None);
        assert_eq!(delta.changed, vec![seven]);
        assert!(delta.primary_changed());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let (items, _) = collection(3);
        let mut sel = SelectionModel::new();
        let ghost = ItemId(42);

        assert!(sel.toggle(ghost, &items).is_empty());
        assert!(sel.set_primary(Some(ghost), &items).is_empty());
        assert!(sel.select_only(ghost, &items).is_empty());
        assert!(sel.select_range(ghost, ghost, &items).is_empty());
        assert!(sel.is_empty());
        assert_eq!(sel.primary(), None);
    }

    #[test]
    fn test_select_range_is_closed_interval_either_way() {
        let (items, ids) = collection(50);
        let mut sel = SelectionModel::new();

        sel.select_range(ids[10], ids[30], &items);
        let forwards = selected_set(&sel);
        assert_eq!(forwards, ids[10..=30].iter().copied().collect());

        sel.clear();
        sel.select_range(ids[30], ids[10], &items);
        assert_eq!(selected_set(&sel), forwards);

        sel.select_range(ids[5], ids[5], &items);
        assert_eq!(selected_set(&sel), HashSet::from([ids[5]]));
    }

    #[test]
    fn test_select_range_replaces_and_reports_changes() {
        let (items, ids) = collection(20);
        let mut sel = SelectionModel::new();
        sel.select_range(ids[0], ids[4], &items);
        let delta = sel.select_range(ids[2], ids[6], &items);
        let changed: HashSet<ItemId> = delta.changed.into_iter().collect();
        assert_eq!(changed, HashSet::from([ids[0], ids[1], ids[5], ids[6]]));
    }

    #[test]
    fn test_select_only_and_clear() {
        let (items, ids) = collection(5);
        let mut sel = SelectionModel::new();
        sel.toggle(ids[0], &items);
        sel.toggle(ids[1], &items);
        sel.set_primary(Some(ids[1]), &items);

        let delta = sel.select_only(ids[3], &items);
        assert_eq!(selected_set(&sel), HashSet::from([ids[3]]));
        assert_eq!(delta.changed.len(), 3);

        let delta = sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.primary(), None);
        assert_eq!(delta.changed, vec![ids[3]]);
    }

    #[test]
    fn test_retain_valid_keeps_subset() {
        let (items, ids) = collection(6);
        let mut sel = SelectionModel::new();
        sel.select_range(ids[0], ids[5], &items);
        sel.set_primary(Some(ids[5]), &items);

        let (smaller, _) = collection(3);
        sel.retain_valid(&smaller);
        assert_eq!(sel.len(), 3);
        assert!(sel.selected().all(|id| smaller.contains(id)));
        assert_eq!(sel.primary(), None);
    }

    #[test]
    fn test_summary() {
        assert_eq!(selection_summary(0), "no items selected");
        assert_eq!(selection_summary(1), "1 item selected");
        assert_eq!(selection_summary(12), "12 items selected");
    }
}
