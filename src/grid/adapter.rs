//! Bridges window diffs to view-element lifecycle.
//!
//! The adapter's index → element map is the only owner of view elements.
//! Elements remember the `ItemId` they render and nothing else about the
//! grid, so there is no path from an element back to its owner.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::error::{GridError, GridResult};
use crate::grid::selection::SelectionModel;
use crate::grid::window::WindowDiff;
use crate::layout::GridLayout;
use crate::models::{ItemCollection, ItemId, MediaItem, MediaKind};

/// Visual state pushed into a materialized element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementField {
    Selected(bool),
    Primary(bool),
}

/// Lifecycle hooks of one materialized element.
pub trait ViewElement {
    fn item_id(&self) -> ItemId;

    fn on_attach(&mut self) {}

    fn on_state_change(&mut self, field: ElementField);

    fn on_detach(&mut self) {}
}

/// The rendering collaborator.
///
/// `build` creates a detached element; `attach` inserts it directly after
/// `after` (or first, when `None`), which keeps surface order equal to
/// index order. The remaining hooks are requests the grid makes of the
/// surface and default to doing nothing.
pub trait RenderSurface {
    type Element: ViewElement;

    fn build(
        &mut self,
        index: usize,
        item: &MediaItem,
        layout: &GridLayout,
    ) -> GridResult<Self::Element>;

    fn attach(&mut self, element: &Self::Element, index: usize, after: Option<&Self::Element>);

    fn detach(&mut self, element: &Self::Element);

    fn set_content_extent(&mut self, _layout: &GridLayout) {}

    fn show_preview(&mut self, _item: &MediaItem) {}

    fn open_detail(&mut self, _item: &MediaItem) {}

    fn open_context_menu(&mut self, _item: &MediaItem) {}

    fn selection_summary(&mut self, _summary: &str) {}

    fn reveal(&mut self, _index: usize, _layout: &GridLayout) {}
}

pub struct ViewAdapter<S: RenderSurface> {
    surface: S,
    elements: BTreeMap<usize, S::Element>,
    index_of: HashMap<ItemId, usize>,
}

impl<S: RenderSurface> ViewAdapter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            elements: BTreeMap::new(),
            index_of: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_materialized(&self, index: usize) -> bool {
        self.elements.contains_key(&index)
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    pub fn element(&self, index: usize) -> Option<&S::Element> {
        self.elements.get(&index)
    }

    /// Materialized indices in ascending (render) order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.elements.keys().copied()
    }

    pub fn first_index(&self) -> Option<usize> {
        self.elements.keys().next().copied()
    }

    /// Closest materialized index below `index`.
    pub fn previous_index(&self, index: usize) -> Option<usize> {
        self.elements.range(..index).next_back().map(|(i, _)| *i)
    }

    /// Closest materialized index above `index`.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        self.elements
            .range(index.saturating_add(1)..)
            .next()
            .map(|(i, _)| *i)
    }

    /// Materializes the item at `index`.
    ///
    /// Padded or out-of-range indices and indices that already have an
    /// element are ignored. An item that is already materialized elsewhere
    /// is destroyed there first. Fails on an unrecognized item kind.
    pub fn create(
        &mut self,
        index: usize,
        items: &ItemCollection,
        selection: &SelectionModel,
        layout: &GridLayout,
    ) -> GridResult<()> {
        let Some(item) = items.get(index) else {
            return Ok(());
        };
        if self.elements.contains_key(&index) {
            return Ok(());
        }
        if let MediaKind::Other(kind) = &item.kind {
            return Err(GridError::UnsupportedKind {
                id: item.id,
                kind: kind.clone(),
            });
        }
        if let Some(stale) = self.index_of.get(&item.id).copied() {
            debug!(id = %item.id, stale, index, "item already materialized, moving");
            self.destroy(stale);
        }

        let mut element = self.surface.build(index, item, layout)?;
        element.on_state_change(ElementField::Selected(selection.is_selected(item.id)));
        element.on_state_change(ElementField::Primary(selection.primary() == Some(item.id)));

        let after = self.elements.range(..index).next_back().map(|(_, e)| e);
        self.surface.attach(&element, index, after);
        element.on_attach();

        trace!(index, id = %item.id, "element created");
        self.index_of.insert(item.id, index);
        self.elements.insert(index, element);
        Ok(())
    }

    /// Detaches and drops the element at `index`, if any.
    pub fn destroy(&mut self, index: usize) {
        let Some(mut element) = self.elements.remove(&index) else {
            return;
        };
        element.on_detach();
        self.surface.detach(&element);
        let id = element.item_id();
        if self.index_of.get(&id) == Some(&index) {
            self.index_of.remove(&id);
        }
        trace!(index, %id, "element destroyed");
    }

    /// Applies a window diff: removals first, then creations in ascending order.
    ///
    /// Stops at the first failed creation, leaving earlier elements in place;
    /// `VirtualGrid` tears everything down in that case.
    pub fn apply(
        &mut self,
        diff: &WindowDiff,
        items: &ItemCollection,
        selection: &SelectionModel,
        layout: &GridLayout,
    ) -> GridResult<()> {
        for &index in &diff.removed {
            self.destroy(index);
        }
        for &index in &diff.created {
            self.create(index, items, selection, layout)?;
        }
        Ok(())
    }

    /// Destroys every element.
    pub fn teardown(&mut self) {
        let indices: Vec<usize> = self.elements.keys().copied().collect();
        for index in indices {
            self.destroy(index);
        }
        debug!("view adapter torn down");
    }

    /// Pushes a state change into the element for `id`, if it is materialized.
    pub fn update_state(&mut self, id: ItemId, field: ElementField) {
        let Some(index) = self.index_of.get(&id).copied() else {
            return;
        };
        if let Some(element) = self.elements.get_mut(&index) {
            element.on_state_change(field);
        }
    }
}
