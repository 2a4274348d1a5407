//! The incremental filter/sort engine shared by flat and per-group views.
//!
//! `OrderedItems` keeps the view's items in "filter the source, then stable
//! sort" order and updates that order incrementally. Every method leaves the
//! items exactly as a full [`rebuild`](OrderedItems::rebuild) from the same
//! source would.
//!
//! Ties under the comparer keep source order. Inserting into a run of equal
//! keys therefore walks the source prefix in front of the new item and
//! counts how many members of the run it passes. Without a comparer the
//! whole view is one run, which is the positional insert walk.

use std::cmp::Ordering;

use horizon_collections_core::PerfSpan;
use horizon_collections_core::logging::{span_names, targets};

use super::change::CollectionChange;
use super::shaping::FilterFn;
use super::sort::ItemComparer;

pub(crate) struct OrderedItems<T> {
    items: Vec<T>,
    filter: Option<FilterFn<T>>,
    comparer: ItemComparer<T>,
    live_shaping: bool,
    live_filter_properties: Vec<String>,
}

impl<T: Clone + PartialEq> OrderedItems<T> {
    pub fn new(
        filter: Option<FilterFn<T>>,
        comparer: ItemComparer<T>,
        live_shaping: bool,
        live_filter_properties: Vec<String>,
    ) -> Self {
        Self {
            items: Vec::new(),
            filter,
            comparer,
            live_shaping,
            live_filter_properties,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    pub fn is_live_shaping(&self) -> bool {
        self.live_shaping
    }

    pub fn set_live_filter_properties(&mut self, properties: Vec<String>) {
        self.live_filter_properties = properties;
    }

    pub fn set_filter(&mut self, filter: Option<FilterFn<T>>) {
        self.filter = filter;
    }

    pub fn set_comparer(&mut self, comparer: ItemComparer<T>) {
        self.comparer = comparer;
    }

    fn passes(&self, item: &T) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(item))
    }

    /// Filter the whole source and stable-sort the survivors.
    pub fn rebuild(&mut self, source: &[T]) {
        let _perf = PerfSpan::new(span_names::REBUILD);
        let mut items: Vec<T> = source
            .iter()
            .filter(|item| self.passes(item))
            .cloned()
            .collect();
        if !self.comparer.is_empty() {
            let comparer = &self.comparer;
            items.sort_by(|a, b| comparer.compare(a, b));
        }
        tracing::debug!(
            target: targets::VIEW,
            source_len = source.len(),
            view_len = items.len(),
            "rebuilt view"
        );
        self.items = items;
    }

    /// Where `item`, found at `source_index` in `source`, belongs in the view.
    ///
    /// `item` itself must not currently be in the view.
    fn insertion_slot(&self, source: &[T], source_index: usize, item: &T) -> usize {
        let (start, end) = if self.comparer.is_empty() {
            (0, self.items.len())
        } else {
            let comparer = &self.comparer;
            let start = self
                .items
                .partition_point(|probe| comparer.compare(probe, item) == Ordering::Less);
            let run = self.items[start..]
                .partition_point(|probe| comparer.compare(probe, item) != Ordering::Greater);
            (start, start + run)
        };
        if start == end {
            return start;
        }

        let mut slot = start;
        for candidate in &source[..source_index.min(source.len())] {
            if slot == end {
                break;
            }
            if *candidate == self.items[slot] {
                slot += 1;
            }
        }
        slot
    }

    /// Handle one item added to the source at `source_index`.
    ///
    /// Returns the view index the item was inserted at, or `None` if the
    /// filter rejected it.
    pub fn insert_from_source(&mut self, source: &[T], source_index: usize, item: &T) -> Option<usize> {
        if !self.passes(item) {
            return None;
        }
        let slot = self.insertion_slot(source, source_index, item);
        self.items.insert(slot, item.clone());
        Some(slot)
    }

    /// Handle one item removed from the source.
    ///
    /// Returns the view index it was removed from, or `None` if it was not in
    /// the view.
    pub fn remove_item(&mut self, item: &T) -> Option<usize> {
        let index = self.index_of(item)?;
        self.items.remove(index);
        Some(index)
    }

    /// Re-apply the filter: drop items that now fail it, then insert source
    /// items that now pass. Returns `true` if the items changed.
    pub fn apply_filter(&mut self, source: &[T]) -> bool {
        let before = self.items.len();
        let filter = self.filter.clone();
        if let Some(filter) = &filter {
            self.items.retain(|item| filter(item));
        }
        let mut changed = self.items.len() != before;

        for (source_index, item) in source.iter().enumerate() {
            if self.passes(item) && self.index_of(item).is_none() {
                let slot = self.insertion_slot(source, source_index, item);
                self.items.insert(slot, item.clone());
                changed = true;
            }
        }
        changed
    }

    /// Re-derive the order under the current comparer.
    ///
    /// Starts again from the source so ties fall back to source order rather
    /// than to the previous sort order.
    pub fn resort(&mut self, source: &[T]) {
        self.rebuild(source);
    }

    /// Translate one source change into view changes.
    ///
    /// Single-item changes are applied incrementally and produce at most one
    /// view change. Batches and resets rebuild and produce one `Reset`.
    pub fn apply_source_change(&mut self, source: &[T], change: &CollectionChange<T>) -> Vec<CollectionChange<T>> {
        if !change.is_single_item() {
            self.rebuild(source);
            return vec![CollectionChange::Reset];
        }

        match change {
            CollectionChange::Added { index, items } => {
                let item = &items[0];
                self.insert_from_source(source, *index, item)
                    .map(|slot| CollectionChange::added(slot, item.clone()))
                    .into_iter()
                    .collect()
            }
            CollectionChange::Removed { items, .. } => {
                let item = &items[0];
                self.remove_item(item)
                    .map(|slot| CollectionChange::removed(slot, item.clone()))
                    .into_iter()
                    .collect()
            }
            CollectionChange::Replaced {
                index,
                old_items,
                new_items,
            } => {
                let (old_item, new_item) = (&old_items[0], &new_items[0]);
                let removed = self.remove_item(old_item);
                let added = self.insert_from_source(source, *index, new_item);
                match (removed, added) {
                    (None, None) => Vec::new(),
                    (Some(slot), None) => vec![CollectionChange::removed(slot, old_item.clone())],
                    (None, Some(slot)) => vec![CollectionChange::added(slot, new_item.clone())],
                    (Some(old_slot), Some(new_slot)) if old_slot == new_slot => vec![
                        CollectionChange::replaced(new_slot, old_item.clone(), new_item.clone()),
                    ],
                    (Some(_), Some(_)) => vec![CollectionChange::Reset],
                }
            }
            CollectionChange::Moved { new_index, items, .. } => {
                let item = &items[0];
                let Some(old_slot) = self.remove_item(item) else {
                    return Vec::new();
                };
                let new_slot = self.insertion_slot(source, *new_index, item);
                self.items.insert(new_slot, item.clone());
                if old_slot == new_slot {
                    Vec::new()
                } else {
                    vec![CollectionChange::moved(old_slot, new_slot, item.clone())]
                }
            }
            CollectionChange::Reset => unreachable!("reset is never a single-item change"),
        }
    }

    /// React to a property change on `item` (live shaping).
    ///
    /// `None` or an empty name means "anything may have changed" and rebuilds.
    pub fn refresh_item(&mut self, source: &[T], item: &T, property: Option<&str>) -> Vec<CollectionChange<T>> {
        if !self.live_shaping {
            return Vec::new();
        }
        let Some(property) = property.filter(|name| !name.is_empty()) else {
            self.rebuild(source);
            return vec![CollectionChange::Reset];
        };

        let current = self.index_of(item);

        if self.is_filter_property(property) {
            match (current, self.passes(item)) {
                (Some(index), false) => {
                    self.items.remove(index);
                    return vec![CollectionChange::removed(index, item.clone())];
                }
                (None, true) => {
                    let Some(source_index) = source.iter().position(|candidate| candidate == item) else {
                        return Vec::new();
                    };
                    let slot = self.insertion_slot(source, source_index, item);
                    self.items.insert(slot, item.clone());
                    return vec![CollectionChange::added(slot, item.clone())];
                }
                _ => {}
            }
        }

        if let Some(old_slot) = current
            && self.comparer.depends_on(property)
        {
            let Some(source_index) = source.iter().position(|candidate| candidate == item) else {
                return Vec::new();
            };
            self.items.remove(old_slot);
            let new_slot = self.insertion_slot(source, source_index, item);
            self.items.insert(new_slot, item.clone());
            if new_slot != old_slot {
                tracing::trace!(target: targets::VIEW, old_slot, new_slot, property, "repositioned item");
                return vec![CollectionChange::moved(old_slot, new_slot, item.clone())];
            }
        }
        Vec::new()
    }

    fn is_filter_property(&self, property: &str) -> bool {
        self.filter.is_some()
            && (self.live_filter_properties.is_empty()
                || self.live_filter_properties.iter().any(|name| name == property))
    }
}
