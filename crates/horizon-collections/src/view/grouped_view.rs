//! A view over a source of groups, flattened into one item sequence.
//!
//! `GroupedView` owns one [`GroupView`] per group object, in source order.
//! Changes inside a group are re-announced in flattened coordinates: the
//! number of items in all preceding groups plus the group-local index. That
//! offset is recomputed from the current group list on every translation.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use horizon_collections_core::logging::{span_names, targets};
use horizon_collections_core::{ConnectionGuard, PerfSpan};
use parking_lot::Mutex;

use super::change::{CollectionChange, ViewSignals, ViewUpdate};
use super::currency::Currency;
use super::defer::{DeferRefresh, DeferTarget};
use super::flat_view::FlatView;
use super::group_view::{GroupId, GroupView, GroupViewKind, ItemsBinding};
use super::shaping::{FilterFn, ViewShaping};
use super::sort::SortDescription;
use super::source::SharedSource;
use super::traits::{GroupObject, ItemsView, ViewItem};
use crate::error::{Result, ViewError};

struct GroupEntry<G, T: ViewItem> {
    view: GroupView<G, T>,
    _subscription: ConnectionGuard<CollectionChange<T>>,
}

struct GroupedState<G, T: ViewItem> {
    entries: Vec<GroupEntry<G, T>>,
    shaping: ViewShaping<T>,
    total: usize,
    /// The count observers last saw.
    published: usize,
    currency: Currency<T>,
    defer_depth: usize,
    /// Group contents changed while deferred.
    stale: bool,
    /// The set of groups changed while deferred.
    groups_stale: bool,
}

impl<G: GroupObject, T: ViewItem> GroupedState<G, T> {
    fn count_items_before_group(&self, position: usize) -> usize {
        self.entries[..position].iter().map(|entry| entry.view.count()).sum()
    }

    fn recount(&self) -> usize {
        self.count_items_before_group(self.entries.len())
    }

    fn flattened(&self) -> Vec<T> {
        self.entries.iter().flat_map(|entry| entry.view.items()).collect()
    }

    fn position_of(&self, id: GroupId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.view.id() == id)
    }

    fn insert_entries(&mut self, index: usize, entries: Vec<GroupEntry<G, T>>) {
        let tail = self.entries.split_off(index);
        self.entries.extend(entries);
        self.entries.extend(tail);
    }

    fn views(&self) -> Vec<FlatView<T>> {
        self.entries.iter().map(|entry| entry.view.view().clone()).collect()
    }

    fn is_deferred(&self) -> bool {
        self.defer_depth > 0
    }

    fn begin_update(&self) -> ViewUpdate<T> {
        ViewUpdate::new(self.published, self.currency.position())
    }

    fn finish_update(&mut self, update: &mut ViewUpdate<T>, changes: Vec<CollectionChange<T>>) {
        debug_assert_eq!(self.total, self.recount(), "grouped count drifted from group counts");
        if !changes.is_empty() {
            let items = self.flattened();
            for change in &changes {
                self.currency.apply(change, &items);
            }
        }
        update.changes.extend(changes);
        update.count_after = self.total;
        self.published = self.total;
        update.current_after = self.currency.position();
    }
}

/// Holds the suppress counter up for the duration of a bulk operation.
struct Suppress<'a>(&'a AtomicUsize);

impl<'a> Suppress<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for Suppress<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct GroupedInner<G, T: ViewItem> {
    weak_self: Weak<GroupedInner<G, T>>,
    groups: SharedSource<G>,
    binding: ItemsBinding<G, T>,
    state: Mutex<GroupedState<G, T>>,
    suppress: AtomicUsize,
    next_id: AtomicU64,
    signals: ViewSignals<T>,
    subscription: Mutex<Option<ConnectionGuard<CollectionChange<G>>>>,
}

impl<G: GroupObject, T: ViewItem> GroupedInner<G, T> {
    fn build_entry(&self, group: G, shaping: &ViewShaping<T>) -> Result<GroupEntry<G, T>> {
        let id = GroupId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let view = GroupView::new(id, group, &self.binding, shaping)?;
        let weak = self.weak_self.clone();
        let subscription = view.signals().collection_changed.connect_scoped(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.on_group_items_changed(id, change);
            }
        });
        Ok(GroupEntry {
            view,
            _subscription: subscription,
        })
    }

    fn build_entries(&self, groups: &[G], shaping: &ViewShaping<T>) -> Result<Vec<GroupEntry<G, T>>> {
        groups
            .iter()
            .cloned()
            .map(|group| self.build_entry(group, shaping))
            .collect()
    }

    /// Replace every group view and emit one `Reset`.
    fn rebuild_groups(&self) -> Result<()> {
        self.rebuild_with(None)
    }

    /// Rebuild under `shaping`, which is only committed once every group
    /// resolved.
    fn rebuild_with(&self, shaping: Option<ViewShaping<T>>) -> Result<()> {
        let _perf = PerfSpan::new(span_names::REBUILD_GROUPS);
        let (update, _retired) = {
            let mut state = self.state.lock();
            if state.is_deferred() {
                if let Some(shaping) = shaping {
                    state.shaping = shaping;
                }
                state.groups_stale = true;
                return Ok(());
            }
            let shaping = shaping.unwrap_or_else(|| state.shaping.clone());
            let entries = self.build_entries(&self.groups.snapshot(), &shaping)?;

            let mut update = state.begin_update();
            state.shaping = shaping;
            let retired = std::mem::replace(&mut state.entries, entries);
            state.total = state.recount();
            state.stale = false;
            state.groups_stale = false;
            tracing::debug!(
                target: targets::GROUPED,
                groups = state.entries.len(),
                count = state.total,
                "rebuilt groups"
            );
            state.finish_update(&mut update, vec![CollectionChange::Reset]);
            (update, retired)
        };
        self.signals.publish(update);
        Ok(())
    }

    fn on_group_items_changed(&self, id: GroupId, change: &CollectionChange<T>) {
        if self.suppress.load(Ordering::Acquire) > 0 {
            return;
        }
        let update = {
            let mut state = self.state.lock();
            let Some(position) = state.position_of(id) else {
                return;
            };
            let mut update = state.begin_update();
            match change {
                CollectionChange::Added { items, .. } => state.total += items.len(),
                CollectionChange::Removed { items, .. } => state.total -= items.len(),
                CollectionChange::Reset => state.total = state.recount(),
                CollectionChange::Replaced { .. } | CollectionChange::Moved { .. } => {}
            }
            let flattened = change.clone().offset(state.count_items_before_group(position));
            if state.is_deferred() {
                state.stale = true;
                return;
            }
            tracing::trace!(target: targets::GROUPED, group = position, kind = ?flattened.kind(), "group items changed");
            state.finish_update(&mut update, vec![flattened]);
            update
        };
        self.signals.publish(update);
    }

    fn on_source_groups_changed(&self, change: &CollectionChange<G>) -> Result<()> {
        let (update, _retired) = {
            let mut state = self.state.lock();
            if state.is_deferred() {
                state.groups_stale = true;
                return Ok(());
            }
            let len = state.entries.len();
            let shaping = state.shaping.clone();
            let mut update = state.begin_update();
            let mut retired = Vec::new();

            let changes = match change {
                CollectionChange::Added { index, items } if *index <= len => {
                    let entries = self.build_entries(items, &shaping)?;
                    let start = state.count_items_before_group(*index);
                    let added: Vec<T> = entries.iter().flat_map(|entry| entry.view.items()).collect();
                    state.insert_entries(*index, entries);
                    state.total += added.len();
                    if added.is_empty() {
                        Vec::new()
                    } else {
                        vec![CollectionChange::Added {
                            index: start,
                            items: added,
                        }]
                    }
                }
                CollectionChange::Removed { index, items } if index + items.len() <= len => {
                    let start = state.count_items_before_group(*index);
                    retired = state.entries.drain(*index..index + items.len()).collect();
                    let removed: Vec<T> = retired.iter().flat_map(|entry| entry.view.items()).collect();
                    state.total -= removed.len();
                    if removed.is_empty() {
                        Vec::new()
                    } else {
                        vec![CollectionChange::Removed {
                            index: start,
                            items: removed,
                        }]
                    }
                }
                CollectionChange::Replaced {
                    index,
                    old_items,
                    new_items,
                } if index + old_items.len() <= len => {
                    let entries = self.build_entries(new_items, &shaping)?;
                    let start = state.count_items_before_group(*index);
                    let added: Vec<T> = entries.iter().flat_map(|entry| entry.view.items()).collect();
                    retired = state
                        .entries
                        .splice(*index..index + old_items.len(), entries)
                        .collect();
                    let removed: Vec<T> = retired.iter().flat_map(|entry| entry.view.items()).collect();
                    state.total = state.total - removed.len() + added.len();
                    match (removed.is_empty(), added.is_empty()) {
                        (true, true) => Vec::new(),
                        (true, false) => vec![CollectionChange::Added {
                            index: start,
                            items: added,
                        }],
                        (false, true) => vec![CollectionChange::Removed {
                            index: start,
                            items: removed,
                        }],
                        (false, false) if removed.len() == added.len() => vec![CollectionChange::Replaced {
                            index: start,
                            old_items: removed,
                            new_items: added,
                        }],
                        (false, false) => vec![CollectionChange::Reset],
                    }
                }
                CollectionChange::Moved {
                    old_index,
                    new_index,
                    items,
                } if old_index + items.len() <= len && new_index + items.len() <= len => {
                    let old_start = state.count_items_before_group(*old_index);
                    let moving: Vec<GroupEntry<G, T>> =
                        state.entries.drain(*old_index..old_index + items.len()).collect();
                    let moved: Vec<T> = moving.iter().flat_map(|entry| entry.view.items()).collect();
                    state.insert_entries(*new_index, moving);
                    let new_start = state.count_items_before_group(*new_index);
                    if moved.is_empty() || old_start == new_start {
                        Vec::new()
                    } else {
                        vec![CollectionChange::Moved {
                            old_index: old_start,
                            new_index: new_start,
                            items: moved,
                        }]
                    }
                }
                _ => {
                    drop(state);
                    return self.rebuild_groups();
                }
            };

            tracing::trace!(target: targets::GROUPED, kind = ?change.kind(), groups = state.entries.len(), "groups changed");
            state.finish_update(&mut update, changes);
            (update, retired)
        };
        self.signals.publish(update);
        Ok(())
    }

    /// Run `apply` on every group view without re-entering the per-group
    /// handler, then announce one `Reset`.
    fn propagate(&self, mut apply: impl FnMut(&FlatView<T>)) {
        let views = self.state.lock().views();
        {
            let _suppress = Suppress::new(&self.suppress);
            for view in &views {
                apply(view);
            }
        }
        self.settle_after_bulk();
    }

    fn settle_after_bulk(&self) {
        let update = {
            let mut state = self.state.lock();
            let mut update = state.begin_update();
            state.total = state.recount();
            if state.is_deferred() {
                state.stale = true;
                return;
            }
            state.finish_update(&mut update, vec![CollectionChange::Reset]);
            update
        };
        self.signals.publish(update);
    }

    fn report(&self, result: Result<()>) {
        if let Err(err) = result {
            tracing::error!(target: targets::GROUPED, %err, "grouped view cannot follow its source");
            panic!("grouped view cannot follow its source: {err}");
        }
    }
}

impl<G: GroupObject, T: ViewItem> DeferTarget for GroupedInner<G, T> {
    fn begin_defer(&self) {
        self.state.lock().defer_depth += 1;
    }

    fn end_defer(&self) {
        let groups_stale = {
            let mut state = self.state.lock();
            state.defer_depth = state.defer_depth.saturating_sub(1);
            if state.is_deferred() || !(state.stale || state.groups_stale) {
                return;
            }
            state.groups_stale
        };
        if groups_stale {
            let result = self.rebuild_groups();
            self.report(result);
        } else {
            let update = {
                let mut state = self.state.lock();
                state.stale = false;
                let mut update = state.begin_update();
                state.total = state.recount();
                tracing::debug!(target: targets::GROUPED, count = state.total, "deferred refresh settled");
                state.finish_update(&mut update, vec![CollectionChange::Reset]);
                update
            };
            self.signals.publish(update);
        }
    }
}

/// A live view over a source whose elements are groups.
///
/// Each group object is resolved to its members through an [`ItemsBinding`]
/// and shown as a [`GroupView`]. Observers see the concatenation of all
/// groups' items, in group order, and receive every change in that
/// flattened index space.
///
/// The view's count always equals the sum of its groups' counts. Flat
/// mutation (`add`, `insert`, `remove`, `clear`) is rejected because group
/// membership cannot be inferred from a flat position; mutate the group's
/// own collection instead.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_collections::view::{GroupedView, ItemsBinding, ObservableVec, ViewShaping};
///
/// let fruit = ObservableVec::shared(vec!["apple", "banana"]);
/// let veg = ObservableVec::shared(vec!["carrot"]);
/// let groups = ObservableVec::shared(vec![fruit.clone(), veg.clone()]);
///
/// let view = GroupedView::new(groups, ItemsBinding::enumerable(), ViewShaping::new()).unwrap();
/// assert_eq!(view.count(), 3);
///
/// veg.push("daikon");
/// assert_eq!(view.items(), vec!["apple", "banana", "carrot", "daikon"]);
/// ```
pub struct GroupedView<G, T: ViewItem> {
    inner: Arc<GroupedInner<G, T>>,
}

impl<G: GroupObject, T: ViewItem> GroupedView<G, T> {
    /// Build a grouped view over the groups in `groups`.
    ///
    /// Fails if any group cannot be resolved through `binding`, or if sort
    /// descriptions are set without a resolver.
    pub fn new(groups: SharedSource<G>, binding: ItemsBinding<G, T>, shaping: ViewShaping<T>) -> Result<Self> {
        shaping.comparer()?;
        let inner = Arc::new_cyclic(|weak_self| GroupedInner {
            weak_self: weak_self.clone(),
            groups,
            binding,
            state: Mutex::new(GroupedState {
                entries: Vec::new(),
                shaping,
                total: 0,
                published: 0,
                currency: Currency::new(&[]),
                defer_depth: 0,
                stale: false,
                groups_stale: false,
            }),
            suppress: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            signals: ViewSignals::new(),
            subscription: Mutex::new(None),
        });

        {
            let _suppress = Suppress::new(&inner.suppress);
            let mut state = inner.state.lock();
            let shaping = state.shaping.clone();
            state.entries = inner.build_entries(&inner.groups.snapshot(), &shaping)?;
            state.total = state.recount();
            state.published = state.total;
            let items = state.flattened();
            state.currency = Currency::new(&items);
        }

        if let Some(changes) = inner.groups.changes() {
            let weak = Arc::downgrade(&inner);
            let guard = changes.connect_scoped(move |change| {
                if let Some(inner) = weak.upgrade() {
                    let result = inner.on_source_groups_changed(change);
                    inner.report(result);
                }
            });
            *inner.subscription.lock() = Some(guard);
        }

        tracing::debug!(
            target: targets::GROUPED,
            groups = inner.state.lock().entries.len(),
            "created grouped view"
        );
        Ok(Self { inner })
    }

    /// The source of group objects.
    pub fn groups_source(&self) -> SharedSource<G> {
        self.inner.groups.clone()
    }

    /// How group members are resolved.
    pub fn binding(&self) -> &ItemsBinding<G, T> {
        &self.inner.binding
    }

    /// The view's signals, in flattened coordinates.
    pub fn signals(&self) -> &ViewSignals<T> {
        &self.inner.signals
    }

    /// Total number of items across all groups.
    pub fn count(&self) -> usize {
        self.inner.state.lock().total
    }

    /// Returns `true` if no group shows any item.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The item at flattened position `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        let state = self.inner.state.lock();
        let mut offset = index;
        for entry in &state.entries {
            let count = entry.view.count();
            if offset < count {
                return entry.view.get(offset);
            }
            offset -= count;
        }
        None
    }

    /// All items of all groups, in group order.
    pub fn items(&self) -> Vec<T> {
        self.inner.state.lock().flattened()
    }

    /// Flattened position of `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        let state = self.inner.state.lock();
        let mut offset = 0;
        for entry in &state.entries {
            if let Some(local) = entry.view.index_of(item) {
                return Some(offset + local);
            }
            offset += entry.view.count();
        }
        None
    }

    /// Returns `true` if any group shows `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    // -------------------------------------------------------------------------
    // Groups
    // -------------------------------------------------------------------------

    /// The group views, in source order.
    pub fn groups(&self) -> Vec<GroupView<G, T>> {
        self.inner
            .state
            .lock()
            .entries
            .iter()
            .map(|entry| entry.view.clone())
            .collect()
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// The group view at `position`.
    pub fn group(&self, position: usize) -> Option<GroupView<G, T>> {
        self.inner
            .state
            .lock()
            .entries
            .get(position)
            .map(|entry| entry.view.clone())
    }

    /// The items of the group at `position`.
    pub fn group_items(&self, position: usize) -> Option<Vec<T>> {
        self.group(position).map(|group| group.items())
    }

    /// Number of items shown in the groups before `position`.
    pub fn count_items_before_group(&self, position: usize) -> usize {
        let state = self.inner.state.lock();
        state.count_items_before_group(position.min(state.entries.len()))
    }

    // -------------------------------------------------------------------------
    // Shaping
    // -------------------------------------------------------------------------

    /// The current shaping options.
    pub fn shaping(&self) -> ViewShaping<T> {
        self.inner.state.lock().shaping.clone()
    }

    /// Returns `true` if groups react to item property changes.
    pub fn is_live_shaping(&self) -> bool {
        self.inner.state.lock().shaping.live_shaping
    }

    /// Filter every group with `filter`.
    ///
    /// Can only fail if plain groups have to be rebuilt and one of them no
    /// longer resolves.
    pub fn set_filter<F>(&self, filter: F) -> Result<()>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.set_filter_fn(Some(Arc::new(filter)))
    }

    /// Show every member of every group.
    pub fn clear_filter(&self) -> Result<()> {
        self.set_filter_fn(None)
    }

    /// Replace the filter of every group.
    pub fn set_filter_fn(&self, filter: Option<FilterFn<T>>) -> Result<()> {
        self.set_shaping(self.shaping().filter_fn(filter))
    }

    /// Replace the sort descriptions of every group.
    pub fn set_sort_descriptions(&self, descriptions: Vec<SortDescription>) -> Result<()> {
        self.set_shaping(self.shaping().sort_descriptions(descriptions))
    }

    /// Set the properties whose changes re-evaluate the filter.
    pub fn set_live_filter_properties(&self, properties: Vec<String>) {
        let views = {
            let mut state = self.inner.state.lock();
            state.shaping.live_filter_properties = properties.clone();
            state.views()
        };
        for view in views {
            view.set_live_filter_properties(properties.clone());
        }
    }

    /// Apply the filter, sort and live-filter options of `shaping` to every
    /// group and emit one `Reset`.
    ///
    /// Plain groups cannot filter or sort; if any exist and the new shaping
    /// needs them to, all groups are rebuilt instead. The live-shaping flag
    /// is fixed for the lifetime of the view and is ignored here.
    pub fn set_shaping(&self, shaping: ViewShaping<T>) -> Result<()> {
        shaping.comparer()?;
        let (changed, needs_rebuild, effective) = {
            let state = self.inner.state.lock();
            let changed = !state.shaping.same_filter(&shaping) || !state.shaping.same_sort(&shaping);
            let mut effective = state.shaping.clone();
            effective.filter = shaping.filter;
            effective.sort_descriptions = shaping.sort_descriptions;
            effective.resolver = shaping.resolver;
            effective.live_filter_properties = shaping.live_filter_properties;
            let needs_rebuild = changed
                && GroupViewKind::for_shaping(&effective) == GroupViewKind::SortFilterCapable
                && state
                    .entries
                    .iter()
                    .any(|entry| entry.view.kind() == GroupViewKind::Plain);
            (changed, needs_rebuild, effective)
        };

        if needs_rebuild {
            tracing::debug!(target: targets::GROUPED, "plain groups cannot be reshaped; rebuilding");
            return self.inner.rebuild_with(Some(effective));
        }
        if !changed {
            self.set_live_filter_properties(effective.live_filter_properties);
            return Ok(());
        }
        self.inner.state.lock().shaping = effective.clone();

        let mut failure = None;
        self.inner.propagate(|view| {
            if let Err(err) = view.set_shaping(effective.clone()) {
                failure.get_or_insert(err);
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Rebuild every group from the source and emit one `Reset`.
    pub fn refresh(&self) -> Result<()> {
        self.inner.rebuild_groups()
    }

    /// Re-run the filter in every group.
    pub fn refresh_filter(&self) {
        self.inner.propagate(FlatView::refresh_filter);
    }

    /// Re-sort every group.
    pub fn refresh_sorting(&self) {
        self.inner.propagate(FlatView::refresh_sorting);
    }

    /// Tell the view that `property` of `item` changed.
    ///
    /// With a property name, only the group holding the item reacts and its
    /// change is re-announced in flattened coordinates. `None` re-evaluates
    /// every group and emits one `Reset`.
    pub fn notify_item_property_changed(&self, item: &T, property: Option<&str>) {
        if !self.is_live_shaping() {
            return;
        }
        match property.filter(|name| !name.is_empty()) {
            Some(name) => {
                let views = self.inner.state.lock().views();
                for view in views {
                    view.notify_item_property_changed(item, Some(name));
                }
            }
            None => self
                .inner
                .propagate(|view| view.notify_item_property_changed(item, None)),
        }
    }

    /// Postpone notifications until the returned guard is dropped.
    ///
    /// Groups keep their contents current while deferred; the grouped view
    /// announces everything that happened as one `Reset` at the end.
    pub fn defer_refresh(&self) -> DeferRefresh {
        DeferRefresh::new(self.inner.clone())
    }

    /// Returns `true` while a [`DeferRefresh`] guard is alive.
    pub fn is_refresh_deferred(&self) -> bool {
        self.inner.state.lock().is_deferred()
    }

    // -------------------------------------------------------------------------
    // Currency
    // -------------------------------------------------------------------------

    /// The current flattened position, if any.
    pub fn current_position(&self) -> Option<usize> {
        self.inner.state.lock().currency.position()
    }

    /// The item at the current position, if any.
    pub fn current_item(&self) -> Option<T> {
        self.inner.state.lock().currency.item().cloned()
    }

    /// Make `item` current. Returns `false` (and clears currency) if no group
    /// shows it.
    pub fn move_current_to(&self, item: &T) -> bool {
        self.move_current(|items, _| items.iter().position(|candidate| candidate == item))
    }

    /// Make the item at flattened `position` current.
    pub fn move_current_to_position(&self, position: usize) -> Result<()> {
        let count = self.count();
        if position >= count {
            return Err(ViewError::out_of_range(position, count));
        }
        self.move_current(|_, _| Some(position));
        Ok(())
    }

    /// Make the first item current.
    pub fn move_current_to_first(&self) -> bool {
        self.move_current(|items, _| (!items.is_empty()).then_some(0))
    }

    /// Make the last item current.
    pub fn move_current_to_last(&self) -> bool {
        self.move_current(|items, _| items.len().checked_sub(1))
    }

    /// Advance currency by one. Stays on the last item at the end.
    pub fn move_current_to_next(&self) -> bool {
        let before = self.current_position();
        self.move_current(|items, current| match current {
            Some(position) if position + 1 < items.len() => Some(position + 1),
            other => other,
        });
        self.current_position() != before
    }

    /// Step currency back by one. Stays on the first item at the start.
    pub fn move_current_to_previous(&self) -> bool {
        let before = self.current_position();
        self.move_current(|_, current| match current {
            Some(position) if position > 0 => Some(position - 1),
            other => other,
        });
        self.current_position() != before
    }

    fn move_current(&self, target: impl FnOnce(&[T], Option<usize>) -> Option<usize>) -> bool {
        let update = {
            let mut state = self.inner.state.lock();
            let mut update = state.begin_update();
            let items = state.flattened();
            let position = target(&items, state.currency.position());
            state.currency.set(position, &items);
            update.current_after = state.currency.position();
            update
        };
        let on_item = update.current_after.is_some();
        self.inner.signals.publish(update);
        on_item
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    fn reject_mutation<R>(&self, operation: &'static str) -> Result<R> {
        tracing::warn!(target: targets::GROUPED, operation, "flat mutation on a grouped view");
        Err(ViewError::GroupedViewNotMutable)
    }

    /// Always fails: a grouped view cannot be mutated directly.
    pub fn add(&self, _item: T) -> Result<()> {
        self.reject_mutation("add")
    }

    /// Always fails: a grouped view cannot be mutated directly.
    pub fn insert(&self, _index: usize, _item: T) -> Result<()> {
        self.reject_mutation("insert")
    }

    /// Always fails: a grouped view cannot be mutated directly.
    pub fn remove(&self, _item: &T) -> Result<bool> {
        self.reject_mutation("remove")
    }

    /// Always fails: a grouped view cannot be mutated directly.
    pub fn remove_at(&self, _index: usize) -> Result<T> {
        self.reject_mutation("remove_at")
    }

    /// Always fails: a grouped view cannot be mutated directly.
    pub fn clear(&self) -> Result<()> {
        self.reject_mutation("clear")
    }
}

impl<G, T: ViewItem> Clone for GroupedView<G, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<G: GroupObject, T: ViewItem + fmt::Debug> fmt::Debug for GroupedView<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("GroupedView")
            .field("groups", &state.entries.len())
            .field("count", &state.total)
            .field("shaping", &state.shaping)
            .finish()
    }
}

impl<G: GroupObject, T: ViewItem> ItemsView<T> for GroupedView<G, T> {
    fn count(&self) -> usize {
        GroupedView::count(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        GroupedView::get(self, index)
    }

    fn items(&self) -> Vec<T> {
        GroupedView::items(self)
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        GroupedView::index_of(self, item)
    }

    fn signals(&self) -> &ViewSignals<T> {
        GroupedView::signals(self)
    }

    fn current_position(&self) -> Option<usize> {
        GroupedView::current_position(self)
    }

    fn current_item(&self) -> Option<T> {
        GroupedView::current_item(self)
    }
}

static_assertions::assert_impl_all!(GroupedView<String, i32>: Send, Sync, Clone);
