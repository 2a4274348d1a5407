//! Filtered and sorted view over one flat source.
//!
//! `FlatView` listens to its source's change signal and keeps its own item
//! list up to date incrementally. Single-item source changes produce at most
//! one view notification; batches and resets rebuild the view and produce one
//! `Reset`.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_collections_core::ConnectionGuard;
use horizon_collections_core::logging::targets;
use parking_lot::Mutex;

use super::change::{CollectionChange, ViewSignals, ViewUpdate};
use super::currency::Currency;
use super::defer::{DeferRefresh, DeferTarget};
use super::ordered::OrderedItems;
use super::shaping::{FilterFn, ViewShaping};
use super::sort::{ItemComparer, SortDescription};
use super::source::{MutableIndexedCollection, SharedSource};
use super::traits::{ItemsView, ViewItem};
use crate::error::{Result, ViewError};

struct FlatState<T> {
    ordered: OrderedItems<T>,
    shaping: ViewShaping<T>,
    currency: Currency<T>,
    defer_depth: usize,
    stale: bool,
}

impl<T: ViewItem> FlatState<T> {
    fn begin_update(&self) -> ViewUpdate<T> {
        ViewUpdate::new(self.ordered.len(), self.currency.position())
    }

    fn finish_update(&mut self, update: &mut ViewUpdate<T>, changes: Vec<CollectionChange<T>>) {
        for change in &changes {
            self.currency.apply(change, self.ordered.items());
        }
        update.changes.extend(changes);
        update.count_after = self.ordered.len();
        update.current_after = self.currency.position();
    }

    fn is_deferred(&self) -> bool {
        self.defer_depth > 0
    }
}

struct FlatInner<T> {
    source: SharedSource<T>,
    state: Mutex<FlatState<T>>,
    signals: ViewSignals<T>,
    subscription: Mutex<Option<ConnectionGuard<CollectionChange<T>>>>,
}

impl<T: ViewItem> FlatInner<T> {
    /// Run `f` against the state and publish whatever it produced once the
    /// lock is released. Deferred views only get marked stale.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut FlatState<T>, &[T]) -> Vec<CollectionChange<T>>,
    {
        let update = {
            let mut state = self.state.lock();
            if state.is_deferred() {
                state.stale = true;
                return;
            }
            let mut update = state.begin_update();
            let changes = {
                let items = self.source.read();
                f(&mut *state, &items[..])
            };
            state.finish_update(&mut update, changes);
            update
        };
        self.signals.publish(update);
    }

    fn on_source_changed(&self, change: &CollectionChange<T>) {
        tracing::trace!(target: targets::VIEW, kind = ?change.kind(), "source change");
        self.update(|state, source| state.ordered.apply_source_change(source, change));
    }

    fn rebuild(&self) {
        self.update(|state, source| {
            state.ordered.rebuild(source);
            vec![CollectionChange::Reset]
        });
    }

    fn mutable(&self) -> Result<&dyn MutableIndexedCollection<T>> {
        self.source.as_mutable().ok_or_else(|| {
            tracing::warn!(target: targets::VIEW, "mutation requested on a read-only source");
            ViewError::SourceNotMutable
        })
    }

    fn source_index_of(&self, item: &T) -> Option<usize> {
        self.source.read().iter().position(|candidate| candidate == item)
    }
}

impl<T: ViewItem> DeferTarget for FlatInner<T> {
    fn begin_defer(&self) {
        self.state.lock().defer_depth += 1;
    }

    fn end_defer(&self) {
        let update = {
            let mut state = self.state.lock();
            state.defer_depth = state.defer_depth.saturating_sub(1);
            if state.is_deferred() || !state.stale {
                return;
            }
            state.stale = false;
            let mut update = state.begin_update();
            {
                let items = self.source.read();
                state.ordered.rebuild(&items);
            }
            tracing::debug!(target: targets::VIEW, count = state.ordered.len(), "deferred refresh settled");
            state.finish_update(&mut update, vec![CollectionChange::Reset]);
            update
        };
        self.signals.publish(update);
    }
}

/// A live, filtered and sorted view over a flat source.
///
/// The view's items always equal "filter the current source, then stable
/// sort by the current sort descriptions", with ties kept in source order.
/// Handles are cheap to clone and share one view.
///
/// # Signals
///
/// - `collection_changed`: one notification per completed update
/// - `count_changed`: the new count whenever it changes
/// - `current_changed`: `(new, old)` current positions
///
/// # Example
///
/// ```
/// use horizon_collections::view::{FlatView, ObservableVec, SelfResolver, SortDescription, SortDirection, ViewShaping};
///
/// let source = ObservableVec::shared(vec![5, 3, 8, 1]);
/// let view = FlatView::new(
///     source.clone(),
///     ViewShaping::new()
///         .sort(SortDescription::by_item(SortDirection::Ascending))
///         .resolver(SelfResolver),
/// )
/// .unwrap();
///
/// source.push(4);
/// assert_eq!(view.items(), vec![1, 3, 4, 5, 8]);
/// ```
pub struct FlatView<T: ViewItem> {
    inner: Arc<FlatInner<T>>,
}

impl<T: ViewItem> FlatView<T> {
    /// Build a view over `source` shaped by `shaping`.
    ///
    /// Fails with [`ViewError::MissingResolver`] if sort descriptions are set
    /// without a resolver.
    pub fn new(source: SharedSource<T>, shaping: ViewShaping<T>) -> Result<Self> {
        let comparer = shaping.comparer()?;
        let mut ordered = OrderedItems::new(
            shaping.filter.clone(),
            comparer,
            shaping.live_shaping,
            shaping.live_filter_properties.clone(),
        );
        ordered.rebuild(&source.read());
        let currency = Currency::new(ordered.items());

        let inner = Arc::new(FlatInner {
            source,
            state: Mutex::new(FlatState {
                ordered,
                shaping,
                currency,
                defer_depth: 0,
                stale: false,
            }),
            signals: ViewSignals::new(),
            subscription: Mutex::new(None),
        });

        if let Some(changes) = inner.source.changes() {
            let weak: Weak<FlatInner<T>> = Arc::downgrade(&inner);
            let guard = changes.connect_scoped(move |change| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_source_changed(change);
                }
            });
            *inner.subscription.lock() = Some(guard);
        }

        tracing::debug!(target: targets::VIEW, count = inner.state.lock().ordered.len(), "created flat view");
        Ok(Self { inner })
    }

    /// The source this view reads from.
    pub fn source(&self) -> SharedSource<T> {
        self.inner.source.clone()
    }

    /// The view's signals.
    pub fn signals(&self) -> &ViewSignals<T> {
        &self.inner.signals
    }

    /// Number of items in the view.
    pub fn count(&self) -> usize {
        self.inner.state.lock().ordered.len()
    }

    /// Returns `true` if the view shows no items.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.state.lock().ordered.items().get(index).cloned()
    }

    /// All items, in view order.
    pub fn items(&self) -> Vec<T> {
        self.inner.state.lock().ordered.items().to_vec()
    }

    /// Borrow the items for the duration of `f`.
    ///
    /// `f` must not call back into this view.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(self.inner.state.lock().ordered.items())
    }

    /// Position of `item` in the view.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.state.lock().ordered.index_of(item)
    }

    /// Returns `true` if `item` is in the view.
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    // -------------------------------------------------------------------------
    // Shaping
    // -------------------------------------------------------------------------

    /// The current shaping options.
    pub fn shaping(&self) -> ViewShaping<T> {
        self.inner.state.lock().shaping.clone()
    }

    /// Returns `true` if the view reacts to item property changes.
    pub fn is_live_shaping(&self) -> bool {
        self.inner.state.lock().ordered.is_live_shaping()
    }

    /// Filter with `filter`.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.set_filter_fn(Some(Arc::new(filter)));
    }

    /// Show every source item.
    pub fn clear_filter(&self) {
        self.set_filter_fn(None);
    }

    /// Replace the filter.
    ///
    /// Setting the same predicate again does nothing. Otherwise items that
    /// now fail are dropped, items that now pass are inserted, and one
    /// `Reset` is emitted if anything changed.
    pub fn set_filter_fn(&self, filter: Option<FilterFn<T>>) {
        let shaping = self.shaping().filter_fn(filter);
        self.reshape(shaping, None);
    }

    /// Replace the sort descriptions.
    ///
    /// Always re-derives the order from the source and emits one `Reset`,
    /// unless the descriptions are unchanged.
    pub fn set_sort_descriptions(&self, descriptions: Vec<SortDescription>) -> Result<()> {
        self.set_shaping(self.shaping().sort_descriptions(descriptions))
    }

    /// Set the properties whose changes re-evaluate the filter.
    pub fn set_live_filter_properties(&self, properties: Vec<String>) {
        let mut state = self.inner.state.lock();
        state.shaping.live_filter_properties = properties.clone();
        state.ordered.set_live_filter_properties(properties);
    }

    /// Apply the filter, sort and live-filter options of `shaping` at once.
    ///
    /// The live-shaping flag is fixed for the lifetime of the view and is
    /// ignored here. At most one `Reset` is emitted.
    pub fn set_shaping(&self, shaping: ViewShaping<T>) -> Result<()> {
        let comparer = shaping.comparer()?;
        self.reshape(shaping, Some(comparer));
        Ok(())
    }

    /// `comparer` is `None` only when `shaping` carries the current sort
    /// options, so the installed comparer stays valid.
    fn reshape(&self, shaping: ViewShaping<T>, comparer: Option<ItemComparer<T>>) {
        let update = {
            let mut state = self.inner.state.lock();
            let filter_changed = !state.shaping.same_filter(&shaping);
            let sort_changed = !state.shaping.same_sort(&shaping);
            debug_assert!(comparer.is_some() || !sort_changed, "sort changed without a comparer");

            state.shaping.filter = shaping.filter.clone();
            state.shaping.sort_descriptions = shaping.sort_descriptions;
            state.shaping.resolver = shaping.resolver;
            state.shaping.live_filter_properties = shaping.live_filter_properties.clone();
            state.ordered.set_live_filter_properties(shaping.live_filter_properties);
            if filter_changed {
                state.ordered.set_filter(shaping.filter);
            }
            if let Some(comparer) = comparer.filter(|_| sort_changed) {
                state.ordered.set_comparer(comparer);
            }
            if !filter_changed && !sort_changed {
                return;
            }
            if state.is_deferred() {
                state.stale = true;
                return;
            }

            tracing::debug!(target: targets::VIEW, filter_changed, sort_changed, "reshaping view");
            let mut update = state.begin_update();
            let changed = {
                let items = self.inner.source.read();
                if sort_changed {
                    state.ordered.resort(&items);
                    true
                } else {
                    state.ordered.apply_filter(&items)
                }
            };
            let changes = if changed { vec![CollectionChange::Reset] } else { Vec::new() };
            state.finish_update(&mut update, changes);
            update
        };
        self.inner.signals.publish(update);
    }

    /// Rebuild the whole view from the source and emit one `Reset`.
    ///
    /// Needed after changing a source that has no change signal.
    pub fn refresh(&self) {
        self.inner.rebuild();
    }

    /// Re-run the filter over the source.
    pub fn refresh_filter(&self) {
        self.inner.update(|state, source| {
            if state.ordered.apply_filter(source) {
                vec![CollectionChange::Reset]
            } else {
                Vec::new()
            }
        });
    }

    /// Re-sort the view from the source.
    pub fn refresh_sorting(&self) {
        self.inner.update(|state, source| {
            state.ordered.resort(source);
            vec![CollectionChange::Reset]
        });
    }

    /// Tell the view that `property` of `item` changed.
    ///
    /// Only has an effect with live shaping. `None` means "any property" and
    /// rebuilds the view. A filter property adds or removes the item; a sort
    /// property moves it to its new slot with one `Moved`.
    pub fn notify_item_property_changed(&self, item: &T, property: Option<&str>) {
        if !self.is_live_shaping() {
            return;
        }
        self.inner
            .update(|state, source| state.ordered.refresh_item(source, item, property));
    }

    /// Postpone updates until the returned guard is dropped.
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

    /// The current position, if any.
    pub fn current_position(&self) -> Option<usize> {
        self.inner.state.lock().currency.position()
    }

    /// The item at the current position, if any.
    pub fn current_item(&self) -> Option<T> {
        self.inner.state.lock().currency.item().cloned()
    }

    /// Make `item` current. Returns `false` (and clears currency) if it is
    /// not in the view.
    pub fn move_current_to(&self, item: &T) -> bool {
        self.move_current(|state| state.ordered.index_of(item))
    }

    /// Make the item at `position` current.
    pub fn move_current_to_position(&self, position: usize) -> Result<()> {
        let count = self.count();
        if position >= count {
            return Err(ViewError::out_of_range(position, count));
        }
        self.move_current(|_| Some(position));
        Ok(())
    }

    /// Make the first item current.
    pub fn move_current_to_first(&self) -> bool {
        self.move_current(|state| (state.ordered.len() > 0).then_some(0))
    }

    /// Make the last item current.
    pub fn move_current_to_last(&self) -> bool {
        self.move_current(|state| state.ordered.len().checked_sub(1))
    }

    /// Advance currency by one. Stays on the last item at the end.
    pub fn move_current_to_next(&self) -> bool {
        self.step_current(|position, len| (position + 1 < len).then_some(position + 1))
    }

    /// Step currency back by one. Stays on the first item at the start.
    pub fn move_current_to_previous(&self) -> bool {
        self.step_current(|position, _| position.checked_sub(1))
    }

    fn step_current(&self, step: impl FnOnce(usize, usize) -> Option<usize>) -> bool {
        let mut moved = false;
        self.move_current(|state| {
            let current = state.currency.position();
            let next = current.and_then(|position| step(position, state.ordered.len()));
            moved = next.is_some();
            next.or(current)
        });
        moved
    }

    fn move_current(&self, target: impl FnOnce(&FlatState<T>) -> Option<usize>) -> bool {
        let update = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let mut update = state.begin_update();
            let position = target(state);
            state.currency.set(position, state.ordered.items());
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

    /// Append `item` to the source.
    pub fn add(&self, item: T) -> Result<()> {
        self.inner.mutable()?.push(item);
        Ok(())
    }

    /// Insert `item` into the source in front of the item at view position
    /// `index`, or append it when `index == count()`.
    ///
    /// Where the item then appears in the view is up to filter and sort.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let mutable = self.inner.mutable()?;
        let anchor = {
            let state = self.inner.state.lock();
            let len = state.ordered.len();
            if index > len {
                return Err(ViewError::out_of_range(index, len));
            }
            state.ordered.items().get(index).cloned()
        };
        let source_index = match anchor {
            Some(anchor) => self
                .inner
                .source_index_of(&anchor)
                .unwrap_or_else(|| self.inner.source.len()),
            None => self.inner.source.len(),
        };
        mutable.insert(source_index, item)
    }

    /// Remove `item` from the source. Returns `false` if it is not there.
    pub fn remove(&self, item: &T) -> Result<bool> {
        let mutable = self.inner.mutable()?;
        match self.inner.source_index_of(item) {
            Some(source_index) => mutable.remove_at(source_index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove the item at view position `index` from the source.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let mutable = self.inner.mutable()?;
        let item = {
            let state = self.inner.state.lock();
            let len = state.ordered.len();
            state
                .ordered
                .items()
                .get(index)
                .cloned()
                .ok_or(ViewError::out_of_range(index, len))?
        };
        let source_index = self
            .inner
            .source_index_of(&item)
            .ok_or(ViewError::out_of_range(index, self.inner.source.len()))?;
        mutable.remove_at(source_index)
    }

    /// Remove every item from the source.
    pub fn clear(&self) -> Result<()> {
        self.inner.mutable()?.clear();
        Ok(())
    }
}

impl<T: ViewItem> Clone for FlatView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ViewItem + fmt::Debug> fmt::Debug for FlatView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("FlatView")
            .field("items", &state.ordered.items())
            .field("shaping", &state.shaping)
            .field("current", &state.currency.position())
            .finish()
    }
}

impl<T: ViewItem> ItemsView<T> for FlatView<T> {
    fn count(&self) -> usize {
        FlatView::count(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        FlatView::get(self, index)
    }

    fn items(&self) -> Vec<T> {
        FlatView::items(self)
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        FlatView::index_of(self, item)
    }

    fn signals(&self) -> &ViewSignals<T> {
        FlatView::signals(self)
    }

    fn current_position(&self) -> Option<usize> {
        FlatView::current_position(self)
    }

    fn current_item(&self) -> Option<T> {
        FlatView::current_item(self)
    }
}

static_assertions::assert_impl_all!(FlatView<i32>: Send, Sync, Clone);
