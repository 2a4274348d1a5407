//! The configuration surface list controls bind to.
//!
//! `CollectionViewSource` owns a [`ViewConfig`] and the view built from it.
//! Changing the source, the grouping flag, the items binding or the
//! live-shaping flag replaces the view. Changing only the filter, the sort
//! descriptions or the live filter properties is pushed into the existing
//! view so that its current position survives.

use std::fmt;
use std::sync::Arc;

use horizon_collections_core::logging::targets;
use horizon_collections_core::{Property, Signal};
use parking_lot::{Mutex, RwLock};

use super::change::ViewSignals;
use super::defer::DeferRefresh;
use super::flat_view::FlatView;
use super::group_view::ItemsBinding;
use super::grouped_view::GroupedView;
use super::shaping::{FilterFn, ViewShaping};
use super::sort::{PropertyResolver, SortDescription};
use super::source::SharedSource;
use super::traits::{GroupObject, ItemsView, ViewItem};
use crate::error::{Result, ViewError};

/// The collection a view source reads from.
pub enum ViewSource<T, G> {
    /// A flat collection of items.
    Items(SharedSource<T>),
    /// A collection of group objects.
    Groups(SharedSource<G>),
}

impl<T, G> ViewSource<T, G> {
    /// Returns `true` for [`ViewSource::Groups`].
    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Groups(_))
    }

    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Items(a), Self::Items(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Self::Groups(a), Self::Groups(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl<T, G> Clone for ViewSource<T, G> {
    fn clone(&self) -> Self {
        match self {
            Self::Items(items) => Self::Items(items.clone()),
            Self::Groups(groups) => Self::Groups(groups.clone()),
        }
    }
}

impl<T, G> fmt::Debug for ViewSource<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items(_) => f.write_str("ViewSource::Items(..)"),
            Self::Groups(_) => f.write_str("ViewSource::Groups(..)"),
        }
    }
}

/// Which kind of view a view source built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// A [`FlatView`] over [`ViewSource::Items`].
    Flat,
    /// A [`GroupedView`] over [`ViewSource::Groups`].
    Grouped,
}

/// Configuration of a [`CollectionViewSource`].
///
/// # Example
///
/// ```
/// use horizon_collections::view::{ObservableVec, SelfResolver, SortDescription, SortDirection, ViewConfig};
///
/// let numbers = ObservableVec::shared(vec![3, 1, 2]);
/// let config = ViewConfig::<i32>::new()
///     .items(numbers)
///     .filter(|n| *n > 1)
///     .sort(SortDescription::by_item(SortDirection::Ascending))
///     .resolver(SelfResolver);
/// assert!(!config.is_source_grouped());
/// ```
pub struct ViewConfig<T, G = ()> {
    source: Option<ViewSource<T, G>>,
    is_source_grouped: bool,
    items_binding: Option<ItemsBinding<G, T>>,
    shaping: ViewShaping<T>,
}

impl<T: ViewItem, G: GroupObject> ViewConfig<T, G> {
    /// An empty configuration: no source, not grouped, no shaping.
    pub fn new() -> Self {
        Self {
            source: None,
            is_source_grouped: false,
            items_binding: None,
            shaping: ViewShaping::new(),
        }
    }

    /// Read from `source`.
    pub fn source(mut self, source: Option<ViewSource<T, G>>) -> Self {
        self.source = source;
        self
    }

    /// Read items from `items`.
    pub fn items(mut self, items: SharedSource<T>) -> Self {
        self.source = Some(ViewSource::Items(items));
        self
    }

    /// Read groups from `groups` and mark the source as grouped.
    pub fn groups(mut self, groups: SharedSource<G>) -> Self {
        self.source = Some(ViewSource::Groups(groups));
        self.is_source_grouped = true;
        self
    }

    /// Whether the source's elements are groups.
    pub fn source_grouped(mut self, grouped: bool) -> Self {
        self.is_source_grouped = grouped;
        self
    }

    /// How group members are found.
    pub fn items_binding(mut self, binding: ItemsBinding<G, T>) -> Self {
        self.items_binding = Some(binding);
        self
    }

    /// Keep only items for which `filter` returns `true`.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.shaping = self.shaping.filter(filter);
        self
    }

    /// Append a sort key.
    pub fn sort(mut self, description: SortDescription) -> Self {
        self.shaping = self.shaping.sort(description);
        self
    }

    /// Resolve sort keys through `resolver`.
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: PropertyResolver<T> + 'static,
    {
        self.shaping = self.shaping.resolver(resolver);
        self
    }

    /// React to item property changes.
    pub fn live_shaping(mut self, enabled: bool) -> Self {
        self.shaping = self.shaping.live_shaping(enabled);
        self
    }

    /// Only changes of these properties re-evaluate the filter.
    pub fn live_filter_property(mut self, property: impl Into<String>) -> Self {
        self.shaping = self.shaping.live_filter_property(property);
        self
    }

    /// Replace all shaping options.
    pub fn shaping(mut self, shaping: ViewShaping<T>) -> Self {
        self.shaping = shaping;
        self
    }

    /// The configured source.
    pub fn get_source(&self) -> Option<&ViewSource<T, G>> {
        self.source.as_ref()
    }

    /// Whether the source's elements are groups.
    pub fn is_source_grouped(&self) -> bool {
        self.is_source_grouped
    }

    /// The configured items binding.
    pub fn get_items_binding(&self) -> Option<&ItemsBinding<G, T>> {
        self.items_binding.as_ref()
    }

    /// The configured shaping options.
    pub fn get_shaping(&self) -> &ViewShaping<T> {
        &self.shaping
    }

    // Runtime setters used through `CollectionViewSource::configure`.

    /// Replace the source.
    pub fn set_source(&mut self, source: Option<ViewSource<T, G>>) {
        self.source = source;
    }

    /// Set the grouping flag.
    pub fn set_source_grouped(&mut self, grouped: bool) {
        self.is_source_grouped = grouped;
    }

    /// Replace the items binding.
    pub fn set_items_binding(&mut self, binding: Option<ItemsBinding<G, T>>) {
        self.items_binding = binding;
    }

    /// Replace the filter.
    pub fn set_filter(&mut self, filter: Option<FilterFn<T>>) {
        self.shaping.filter = filter;
    }

    /// Replace the sort descriptions.
    pub fn set_sort_descriptions(&mut self, descriptions: Vec<SortDescription>) {
        self.shaping.sort_descriptions = descriptions;
    }

    /// Replace the property resolver.
    pub fn set_resolver(&mut self, resolver: Option<Arc<dyn PropertyResolver<T>>>) {
        self.shaping.resolver = resolver;
    }

    /// Turn live shaping on or off.
    pub fn set_live_shaping(&mut self, enabled: bool) {
        self.shaping.live_shaping = enabled;
    }

    /// Replace the live filter properties.
    pub fn set_live_filter_properties(&mut self, properties: Vec<String>) {
        self.shaping.live_filter_properties = properties;
    }

    /// Returns `true` if switching from `self` to `other` needs a new view.
    fn needs_new_view(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        };
        let same_binding = match (&self.items_binding, &other.items_binding) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        };
        !same_source
            || !same_binding
            || self.is_source_grouped != other.is_source_grouped
            || self.shaping.live_shaping != other.shaping.live_shaping
    }

    fn build_view(&self) -> Result<Option<CollectionView<T, G>>> {
        let view = match (&self.source, self.is_source_grouped) {
            (None, _) => return Ok(None),
            (Some(ViewSource::Items(items)), false) => {
                CollectionView::Flat(FlatView::new(items.clone(), self.shaping.clone())?)
            }
            (Some(ViewSource::Groups(groups)), true) => {
                let binding = self.items_binding.clone().ok_or(ViewError::MissingItemsBinding)?;
                CollectionView::Grouped(GroupedView::new(groups.clone(), binding, self.shaping.clone())?)
            }
            (Some(_), grouped) => return Err(ViewError::SourceShapeMismatch { grouped }),
        };
        Ok(Some(view))
    }
}

impl<T: ViewItem, G: GroupObject> Default for ViewConfig<T, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G> Clone for ViewConfig<T, G> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            is_source_grouped: self.is_source_grouped,
            items_binding: self.items_binding.clone(),
            shaping: self.shaping.clone(),
        }
    }
}

impl<T, G> fmt::Debug for ViewConfig<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewConfig")
            .field("source", &self.source)
            .field("is_source_grouped", &self.is_source_grouped)
            .field("items_binding", &self.items_binding)
            .field("shaping", &self.shaping)
            .finish()
    }
}

/// The view a [`CollectionViewSource`] currently exposes.
///
/// Handles are cheap to clone and share the underlying view.
pub enum CollectionView<T: ViewItem, G> {
    /// A flat view.
    Flat(FlatView<T>),
    /// A grouped view.
    Grouped(GroupedView<G, T>),
}

impl<T: ViewItem, G: GroupObject> CollectionView<T, G> {
    /// Which kind of view this is.
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Flat(_) => ViewKind::Flat,
            Self::Grouped(_) => ViewKind::Grouped,
        }
    }

    /// The flat view, if this is one.
    pub fn as_flat(&self) -> Option<&FlatView<T>> {
        match self {
            Self::Flat(view) => Some(view),
            Self::Grouped(_) => None,
        }
    }

    /// The grouped view, if this is one.
    pub fn as_grouped(&self) -> Option<&GroupedView<G, T>> {
        match self {
            Self::Flat(_) => None,
            Self::Grouped(view) => Some(view),
        }
    }

    fn as_items_view(&self) -> &dyn ItemsView<T> {
        match self {
            Self::Flat(view) => view,
            Self::Grouped(view) => view,
        }
    }

    /// Apply new filter, sort and live-filter options.
    pub fn set_shaping(&self, shaping: ViewShaping<T>) -> Result<()> {
        match self {
            Self::Flat(view) => view.set_shaping(shaping),
            Self::Grouped(view) => view.set_shaping(shaping),
        }
    }

    /// Rebuild the view from its source.
    pub fn refresh(&self) -> Result<()> {
        match self {
            Self::Flat(view) => {
                view.refresh();
                Ok(())
            }
            Self::Grouped(view) => view.refresh(),
        }
    }

    /// Re-run the filter.
    pub fn refresh_filter(&self) {
        match self {
            Self::Flat(view) => view.refresh_filter(),
            Self::Grouped(view) => view.refresh_filter(),
        }
    }

    /// Re-sort.
    pub fn refresh_sorting(&self) {
        match self {
            Self::Flat(view) => view.refresh_sorting(),
            Self::Grouped(view) => view.refresh_sorting(),
        }
    }

    /// Tell the view that `property` of `item` changed.
    pub fn notify_item_property_changed(&self, item: &T, property: Option<&str>) {
        match self {
            Self::Flat(view) => view.notify_item_property_changed(item, property),
            Self::Grouped(view) => view.notify_item_property_changed(item, property),
        }
    }

    /// Postpone updates until the returned guard is dropped.
    pub fn defer_refresh(&self) -> DeferRefresh {
        match self {
            Self::Flat(view) => view.defer_refresh(),
            Self::Grouped(view) => view.defer_refresh(),
        }
    }

    /// Make `item` current.
    pub fn move_current_to(&self, item: &T) -> bool {
        match self {
            Self::Flat(view) => view.move_current_to(item),
            Self::Grouped(view) => view.move_current_to(item),
        }
    }

    /// Make the item at `position` current.
    pub fn move_current_to_position(&self, position: usize) -> Result<()> {
        match self {
            Self::Flat(view) => view.move_current_to_position(position),
            Self::Grouped(view) => view.move_current_to_position(position),
        }
    }

    /// Append `item` to a flat source.
    pub fn add(&self, item: T) -> Result<()> {
        match self {
            Self::Flat(view) => view.add(item),
            Self::Grouped(view) => view.add(item),
        }
    }

    /// Insert `item` in front of the item at view position `index`.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        match self {
            Self::Flat(view) => view.insert(index, item),
            Self::Grouped(view) => view.insert(index, item),
        }
    }

    /// Remove `item` from a flat source.
    pub fn remove(&self, item: &T) -> Result<bool> {
        match self {
            Self::Flat(view) => view.remove(item),
            Self::Grouped(view) => view.remove(item),
        }
    }

    /// Remove the item at view position `index` from a flat source.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        match self {
            Self::Flat(view) => view.remove_at(index),
            Self::Grouped(view) => view.remove_at(index),
        }
    }

    /// Remove every item from a flat source.
    pub fn clear(&self) -> Result<()> {
        match self {
            Self::Flat(view) => view.clear(),
            Self::Grouped(view) => view.clear(),
        }
    }
}

impl<T: ViewItem, G: GroupObject> ItemsView<T> for CollectionView<T, G> {
    fn count(&self) -> usize {
        self.as_items_view().count()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.as_items_view().get(index)
    }

    fn items(&self) -> Vec<T> {
        self.as_items_view().items()
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.as_items_view().index_of(item)
    }

    fn signals(&self) -> &ViewSignals<T> {
        self.as_items_view().signals()
    }

    fn current_position(&self) -> Option<usize> {
        self.as_items_view().current_position()
    }

    fn current_item(&self) -> Option<T> {
        self.as_items_view().current_item()
    }
}

impl<T: ViewItem, G> Clone for CollectionView<T, G> {
    fn clone(&self) -> Self {
        match self {
            Self::Flat(view) => Self::Flat(view.clone()),
            Self::Grouped(view) => Self::Grouped(view.clone()),
        }
    }
}

impl<T: ViewItem + fmt::Debug, G: GroupObject> fmt::Debug for CollectionView<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(view) => f.debug_tuple("Flat").field(view).finish(),
            Self::Grouped(view) => f.debug_tuple("Grouped").field(view).finish(),
        }
    }
}

/// Builds and maintains the view a list control shows.
///
/// # Signals
///
/// - `view_changed`: the view was replaced
/// - `view_kind_changed`: the kind of view changed, with the new kind
///
/// # Example
///
/// ```
/// use horizon_collections::view::{CollectionViewSource, ItemsView, ObservableVec, ViewConfig};
///
/// let numbers = ObservableVec::shared(vec![1, 2, 3, 4]);
/// let source = CollectionViewSource::with_config(ViewConfig::<i32>::new().items(numbers.clone())).unwrap();
///
/// source.configure(|config| config.set_filter(Some(std::sync::Arc::new(|n: &i32| n % 2 == 0)))).unwrap();
/// assert_eq!(source.view().unwrap().items(), vec![2, 4]);
/// ```
pub struct CollectionViewSource<T: ViewItem, G = ()> {
    config: Mutex<ViewConfig<T, G>>,
    view: RwLock<Option<CollectionView<T, G>>>,
    view_kind: Property<Option<ViewKind>>,

    /// Emitted after the view was replaced.
    pub view_changed: Signal<()>,

    /// Emitted after the kind of view changed.
    pub view_kind_changed: Signal<Option<ViewKind>>,
}

impl<T: ViewItem, G: GroupObject> CollectionViewSource<T, G> {
    /// A view source with no source and therefore no view.
    pub fn new() -> Self {
        Self {
            config: Mutex::new(ViewConfig::new()),
            view: RwLock::new(None),
            view_kind: Property::new(None),
            view_changed: Signal::new(),
            view_kind_changed: Signal::new(),
        }
    }

    /// A view source built from `config`.
    pub fn with_config(config: ViewConfig<T, G>) -> Result<Self> {
        let view = config.build_view()?;
        let kind = view.as_ref().map(CollectionView::kind);
        Ok(Self {
            config: Mutex::new(config),
            view: RwLock::new(view),
            view_kind: Property::new(kind),
            view_changed: Signal::new(),
            view_kind_changed: Signal::new(),
        })
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> ViewConfig<T, G> {
        self.config.lock().clone()
    }

    /// The current view, if a source is configured.
    pub fn view(&self) -> Option<CollectionView<T, G>> {
        self.view.read().clone()
    }

    /// The kind of the current view.
    pub fn view_kind(&self) -> Option<ViewKind> {
        self.view_kind.get()
    }

    /// Apply several configuration changes as one.
    ///
    /// If the changes touch the source, the grouping flag, the items binding
    /// or the live-shaping flag, a new view is built and replaces the old
    /// one. Otherwise the new filter and sort are pushed into the existing
    /// view, whose observers see at most one `Reset`.
    ///
    /// On error the previous configuration and view stay in place.
    pub fn configure<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ViewConfig<T, G>),
    {
        let current = self.view();
        let _defer = current.as_ref().map(CollectionView::defer_refresh);

        let replaced = {
            let mut config = self.config.lock();
            let mut next = config.clone();
            f(&mut next);

            if config.needs_new_view(&next) {
                let view = next.build_view().inspect_err(|err| {
                    tracing::warn!(target: targets::VIEW_SOURCE, %err, "rejected view configuration");
                })?;
                tracing::debug!(target: targets::VIEW_SOURCE, kind = ?view.as_ref().map(CollectionView::kind), "replacing view");
                *self.view.write() = view;
                *config = next;
                true
            } else {
                if let Some(view) = &current {
                    view.set_shaping(next.shaping.clone()).inspect_err(|err| {
                        tracing::warn!(target: targets::VIEW_SOURCE, %err, "rejected shaping");
                    })?;
                }
                *config = next;
                false
            }
        };

        if replaced {
            let kind = self.view.read().as_ref().map(CollectionView::kind);
            self.view_changed.emit(());
            if self.view_kind.set(kind) {
                self.view_kind_changed.emit(kind);
            }
        }
        Ok(())
    }

    /// Replace the source.
    pub fn set_source(&self, source: Option<ViewSource<T, G>>) -> Result<()> {
        self.configure(|config| config.set_source(source))
    }

    /// Set the grouping flag.
    pub fn set_source_grouped(&self, grouped: bool) -> Result<()> {
        self.configure(|config| config.set_source_grouped(grouped))
    }

    /// Replace the items binding.
    pub fn set_items_binding(&self, binding: Option<ItemsBinding<G, T>>) -> Result<()> {
        self.configure(|config| config.set_items_binding(binding))
    }

    /// Filter with `filter`.
    pub fn set_filter<F>(&self, filter: F) -> Result<()>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let filter: FilterFn<T> = Arc::new(filter);
        self.configure(|config| config.set_filter(Some(filter)))
    }

    /// Show every item.
    pub fn clear_filter(&self) -> Result<()> {
        self.configure(|config| config.set_filter(None))
    }

    /// Replace the sort descriptions.
    pub fn set_sort_descriptions(&self, descriptions: Vec<SortDescription>) -> Result<()> {
        self.configure(|config| config.set_sort_descriptions(descriptions))
    }

    /// Turn live shaping on or off. Replaces the view.
    pub fn set_live_shaping(&self, enabled: bool) -> Result<()> {
        self.configure(|config| config.set_live_shaping(enabled))
    }

    /// Replace the live filter properties.
    pub fn set_live_filter_properties(&self, properties: Vec<String>) -> Result<()> {
        self.configure(|config| config.set_live_filter_properties(properties))
    }

    fn require_view(&self) -> Result<CollectionView<T, G>> {
        self.view().ok_or(ViewError::NoSource)
    }

    /// Rebuild the view from its source.
    pub fn refresh(&self) -> Result<()> {
        self.require_view()?.refresh()
    }

    /// Postpone the view's updates until the returned guard is dropped.
    pub fn defer_refresh(&self) -> Result<DeferRefresh> {
        Ok(self.require_view()?.defer_refresh())
    }

    /// Tell the view that `property` of `item` changed.
    pub fn notify_item_property_changed(&self, item: &T, property: Option<&str>) {
        if let Some(view) = self.view() {
            view.notify_item_property_changed(item, property);
        }
    }

    /// Append `item` to the source.
    pub fn add(&self, item: T) -> Result<()> {
        self.require_view()?.add(item)
    }

    /// Insert `item` in front of the item at view position `index`.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.require_view()?.insert(index, item)
    }

    /// Remove `item` from the source.
    pub fn remove(&self, item: &T) -> Result<bool> {
        self.require_view()?.remove(item)
    }

    /// Remove the item at view position `index` from the source.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.require_view()?.remove_at(index)
    }

    /// Remove every item from the source.
    pub fn clear(&self) -> Result<()> {
        self.require_view()?.clear()
    }
}

impl<T: ViewItem, G: GroupObject> Default for CollectionViewSource<T, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ViewItem, G> fmt::Debug for CollectionViewSource<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionViewSource")
            .field("config", &*self.config.lock())
            .field("view_kind", &self.view_kind.get())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CollectionViewSource<i32>: Send, Sync);
