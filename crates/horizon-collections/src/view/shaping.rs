//! Filter, sort and live-shaping options shared by every view.

use std::fmt;
use std::sync::Arc;

use super::sort::{ItemComparer, PropertyResolver, SortDescription};
use crate::error::{Result, ViewError};

/// Filter predicate. Returns `true` to keep an item in the view.
///
/// Must be a pure function of the item's current state. Identity (for
/// "did the filter change?") is `Arc` pointer identity.
pub type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// How a view filters, sorts and reacts to item property changes.
///
/// # Example
///
/// ```
/// use horizon_collections::view::{SelfResolver, SortDescription, SortDirection, ViewShaping};
///
/// let shaping = ViewShaping::<i32>::new()
///     .filter(|n| n % 2 == 0)
///     .sort(SortDescription::by_item(SortDirection::Descending))
///     .resolver(SelfResolver);
/// assert!(shaping.has_filter());
/// ```
pub struct ViewShaping<T> {
    pub(crate) filter: Option<FilterFn<T>>,
    pub(crate) sort_descriptions: Vec<SortDescription>,
    pub(crate) resolver: Option<Arc<dyn PropertyResolver<T>>>,
    pub(crate) live_shaping: bool,
    pub(crate) live_filter_properties: Vec<String>,
}

impl<T> ViewShaping<T> {
    /// No filter, no sort, no live shaping.
    pub fn new() -> Self {
        Self {
            filter: None,
            sort_descriptions: Vec::new(),
            resolver: None,
            live_shaping: false,
            live_filter_properties: Vec::new(),
        }
    }

    /// Keep only items for which `filter` returns `true`.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Set (or clear) the filter from an existing shared predicate.
    pub fn filter_fn(mut self, filter: Option<FilterFn<T>>) -> Self {
        self.filter = filter;
        self
    }

    /// Append a sort key.
    pub fn sort(mut self, description: SortDescription) -> Self {
        self.sort_descriptions.push(description);
        self
    }

    /// Replace all sort keys.
    pub fn sort_descriptions(mut self, descriptions: Vec<SortDescription>) -> Self {
        self.sort_descriptions = descriptions;
        self
    }

    /// Resolve sort keys through `resolver`.
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: PropertyResolver<T> + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Resolve sort keys through an existing shared resolver.
    pub fn shared_resolver(mut self, resolver: Option<Arc<dyn PropertyResolver<T>>>) -> Self {
        self.resolver = resolver;
        self
    }

    /// React to item property changes.
    pub fn live_shaping(mut self, enabled: bool) -> Self {
        self.live_shaping = enabled;
        self
    }

    /// Only changes of these properties re-evaluate the filter.
    ///
    /// With no properties listed, every property change re-evaluates it.
    pub fn live_filter_property(mut self, property: impl Into<String>) -> Self {
        self.live_filter_properties.push(property.into());
        self
    }

    /// Returns `true` if a filter is set.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Returns `true` if the view only mirrors its source.
    pub fn is_plain(&self) -> bool {
        self.filter.is_none() && self.sort_descriptions.is_empty() && !self.live_shaping
    }

    /// Build the comparer for the current sort descriptions.
    pub fn comparer(&self) -> Result<ItemComparer<T>> {
        if self.sort_descriptions.is_empty() {
            return Ok(ItemComparer::empty());
        }
        let resolver = self.resolver.clone().ok_or(ViewError::MissingResolver)?;
        Ok(ItemComparer::new(self.sort_descriptions.clone(), resolver))
    }

    pub(crate) fn same_filter(&self, other: &Self) -> bool {
        same_filter(&self.filter, &other.filter)
    }

    pub(crate) fn same_sort(&self, other: &Self) -> bool {
        self.sort_descriptions == other.sort_descriptions
            && match (&self.resolver, &other.resolver) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

pub(crate) fn same_filter<T>(a: &Option<FilterFn<T>>, b: &Option<FilterFn<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl<T> Default for ViewShaping<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ViewShaping<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort_descriptions: self.sort_descriptions.clone(),
            resolver: self.resolver.clone(),
            live_shaping: self.live_shaping,
            live_filter_properties: self.live_filter_properties.clone(),
        }
    }
}

impl<T> fmt::Debug for ViewShaping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewShaping")
            .field("has_filter", &self.filter.is_some())
            .field("sort_descriptions", &self.sort_descriptions)
            .field("has_resolver", &self.resolver.is_some())
            .field("live_shaping", &self.live_shaping)
            .field("live_filter_properties", &self.live_filter_properties)
            .finish()
    }
}
