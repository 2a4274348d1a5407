//! Traits shared by every kind of view.

use std::fmt;

use super::change::ViewSignals;

/// Bound for items shown in a view.
///
/// Items are cheap handles (often `Arc<X>`) compared by `PartialEq`. A source
/// must not contain the same item twice.
pub trait ViewItem: Clone + PartialEq + Send + Sync + 'static {}

impl<T> ViewItem for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Bound for group objects of a grouped view.
///
/// Group objects are only cloned, resolved through an `ItemsBinding` and
/// rendered in error messages.
pub trait GroupObject: Clone + fmt::Debug + Send + Sync + 'static {}

impl<G> GroupObject for G where G: Clone + fmt::Debug + Send + Sync + 'static {}

/// Read access common to flat and grouped views.
///
/// List controls bind to this trait so they need not care whether the view
/// behind them is grouped.
pub trait ItemsView<T: ViewItem>: Send + Sync {
    /// Number of items in the view.
    fn count(&self) -> usize;

    /// Returns `true` if the view shows no items.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The item at `index`, in view order.
    fn get(&self, index: usize) -> Option<T>;

    /// All items, in view order.
    fn items(&self) -> Vec<T>;

    /// Position of `item` in the view.
    fn index_of(&self, item: &T) -> Option<usize>;

    /// Returns `true` if `item` is in the view.
    fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// The view's change signals.
    fn signals(&self) -> &ViewSignals<T>;

    /// The current position, if any.
    fn current_position(&self) -> Option<usize>;

    /// The item at the current position, if any.
    fn current_item(&self) -> Option<T>;
}
