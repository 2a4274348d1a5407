//! Change notifications emitted by sources and views.
//!
//! Every mutation of a source collection and every update of a view is
//! described by one [`CollectionChange`]. Views publish theirs through
//! [`ViewSignals`], after the view already reflects the change.

use horizon_collections_core::Signal;
use horizon_collections_core::logging::targets;

/// The kind of a [`CollectionChange`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Items were inserted.
    Add,
    /// Items were removed.
    Remove,
    /// Items were replaced in place.
    Replace,
    /// Items moved to another position.
    Move,
    /// The collection changed too much to describe incrementally.
    Reset,
}

/// A structural change of an ordered collection.
///
/// Indices refer to the collection that emitted the change. For `Added` and
/// `Moved` they are positions after the change, for `Removed` positions before.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// `items` were inserted starting at `index`.
    Added {
        /// Position of the first inserted item.
        index: usize,
        /// The inserted items, in order.
        items: Vec<T>,
    },
    /// `items` were removed starting at `index`.
    Removed {
        /// Position of the first removed item.
        index: usize,
        /// The removed items, in order.
        items: Vec<T>,
    },
    /// `old_items` starting at `index` were replaced with `new_items`.
    Replaced {
        /// Position of the first replaced item.
        index: usize,
        /// Items before the replacement.
        old_items: Vec<T>,
        /// Items after the replacement.
        new_items: Vec<T>,
    },
    /// `items` moved from `old_index` to `new_index`.
    Moved {
        /// Position before the move.
        old_index: usize,
        /// Position after the move.
        new_index: usize,
        /// The moved items, in order.
        items: Vec<T>,
    },
    /// Anything may have changed; observers must re-read the collection.
    Reset,
}

impl<T> CollectionChange<T> {
    /// A single item inserted at `index`.
    pub fn added(index: usize, item: T) -> Self {
        Self::Added {
            index,
            items: vec![item],
        }
    }

    /// A single item removed from `index`.
    pub fn removed(index: usize, item: T) -> Self {
        Self::Removed {
            index,
            items: vec![item],
        }
    }

    /// A single item replaced at `index`.
    pub fn replaced(index: usize, old_item: T, new_item: T) -> Self {
        Self::Replaced {
            index,
            old_items: vec![old_item],
            new_items: vec![new_item],
        }
    }

    /// A single item moved from `old_index` to `new_index`.
    pub fn moved(old_index: usize, new_index: usize, item: T) -> Self {
        Self::Moved {
            old_index,
            new_index,
            items: vec![item],
        }
    }

    /// The kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Add,
            Self::Removed { .. } => ChangeKind::Remove,
            Self::Replaced { .. } => ChangeKind::Replace,
            Self::Moved { .. } => ChangeKind::Move,
            Self::Reset => ChangeKind::Reset,
        }
    }

    /// Number of items the change carries (zero for `Reset`).
    pub fn item_count(&self) -> usize {
        match self {
            Self::Added { items, .. } | Self::Removed { items, .. } | Self::Moved { items, .. } => {
                items.len()
            }
            Self::Replaced { new_items, .. } => new_items.len(),
            Self::Reset => 0,
        }
    }

    /// Returns `true` if the change touches exactly one item.
    pub fn is_single_item(&self) -> bool {
        match self {
            Self::Replaced {
                old_items,
                new_items,
                ..
            } => old_items.len() == 1 && new_items.len() == 1,
            Self::Reset => false,
            _ => self.item_count() == 1,
        }
    }

    /// Shift every index of this change by `offset`.
    ///
    /// Used to translate a group-local change into flattened coordinates.
    pub fn offset(self, offset: usize) -> Self {
        match self {
            Self::Added { index, items } => Self::Added {
                index: index + offset,
                items,
            },
            Self::Removed { index, items } => Self::Removed {
                index: index + offset,
                items,
            },
            Self::Replaced {
                index,
                old_items,
                new_items,
            } => Self::Replaced {
                index: index + offset,
                old_items,
                new_items,
            },
            Self::Moved {
                old_index,
                new_index,
                items,
            } => Self::Moved {
                old_index: old_index + offset,
                new_index: new_index + offset,
                items,
            },
            Self::Reset => Self::Reset,
        }
    }
}

/// Signals published by every view.
///
/// # Signal Usage
///
/// - `collection_changed`: one notification per completed update
/// - `count_changed`: the new count, only when it differs from the old one
/// - `current_changed`: `(new, old)` current positions
pub struct ViewSignals<T> {
    /// Emitted after the view's items changed.
    pub collection_changed: Signal<CollectionChange<T>>,

    /// Emitted after the number of items in the view changed.
    pub count_changed: Signal<usize>,

    /// Emitted after the current position changed. Args: (new, old)
    pub current_changed: Signal<(Option<usize>, Option<usize>)>,
}

impl<T: 'static> Default for ViewSignals<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ViewSignals<T> {
    /// Creates a new set of view signals.
    pub fn new() -> Self {
        Self {
            collection_changed: Signal::new(),
            count_changed: Signal::new(),
            current_changed: Signal::new(),
        }
    }

    /// Publish the outcome of one completed view update.
    ///
    /// Must be called with no view lock held: observers may read the view.
    pub(crate) fn publish(&self, update: ViewUpdate<T>) {
        if update.is_empty() {
            return;
        }
        tracing::trace!(
            target: targets::VIEW,
            changes = update.changes.len(),
            count = update.count_after,
            "publishing view update"
        );
        for change in update.changes {
            self.collection_changed.emit(change);
        }
        if update.count_before != update.count_after {
            self.count_changed.emit(update.count_after);
        }
        if update.current_before != update.current_after {
            self.current_changed
                .emit((update.current_after, update.current_before));
        }
    }
}

impl<T> std::fmt::Debug for ViewSignals<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSignals")
            .field("collection_changed", &self.collection_changed)
            .field("count_changed", &self.count_changed)
            .field("current_changed", &self.current_changed)
            .finish()
    }
}

/// Everything a view must announce after one update, computed under its lock
/// and published after the lock is released.
#[derive(Debug)]
pub(crate) struct ViewUpdate<T> {
    pub changes: Vec<CollectionChange<T>>,
    pub count_before: usize,
    pub count_after: usize,
    pub current_before: Option<usize>,
    pub current_after: Option<usize>,
}

impl<T> ViewUpdate<T> {
    pub fn new(count: usize, current: Option<usize>) -> Self {
        Self {
            changes: Vec::new(),
            count_before: count,
            count_after: count,
            current_before: current,
            current_after: current,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
            && self.count_before == self.count_after
            && self.current_before == self.current_after
    }
}
