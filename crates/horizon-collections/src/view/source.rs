//! Source collections views are built over.
//!
//! A view reads its items from a [`CollectionSource`] and, when the source
//! offers one, listens to its change signal. Sources that also implement
//! [`MutableIndexedCollection`] can be mutated through the view.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use horizon_collections_core::Signal;
use horizon_collections_core::logging::targets;
use parking_lot::{RwLock, RwLockReadGuard};

use super::change::CollectionChange;
use crate::error::{Result, ViewError};

/// Borrowed, read-locked access to a source's items.
pub type SourceItems<'a, T> = Box<dyn Deref<Target = [T]> + 'a>;

/// Shared handle to a source collection.
pub type SharedSource<T> = Arc<dyn CollectionSource<T>>;

/// An ordered collection a view can be built over.
///
/// The view only reads through this trait. The source stays owned by the
/// application; the view keeps a shared handle for as long as it lives.
pub trait CollectionSource<T: Clone>: Send + Sync {
    /// Borrow the current items.
    ///
    /// Implementations usually hold a read lock for the lifetime of the
    /// returned value, so it must not be kept across a mutation.
    fn read(&self) -> SourceItems<'_, T>;

    /// Number of items.
    fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the source has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the item at `index`.
    fn get(&self, index: usize) -> Option<T> {
        self.read().get(index).cloned()
    }

    /// Clone of all items.
    fn snapshot(&self) -> Vec<T> {
        self.read().to_vec()
    }

    /// Signal emitted after every structural change, if the source has one.
    ///
    /// Sources without change notification are still usable; the owner then
    /// calls `refresh()` on the view after changing them.
    fn changes(&self) -> Option<&Signal<CollectionChange<T>>> {
        None
    }

    /// Mutation capability, if the source supports indexed mutation.
    fn as_mutable(&self) -> Option<&dyn MutableIndexedCollection<T>> {
        None
    }
}

/// Indexed mutation capability of a source collection.
///
/// Views forward `add`/`insert`/`remove`/`clear` here; the view itself then
/// updates from the source's change signal.
pub trait MutableIndexedCollection<T>: Send + Sync {
    /// Insert `item` at `index` (`index == len` appends).
    fn insert(&self, index: usize, item: T) -> Result<()>;

    /// Remove and return the item at `index`.
    fn remove_at(&self, index: usize) -> Result<T>;

    /// Replace the item at `index`, returning the previous item.
    fn set(&self, index: usize, item: T) -> Result<T>;

    /// Remove every item.
    fn clear(&self);

    /// Append `item`.
    fn push(&self, item: T);
}

/// Group objects that are themselves collections of items.
///
/// Used by [`ItemsBinding::enumerable`](super::ItemsBinding::enumerable).
pub trait AsCollectionSource<T: Clone> {
    /// The group's members as a source, or `None` if unavailable.
    fn as_collection_source(&self) -> Option<SharedSource<T>>;
}

impl<T> AsCollectionSource<T> for Arc<ObservableVec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    fn as_collection_source(&self) -> Option<SharedSource<T>> {
        Some(self.clone() as SharedSource<T>)
    }
}

impl<T: Clone> AsCollectionSource<T> for SharedSource<T> {
    fn as_collection_source(&self) -> Option<SharedSource<T>> {
        Some(self.clone())
    }
}

/// A fixed collection with no change notification.
impl<T: Clone + Send + Sync> CollectionSource<T> for Vec<T> {
    fn read(&self) -> SourceItems<'_, T> {
        Box::new(self.as_slice())
    }
}

/// A vector that announces every mutation.
///
/// Each mutation is applied under the write lock, the lock is released, and
/// then exactly one [`CollectionChange`] is emitted on [`changes`](CollectionSource::changes).
///
/// # Example
///
/// ```
/// use horizon_collections::view::{CollectionChange, CollectionSource, ObservableVec};
///
/// let numbers = ObservableVec::new(vec![1, 2]);
/// if let Some(changes) = numbers.changes() {
///     changes.connect(|change: &CollectionChange<i32>| println!("{change:?}"));
/// }
/// numbers.push(3);
/// assert_eq!(numbers.snapshot(), vec![1, 2, 3]);
/// ```
pub struct ObservableVec<T> {
    items: RwLock<Vec<T>>,
    changes: Signal<CollectionChange<T>>,
}

impl<T> ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a collection holding `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            changes: Signal::new(),
        }
    }

    /// Creates a shared collection holding `items`.
    pub fn shared(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self::new(items))
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the collection has no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Clone of all items.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Appends an item to the end.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.notify(CollectionChange::added(index, item));
    }

    /// Inserts an item at `index`.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        {
            let mut items = self.items.write();
            if index > items.len() {
                return Err(ViewError::out_of_range(index, items.len()));
            }
            items.insert(index, item.clone());
        }
        self.notify(CollectionChange::added(index, item));
        Ok(())
    }

    /// Appends several items as one change.
    pub fn extend(&self, new_items: impl IntoIterator<Item = T>) {
        let new_items: Vec<T> = new_items.into_iter().collect();
        if new_items.is_empty() {
            return;
        }
        let index = {
            let mut items = self.items.write();
            let index = items.len();
            items.extend(new_items.iter().cloned());
            index
        };
        self.notify(CollectionChange::Added {
            index,
            items: new_items,
        });
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return Err(ViewError::out_of_range(index, items.len()));
            }
            items.remove(index)
        };
        self.notify(CollectionChange::removed(index, removed.clone()));
        Ok(removed)
    }

    /// Removes `count` items starting at `index` as one change.
    pub fn remove_range(&self, index: usize, count: usize) -> Result<Vec<T>> {
        let removed: Vec<T> = {
            let mut items = self.items.write();
            let end = index.saturating_add(count);
            if end > items.len() {
                return Err(ViewError::out_of_range(end, items.len()));
            }
            items.drain(index..end).collect()
        };
        if !removed.is_empty() {
            self.notify(CollectionChange::Removed {
                index,
                items: removed.clone(),
            });
        }
        Ok(removed)
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn replace(&self, index: usize, item: T) -> Result<T> {
        let old = {
            let mut items = self.items.write();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ViewError::out_of_range(index, len))?;
            std::mem::replace(slot, item.clone())
        };
        self.notify(CollectionChange::replaced(index, old.clone(), item));
        Ok(old)
    }

    /// Moves the item at `old_index` so that it ends up at `new_index`.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        let item = {
            let mut items = self.items.write();
            let len = items.len();
            if old_index >= len {
                return Err(ViewError::out_of_range(old_index, len));
            }
            if new_index >= len {
                return Err(ViewError::out_of_range(new_index, len));
            }
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            item
        };
        if old_index != new_index {
            self.notify(CollectionChange::moved(old_index, new_index, item));
        }
        Ok(())
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.items.write().clear();
        self.notify(CollectionChange::Reset);
    }

    /// Replaces the whole content as one reset.
    pub fn reset_with(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.notify(CollectionChange::Reset);
    }

    fn notify(&self, change: CollectionChange<T>) {
        tracing::trace!(target: targets::SOURCE, kind = ?change.kind(), "source changed");
        self.changes.emit(change);
    }
}

impl<T: PartialEq + Clone + Send + Sync + 'static> ObservableVec<T> {
    /// Removes the first item equal to `item`. Returns `false` if absent.
    pub fn remove(&self, item: &T) -> bool {
        let position = self.items.read().iter().position(|candidate| candidate == item);
        match position {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Position of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.read().iter().position(|candidate| candidate == item)
    }
}

impl<T> CollectionSource<T> for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn read(&self) -> SourceItems<'_, T> {
        Box::new(RwLockReadGuard::map(self.items.read(), |items| items.as_slice()))
    }

    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn changes(&self) -> Option<&Signal<CollectionChange<T>>> {
        Some(&self.changes)
    }

    fn as_mutable(&self) -> Option<&dyn MutableIndexedCollection<T>> {
        Some(self)
    }
}

impl<T> MutableIndexedCollection<T> for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn insert(&self, index: usize, item: T) -> Result<()> {
        ObservableVec::insert(self, index, item)
    }

    fn remove_at(&self, index: usize) -> Result<T> {
        ObservableVec::remove_at(self, index)
    }

    fn set(&self, index: usize, item: T) -> Result<T> {
        self.replace(index, item)
    }

    fn clear(&self) {
        ObservableVec::clear(self)
    }

    fn push(&self, item: T) {
        ObservableVec::push(self, item)
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableVec")
            .field("items", &*self.items.read())
            .finish()
    }
}

impl<T> Default for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
