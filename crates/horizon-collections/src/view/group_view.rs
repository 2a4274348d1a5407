//! One group of a grouped view, and how its members are found.

use std::fmt;
use std::sync::Arc;

use super::change::ViewSignals;
use super::flat_view::FlatView;
use super::shaping::ViewShaping;
use super::source::{AsCollectionSource, SharedSource};
use super::traits::{GroupObject, ViewItem};
use crate::error::{Result, ViewError};

type ResolveFn<G, T> = Arc<dyn Fn(&G) -> Option<SharedSource<T>> + Send + Sync>;

/// How a grouped view finds the members of a group object.
///
/// Two bindings are the same binding only if one is a clone of the other.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_collections::view::{ItemsBinding, ObservableVec, SharedSource};
///
/// #[derive(Clone, Debug)]
/// struct Category {
///     name: &'static str,
///     products: Arc<ObservableVec<&'static str>>,
/// }
///
/// let binding = ItemsBinding::accessor("Products", |category: &Category| {
///     Some(category.products.clone() as SharedSource<&'static str>)
/// });
/// assert_eq!(binding.name(), Some("Products"));
/// ```
pub struct ItemsBinding<G, T> {
    name: Option<String>,
    resolve: ResolveFn<G, T>,
}

impl<G: GroupObject, T: ViewItem> ItemsBinding<G, T> {
    /// The group object is itself the collection of its members.
    pub fn enumerable() -> Self
    where
        G: AsCollectionSource<T>,
    {
        Self {
            name: None,
            resolve: Arc::new(|group: &G| group.as_collection_source()),
        }
    }

    /// Read the members through `accessor`, named `name` in error messages.
    pub fn accessor<F>(name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&G) -> Option<SharedSource<T>> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            resolve: Arc::new(accessor),
        }
    }

    /// The accessor name, or `None` for [`enumerable`](Self::enumerable).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The members of `group`.
    pub fn resolve(&self, group: &G) -> Result<SharedSource<T>> {
        (self.resolve)(group).ok_or_else(|| {
            let err = ViewError::unresolved_group(group, self.name.as_deref().unwrap_or("<self>"));
            tracing::warn!(target: horizon_collections_core::logging::targets::GROUPED, %err, "group resolution failed");
            err
        })
    }

    /// Returns `true` if `other` is a clone of this binding.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resolve, &other.resolve)
    }
}

impl<G, T> Clone for ItemsBinding<G, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            resolve: self.resolve.clone(),
        }
    }
}

impl<G, T> fmt::Debug for ItemsBinding<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsBinding").field("name", &self.name).finish()
    }
}

/// Whether a group view can filter and sort.
///
/// Chosen once when the group view is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupViewKind {
    /// Mirrors the group's members as they are.
    Plain,
    /// Applies the grouped view's filter, sort and live shaping.
    SortFilterCapable,
}

impl GroupViewKind {
    /// The kind a group built with `shaping` needs.
    pub fn for_shaping<T>(shaping: &ViewShaping<T>) -> Self {
        if shaping.is_plain() {
            Self::Plain
        } else {
            Self::SortFilterCapable
        }
    }
}

/// Identifies a group view within its grouped view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

/// The materialized members of one group.
///
/// Built like a [`FlatView`] over the group's members. Handles are cheap to
/// clone.
pub struct GroupView<G, T: ViewItem> {
    id: GroupId,
    group: G,
    kind: GroupViewKind,
    view: FlatView<T>,
}

impl<G: GroupObject, T: ViewItem> GroupView<G, T> {
    pub(crate) fn new(
        id: GroupId,
        group: G,
        binding: &ItemsBinding<G, T>,
        shaping: &ViewShaping<T>,
    ) -> Result<Self> {
        let source = binding.resolve(&group)?;
        let kind = GroupViewKind::for_shaping(shaping);
        let view = match kind {
            GroupViewKind::Plain => FlatView::new(source, ViewShaping::new())?,
            GroupViewKind::SortFilterCapable => FlatView::new(source, shaping.clone())?,
        };
        Ok(Self { id, group, kind, view })
    }

    /// This group's id.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The group object.
    pub fn group(&self) -> &G {
        &self.group
    }

    /// Whether this group filters and sorts.
    pub fn kind(&self) -> GroupViewKind {
        self.kind
    }

    /// Number of items shown in this group.
    pub fn count(&self) -> usize {
        self.view.count()
    }

    /// The items shown in this group.
    pub fn items(&self) -> Vec<T> {
        self.view.items()
    }

    /// The item at `index` within the group.
    pub fn get(&self, index: usize) -> Option<T> {
        self.view.get(index)
    }

    /// Position of `item` within the group.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.view.index_of(item)
    }

    /// The group's signals, in group-local coordinates.
    pub fn signals(&self) -> &ViewSignals<T> {
        self.view.signals()
    }

    pub(crate) fn view(&self) -> &FlatView<T> {
        &self.view
    }
}

impl<G: Clone, T: ViewItem> Clone for GroupView<G, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            group: self.group.clone(),
            kind: self.kind,
            view: self.view.clone(),
        }
    }
}

impl<G: fmt::Debug, T: ViewItem + fmt::Debug> fmt::Debug for GroupView<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupView")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("kind", &self.kind)
            .field("items", &self.view.items())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{CollectionSource, ObservableVec, SelfResolver, SortDescription, SortDirection};

    #[derive(Clone, Debug)]
    #[allow(dead_code)]
    struct Letter {
        letter: char,
        words: Option<Arc<ObservableVec<&'static str>>>,
    }

    fn words_binding() -> ItemsBinding<Letter, &'static str> {
        ItemsBinding::accessor("Words", |letter: &Letter| {
            letter
                .words
                .clone()
                .map(|words| words as SharedSource<&'static str>)
        })
    }

    #[test]
    fn test_unresolvable_group_names_group_and_binding() {
        let letter = Letter { letter: 'q', words: None };
        let err = words_binding().resolve(&letter).err().unwrap();
        match err {
            ViewError::UnresolvedGroupItems { group, binding } => {
                assert!(group.contains("'q'"));
                assert_eq!(binding, "Words");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enumerable_binding_uses_group_itself() {
        let binding = ItemsBinding::<Arc<ObservableVec<i32>>, i32>::enumerable();
        let group = ObservableVec::shared(vec![1, 2]);
        assert_eq!(binding.resolve(&group).unwrap().snapshot(), vec![1, 2]);
        assert_eq!(binding.name(), None);
    }

    #[test]
    fn test_binding_identity() {
        let binding = words_binding();
        assert!(binding.same_as(&binding.clone()));
        assert!(!binding.same_as(&words_binding()));
    }

    #[test]
    fn test_kind_follows_shaping() {
        let letter = Letter {
            letter: 'b',
            words: Some(ObservableVec::shared(vec!["bee", "bat"])),
        };
        let plain = GroupView::new(GroupId(0), letter.clone(), &words_binding(), &ViewShaping::new()).unwrap();
        assert_eq!(plain.kind(), GroupViewKind::Plain);
        assert_eq!(plain.items(), vec!["bee", "bat"]);

        let sorted = ViewShaping::new()
            .sort(SortDescription::by_item(SortDirection::Ascending))
            .resolver(SelfResolver);
        let capable = GroupView::new(GroupId(1), letter, &words_binding(), &sorted).unwrap();
        assert_eq!(capable.kind(), GroupViewKind::SortFilterCapable);
        assert_eq!(capable.items(), vec!["bat", "bee"]);
    }
}
