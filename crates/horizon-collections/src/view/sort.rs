//! Sort descriptions and the composite item comparer.
//!
//! A view is sorted by an ordered list of [`SortDescription`]s. The first
//! description is the primary key; later descriptions only break ties. Keys
//! are read from items through an injected [`PropertyResolver`], so the
//! engine never needs to know what an item looks like.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// Compares two resolved sort keys.
pub type ValueComparer = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Sort direction of a [`SortDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

/// Reads sort keys out of items.
///
/// `property` is `None` when the description compares the item itself.
/// Closures of the form `Fn(&T, Option<&str>) -> Value` implement this trait.
///
/// # Example
///
/// ```
/// use horizon_collections::view::{PropertyResolver, Value};
///
/// struct Person { name: String, age: u32 }
///
/// let resolver = |person: &Person, property: Option<&str>| match property {
///     Some("Name") => Value::from(person.name.as_str()),
///     Some("Age") => Value::from(person.age),
///     _ => Value::None,
/// };
///
/// let alice = Person { name: "Alice".into(), age: 30 };
/// assert_eq!(resolver.resolve(&alice, Some("Age")), Value::Int(30));
/// ```
pub trait PropertyResolver<T>: Send + Sync {
    /// Resolve the key named `property` (or the item itself) for `item`.
    fn resolve(&self, item: &T, property: Option<&str>) -> Value;
}

impl<T, F> PropertyResolver<T> for F
where
    F: Fn(&T, Option<&str>) -> Value + Send + Sync,
{
    fn resolve(&self, item: &T, property: Option<&str>) -> Value {
        self(item, property)
    }
}

/// Resolver that converts the item itself into its key, ignoring property names.
///
/// Suitable for views over plain values such as numbers or strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfResolver;

impl<T> PropertyResolver<T> for SelfResolver
where
    T: Clone + Into<Value>,
{
    fn resolve(&self, item: &T, _property: Option<&str>) -> Value {
        item.clone().into()
    }
}

/// One sort key: which property, which direction, and how to compare.
#[derive(Clone)]
pub struct SortDescription {
    property: Option<String>,
    direction: SortDirection,
    comparer: Option<ValueComparer>,
}

impl SortDescription {
    /// Sort by the named property.
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: Some(property.into()),
            direction,
            comparer: None,
        }
    }

    /// Sort by the named property, ascending.
    pub fn ascending(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Ascending)
    }

    /// Sort by the named property, descending.
    pub fn descending(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Descending)
    }

    /// Sort by the item itself.
    pub fn by_item(direction: SortDirection) -> Self {
        Self {
            property: None,
            direction,
            comparer: None,
        }
    }

    /// Use a custom key comparer instead of the natural ordering of [`Value`].
    ///
    /// The comparer must be a total order; inconsistent comparers leave the
    /// view order unspecified.
    pub fn with_comparer<F>(mut self, comparer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.comparer = Some(Arc::new(comparer));
        self
    }

    /// The property this description reads, or `None` for the item itself.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// The sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Returns `true` if a change of `property` can move an item under this description.
    pub fn depends_on(&self, property: &str) -> bool {
        self.property.as_deref().is_none_or(|own| own == property)
    }

    fn compare_keys(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = match &self.comparer {
            Some(comparer) => comparer(a, b),
            None => a.cmp(b),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl PartialEq for SortDescription {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property
            && self.direction == other.direction
            && match (&self.comparer, &other.comparer) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for SortDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDescription")
            .field("property", &self.property)
            .field("direction", &self.direction)
            .field("custom_comparer", &self.comparer.is_some())
            .finish()
    }
}

/// Composite comparator built from an ordered list of sort descriptions.
///
/// An empty comparer considers every pair of items equal; views treat that
/// as "keep source order".
pub struct ItemComparer<T> {
    descriptions: Vec<SortDescription>,
    resolver: Option<Arc<dyn PropertyResolver<T>>>,
}

impl<T> ItemComparer<T> {
    /// A comparer with no sort keys.
    pub fn empty() -> Self {
        Self {
            descriptions: Vec::new(),
            resolver: None,
        }
    }

    /// Build a comparer resolving keys through `resolver`.
    pub fn new(descriptions: Vec<SortDescription>, resolver: Arc<dyn PropertyResolver<T>>) -> Self {
        Self {
            descriptions,
            resolver: Some(resolver),
        }
    }

    /// Returns `true` if there are no sort keys.
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty() || self.resolver.is_none()
    }

    /// The sort descriptions, primary key first.
    pub fn descriptions(&self) -> &[SortDescription] {
        &self.descriptions
    }

    /// Returns `true` if a change of `property` can reorder items.
    pub fn depends_on(&self, property: &str) -> bool {
        !self.is_empty() && self.descriptions.iter().any(|d| d.depends_on(property))
    }

    /// Three-way comparison of two items.
    ///
    /// Descriptions are consulted in order; the first non-equal key decides.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        let Some(resolver) = &self.resolver else {
            return Ordering::Equal;
        };
        for description in &self.descriptions {
            let key_a = resolver.resolve(a, description.property());
            let key_b = resolver.resolve(b, description.property());
            let ordering = description.compare_keys(&key_a, &key_b);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<T> Clone for ItemComparer<T> {
    fn clone(&self) -> Self {
        Self {
            descriptions: self.descriptions.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<T> fmt::Debug for ItemComparer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemComparer")
            .field("descriptions", &self.descriptions)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}
