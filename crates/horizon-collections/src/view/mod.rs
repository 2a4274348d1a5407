//! Collection views for Horizon Lattice list controls.
//!
//! A view is a live projection of a source collection: filtered, sorted and
//! optionally grouped, kept up to date incrementally as the source changes,
//! and announcing each of its own changes through signals.
//!
//! # Core Types
//!
//! - `CollectionSource`: what a view reads from; `ObservableVec` is the stock one
//! - `CollectionChange`: one structural change of a source or a view
//! - `SortDescription` / `ItemComparer`: sort keys and the comparer built from them
//! - `ViewShaping`: filter, sort and live-shaping options
//!
//! # Views
//!
//! - `FlatView`: filtered and sorted view over a flat source
//! - `GroupView`: the members of one group, shaped like a `FlatView`
//! - `GroupedView`: all groups flattened into one item sequence
//! - `CollectionViewSource`: builds the right view from a `ViewConfig`
//!
//! # Example
//!
//! ```
//! use horizon_collections::view::{
//!     CollectionChange, FlatView, ObservableVec, SelfResolver, SortDescription, SortDirection,
//!     ViewShaping,
//! };
//!
//! let numbers = ObservableVec::shared(vec![5, 3, 8, 1]);
//! let view = FlatView::new(
//!     numbers.clone(),
//!     ViewShaping::new()
//!         .sort(SortDescription::by_item(SortDirection::Ascending))
//!         .resolver(SelfResolver),
//! )
//! .unwrap();
//!
//! view.signals().collection_changed.connect(|change| {
//!     if let CollectionChange::Added { index, .. } = change {
//!         println!("inserted at {index}");
//!     }
//! });
//!
//! numbers.push(4); // prints "inserted at 2"
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐ changes ┌──────────────┐ changes ┌──────────────┐
//! │    Source    │────────>│   FlatView   │────────>│   Observer   │
//! └──────────────┘         └──────────────┘         └──────────────┘
//!
//! ┌──────────────┐ changes ┌──────────────┐ local   ┌──────────────┐ flattened
//! │ Group source │────────>│ GroupedView  │<────────│  GroupView   │──────────> Observer
//! └──────────────┘         └──────────────┘         └──────────────┘
//! ```

mod change;
mod currency;
mod defer;
mod flat_view;
mod group_view;
mod grouped_view;
mod ordered;
mod shaping;
mod sort;
mod source;
mod traits;
mod value;
mod view_source;

pub use change::{ChangeKind, CollectionChange, ViewSignals};
pub use defer::DeferRefresh;
pub use flat_view::FlatView;
pub use group_view::{GroupId, GroupView, GroupViewKind, ItemsBinding};
pub use grouped_view::GroupedView;
pub use shaping::{FilterFn, ViewShaping};
pub use sort::{ItemComparer, PropertyResolver, SelfResolver, SortDescription, SortDirection, ValueComparer};
pub use source::{
    AsCollectionSource, CollectionSource, MutableIndexedCollection, ObservableVec, SharedSource, SourceItems,
};
pub use traits::{GroupObject, ItemsView, ViewItem};
pub use value::Value;
pub use view_source::{CollectionView, CollectionViewSource, ViewConfig, ViewKind, ViewSource};
