//! Integration tests for the view source configuration surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_collections::ViewError;
use horizon_collections::view::{
    CollectionChange, CollectionViewSource, ItemsBinding, ItemsView, ObservableVec, SelfResolver, SharedSource,
    SortDescription, SortDirection, ViewConfig, ViewKind, ViewSource,
};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct Team {
    members: Arc<ObservableVec<&'static str>>,
}

fn members_binding() -> ItemsBinding<Team, &'static str> {
    ItemsBinding::accessor("Members", |team: &Team| {
        Some(team.members.clone() as SharedSource<&'static str>)
    })
}

fn count_emissions<A: 'static>(signal: &horizon_collections::Signal<A>) -> Arc<AtomicUsize> {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    signal.connect(move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    hits
}

#[test]
fn test_filter_and_sort_in_one_configure_reset_once() {
    let numbers = ObservableVec::shared(vec![4, 1, 3, 2]);
    let source = CollectionViewSource::with_config(ViewConfig::<i32>::new().items(numbers)).unwrap();
    let view = source.view().unwrap();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    view.signals()
        .collection_changed
        .connect(move |change| changes_clone.lock().push(change.clone()));
    let replaced = count_emissions(&source.view_changed);

    source
        .configure(|config| {
            config.set_filter(Some(Arc::new(|n: &i32| *n > 1)));
            config.set_resolver(Some(Arc::new(SelfResolver)));
            config.set_sort_descriptions(vec![SortDescription::by_item(SortDirection::Descending)]);
        })
        .unwrap();

    assert_eq!(*changes.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec![4, 3, 2]);
    assert_eq!(replaced.load(Ordering::SeqCst), 0);
}

#[test]
fn test_switching_to_groups_replaces_view() {
    let numbers = ObservableVec::shared(vec!["solo"]);
    let source = CollectionViewSource::with_config(ViewConfig::<&'static str, Team>::new().items(numbers)).unwrap();
    assert_eq!(source.view_kind(), Some(ViewKind::Flat));
    let replaced = count_emissions(&source.view_changed);
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let kinds_clone = kinds.clone();
    source
        .view_kind_changed
        .connect(move |kind| kinds_clone.lock().push(*kind));

    let teams = ObservableVec::shared(vec![
        Team {
            members: ObservableVec::shared(vec!["ann", "bob"]),
        },
        Team {
            members: ObservableVec::shared(vec!["cy"]),
        },
    ]);
    source
        .configure(|config| {
            config.set_source(Some(ViewSource::Groups(teams.clone())));
            config.set_source_grouped(true);
            config.set_items_binding(Some(members_binding()));
        })
        .unwrap();

    assert_eq!(replaced.load(Ordering::SeqCst), 1);
    assert_eq!(*kinds.lock(), vec![Some(ViewKind::Grouped)]);
    let view = source.view().unwrap();
    assert_eq!(view.items(), vec!["ann", "bob", "cy"]);
    assert_eq!(view.as_grouped().map(|grouped| grouped.group_count()), Some(2));
    assert!(matches!(source.add("dee"), Err(ViewError::GroupedViewNotMutable)));
}

#[test]
fn test_half_applied_grouping_is_rejected() {
    let numbers = ObservableVec::shared(vec![1, 2]);
    let source = CollectionViewSource::with_config(ViewConfig::<i32>::new().items(numbers)).unwrap();
    let before = source.view().unwrap();

    let err = source.set_source_grouped(true).unwrap_err();

    assert!(matches!(err, ViewError::SourceShapeMismatch { grouped: true }));
    assert!(!source.config().is_source_grouped());
    assert_eq!(source.view_kind(), Some(ViewKind::Flat));
    assert_eq!(source.view().unwrap().items(), before.items());
}

#[test]
fn test_mutation_goes_through_to_source() {
    let numbers = ObservableVec::shared(vec![5, 1]);
    let source = CollectionViewSource::with_config(
        ViewConfig::<i32>::new()
            .items(numbers.clone())
            .sort(SortDescription::by_item(SortDirection::Ascending))
            .resolver(SelfResolver),
    )
    .unwrap();

    source.add(3).unwrap();
    source.insert(0, 7).unwrap();
    assert_eq!(source.remove_at(2).unwrap(), 5);

    assert_eq!(numbers.snapshot(), vec![7, 1, 3]);
    assert_eq!(source.view().unwrap().items(), vec![1, 3, 7]);
}

#[test]
fn test_clearing_source_drops_view() {
    let numbers = ObservableVec::shared(vec![1]);
    let source = CollectionViewSource::with_config(ViewConfig::<i32>::new().items(numbers)).unwrap();
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let kinds_clone = kinds.clone();
    source
        .view_kind_changed
        .connect(move |kind| kinds_clone.lock().push(*kind));

    source.set_source(None).unwrap();

    assert!(source.view().is_none());
    assert_eq!(*kinds.lock(), vec![None]);
    assert!(matches!(source.refresh(), Err(ViewError::NoSource)));
    assert!(matches!(source.clear(), Err(ViewError::NoSource)));
}

#[test]
fn test_deferred_view_source_batches_source_changes() {
    let numbers = ObservableVec::shared(Vec::new());
    let source = CollectionViewSource::with_config(ViewConfig::<i32>::new().items(numbers.clone())).unwrap();
    let view = source.view().unwrap();
    let resets = Arc::new(AtomicUsize::new(0));
    let resets_clone = resets.clone();
    view.signals().collection_changed.connect(move |change| {
        if *change == CollectionChange::Reset {
            resets_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    {
        let _guard = source.defer_refresh().unwrap();
        for n in 0..10 {
            numbers.push(n);
        }
    }

    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(view.count(), 10);
}
