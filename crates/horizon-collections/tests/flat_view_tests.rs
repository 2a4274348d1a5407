//! Integration tests for flat views.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use horizon_collections::view::{
    CollectionChange, FlatView, ObservableVec, SelfResolver, SortDescription, SortDirection, Value, ViewShaping,
};
use parking_lot::Mutex;

fn record<T: Clone + PartialEq + Send + Sync + 'static>(
    view: &FlatView<T>,
) -> Arc<Mutex<Vec<CollectionChange<T>>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    view.signals()
        .collection_changed
        .connect(move |change| log_clone.lock().push(change.clone()));
    log
}

fn ascending() -> ViewShaping<i32> {
    ViewShaping::new()
        .sort(SortDescription::by_item(SortDirection::Ascending))
        .resolver(SelfResolver)
}

#[test]
fn test_sorted_append_is_one_add() {
    let source = ObservableVec::shared(vec![5, 3, 8, 1]);
    let view = FlatView::new(source.clone(), ascending()).unwrap();
    assert_eq!(view.items(), vec![1, 3, 5, 8]);
    let log = record(&view);

    source.insert(4, 4).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::added(2, 4)]);
    assert_eq!(view.items(), vec![1, 3, 4, 5, 8]);
}

#[test]
fn test_clearing_filter_is_one_reset() {
    let source = ObservableVec::shared(vec![1, 2, 3, 4, 5, 6]);
    let view = FlatView::new(source, ViewShaping::new().filter(|n: &i32| n % 2 == 0)).unwrap();
    assert_eq!(view.items(), vec![2, 4, 6]);
    let log = record(&view);

    view.clear_filter();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_count_changed_follows_filter() {
    let source = ObservableVec::shared(vec![1, 2, 3, 4]);
    let view = FlatView::new(source.clone(), ViewShaping::new()).unwrap();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let counts_clone = counts.clone();
    view.signals()
        .count_changed
        .connect(move |&count| counts_clone.lock().push(count));

    view.set_filter(|n: &i32| *n > 2);
    source.push(5);
    source.push(0);

    assert_eq!(*counts.lock(), vec![2, 3]);
}

#[test]
fn test_same_filter_instance_twice_emits_once() {
    let source = ObservableVec::shared(vec![3, 1, 4, 15, 9]);
    let view = FlatView::new(source, ascending()).unwrap();
    let log = record(&view);

    let odd: horizon_collections::view::FilterFn<i32> = Arc::new(|n| n % 2 == 1);
    view.set_filter_fn(Some(odd.clone()));
    let after_first = view.items();
    view.set_filter_fn(Some(odd));

    assert_eq!(log.lock().len(), 1);
    assert_eq!(view.items(), after_first);
}

#[test]
fn test_refresh_filter_with_correct_view_is_silent() {
    let source = ObservableVec::shared(vec![1, 2, 3]);
    let view = FlatView::new(source, ViewShaping::new().filter(|n: &i32| *n != 2)).unwrap();
    let log = record(&view);

    view.refresh_filter();

    assert!(log.lock().is_empty());
    assert_eq!(view.items(), vec![1, 3]);
}

#[test]
fn test_degenerate_comparer_keeps_source_order() {
    let source = ObservableVec::shared(vec![7, 2, 9, 4, 1, 8]);
    let shaping = ViewShaping::new()
        .filter(|n: &i32| *n != 9)
        .sort(SortDescription::by_item(SortDirection::Descending).with_comparer(|_, _| CmpOrdering::Equal))
        .resolver(SelfResolver);
    let view = FlatView::new(source.clone(), shaping).unwrap();
    assert_eq!(view.items(), vec![7, 2, 4, 1, 8]);

    source.insert(2, 5).unwrap();
    source.remove(&2);
    source.push(3);

    assert_eq!(view.items(), vec![7, 5, 4, 1, 8, 3]);
}

#[test]
fn test_deferred_adds_emit_one_reset() {
    let source = ObservableVec::shared(vec![10, 30]);
    let view = FlatView::new(source.clone(), ascending()).unwrap();
    let log = record(&view);

    {
        let _outer = view.defer_refresh();
        for n in [25, 5, 40] {
            source.push(n);
        }
        {
            let _inner = view.defer_refresh();
            source.push(15);
        }
        assert!(view.is_refresh_deferred());
        assert!(log.lock().is_empty());
    }

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec![5, 10, 15, 25, 30, 40]);
    assert!(!view.is_refresh_deferred());
}

#[test]
fn test_defer_without_changes_is_silent() {
    let source = ObservableVec::shared(vec![1]);
    let view = FlatView::new(source, ViewShaping::new()).unwrap();
    let log = record(&view);

    drop(view.defer_refresh());

    assert!(log.lock().is_empty());
}

#[test]
fn test_batch_source_change_rebuilds() {
    let source = ObservableVec::shared(vec![2, 1]);
    let view = FlatView::new(source.clone(), ascending()).unwrap();
    let log = record(&view);

    source.extend([0, 3]);
    source.remove_range(0, 2).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset, CollectionChange::Reset]);
    assert_eq!(view.items(), vec![0, 3]);
}

#[test]
fn test_replace_into_filtered_out_value_is_removal() {
    let source = ObservableVec::shared(vec![2, 4, 6]);
    let view = FlatView::new(source.clone(), ViewShaping::new().filter(|n: &i32| n % 2 == 0)).unwrap();
    let log = record(&view);

    source.replace(1, 5).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::removed(1, 4)]);
    assert_eq!(view.items(), vec![2, 6]);
}

#[test]
fn test_replace_moving_across_sort_order_resets() {
    let source = ObservableVec::shared(vec![1, 2, 3]);
    let view = FlatView::new(source.clone(), ascending()).unwrap();
    let log = record(&view);

    source.replace(0, 9).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec![2, 3, 9]);
}

#[test]
fn test_source_move_is_ignored_by_sorted_view() {
    let source = ObservableVec::shared(vec![1, 2, 3]);
    let view = FlatView::new(source.clone(), ascending()).unwrap();
    let log = record(&view);

    source.move_item(0, 2).unwrap();

    assert!(log.lock().is_empty());
    assert_eq!(view.items(), vec![1, 2, 3]);
}

#[test]
fn test_source_clear_resets_view_and_currency() {
    let source = ObservableVec::shared(vec![1, 2]);
    let view = FlatView::new(source.clone(), ViewShaping::new()).unwrap();
    let log = record(&view);

    source.clear();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert!(view.is_empty());
    assert_eq!(view.current_position(), None);
}

// -----------------------------------------------------------------------------
// Live shaping
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct Player {
    name: &'static str,
    rank: AtomicI64,
}

#[derive(Debug, Clone)]
struct PlayerRef(Arc<Player>);

impl PartialEq for PlayerRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn player(name: &'static str, rank: i64) -> PlayerRef {
    PlayerRef(Arc::new(Player {
        name,
        rank: AtomicI64::new(rank),
    }))
}

fn resolve_player(player: &PlayerRef, property: Option<&str>) -> Value {
    match property {
        Some("Rank") => Value::from(player.0.rank.load(Ordering::SeqCst)),
        Some("Name") => Value::from(player.0.name),
        _ => Value::None,
    }
}

fn names(view: &FlatView<PlayerRef>) -> Vec<&'static str> {
    view.items().iter().map(|player| player.0.name).collect()
}

#[test]
fn test_live_sort_repositions_with_one_move() {
    let r1 = player("R1", 1);
    let x = player("X", 5);
    let r9 = player("R9", 9);
    let source = ObservableVec::shared(vec![x.clone(), r9.clone(), r1.clone()]);
    let view = FlatView::new(
        source,
        ViewShaping::new()
            .sort(SortDescription::ascending("Rank"))
            .resolver(resolve_player)
            .live_shaping(true),
    )
    .unwrap();
    assert_eq!(names(&view), vec!["R1", "X", "R9"]);
    let log = record(&view);

    x.0.rank.store(10, Ordering::SeqCst);
    view.notify_item_property_changed(&x, Some("Rank"));

    assert_eq!(names(&view), vec!["R1", "R9", "X"]);
    assert_eq!(*log.lock(), vec![CollectionChange::moved(1, 2, x)]);
}

#[test]
fn test_unrelated_property_change_is_silent() {
    let a = player("A", 1);
    let b = player("B", 2);
    let source = ObservableVec::shared(vec![a.clone(), b]);
    let view = FlatView::new(
        source,
        ViewShaping::new()
            .sort(SortDescription::ascending("Rank"))
            .resolver(resolve_player)
            .live_shaping(true),
    )
    .unwrap();
    let log = record(&view);

    view.notify_item_property_changed(&a, Some("Name"));

    assert!(log.lock().is_empty());
}

#[test]
fn test_live_filter_adds_and_removes() {
    let a = player("A", 1);
    let b = player("B", 7);
    let c = player("C", 3);
    let source = ObservableVec::shared(vec![a.clone(), b.clone(), c.clone()]);
    let view = FlatView::new(
        source,
        ViewShaping::new()
            .filter(|player: &PlayerRef| player.0.rank.load(Ordering::SeqCst) < 5)
            .live_shaping(true)
            .live_filter_property("Rank"),
    )
    .unwrap();
    assert_eq!(names(&view), vec!["A", "C"]);
    let log = record(&view);

    b.0.rank.store(2, Ordering::SeqCst);
    view.notify_item_property_changed(&b, Some("Rank"));
    a.0.rank.store(8, Ordering::SeqCst);
    view.notify_item_property_changed(&a, Some("Rank"));
    c.0.rank.store(9, Ordering::SeqCst);
    view.notify_item_property_changed(&c, Some("Name"));

    assert_eq!(names(&view), vec!["B", "C"]);
    assert_eq!(
        *log.lock(),
        vec![CollectionChange::added(1, b), CollectionChange::removed(0, a)]
    );
}

#[test]
fn test_property_changes_ignored_without_live_shaping() {
    let a = player("A", 1);
    let b = player("B", 2);
    let source = ObservableVec::shared(vec![a.clone(), b]);
    let view = FlatView::new(
        source,
        ViewShaping::new()
            .sort(SortDescription::ascending("Rank"))
            .resolver(resolve_player),
    )
    .unwrap();

    a.0.rank.store(3, Ordering::SeqCst);
    view.notify_item_property_changed(&a, Some("Rank"));

    assert_eq!(names(&view), vec!["A", "B"]);
    view.refresh_sorting();
    assert_eq!(names(&view), vec!["B", "A"]);
}
