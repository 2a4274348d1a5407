//! Integration tests for grouped views.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use horizon_collections::ViewError;
use horizon_collections::view::{
    CollectionChange, GroupViewKind, GroupedView, ItemsBinding, ObservableVec, SharedSource, SortDescription, Value,
    ViewShaping,
};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct Shelf {
    label: &'static str,
    books: Arc<ObservableVec<&'static str>>,
}

fn shelf(label: &'static str, books: Vec<&'static str>) -> Shelf {
    Shelf {
        label,
        books: ObservableVec::shared(books),
    }
}

fn books_binding() -> ItemsBinding<Shelf, &'static str> {
    ItemsBinding::accessor("Books", |shelf: &Shelf| {
        Some(shelf.books.clone() as SharedSource<&'static str>)
    })
}

fn by_title() -> ViewShaping<&'static str> {
    ViewShaping::new()
        .sort(SortDescription::ascending("Title"))
        .resolver(|title: &&'static str, _: Option<&str>| Value::from(*title))
}

fn record<T: Clone + PartialEq + Send + Sync + 'static>(
    view: &GroupedView<Shelf, T>,
) -> Arc<Mutex<Vec<CollectionChange<T>>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    view.signals()
        .collection_changed
        .connect(move |change| log_clone.lock().push(change.clone()));
    log
}

fn assert_counts_agree<T: Clone + PartialEq + Send + Sync + 'static>(view: &GroupedView<Shelf, T>) {
    let sum: usize = view.groups().iter().map(|group| group.count()).sum();
    assert_eq!(view.count(), sum);
    assert_eq!(view.items().len(), sum);
}

#[test]
fn test_removal_is_translated_to_flattened_index() {
    let first = shelf("G1", vec!["a", "b"]);
    let second = shelf("G2", vec!["c", "d", "e"]);
    let shelves = ObservableVec::shared(vec![first, second.clone()]);
    let view = GroupedView::new(shelves, books_binding(), ViewShaping::new()).unwrap();
    assert_eq!(view.count(), 5);
    let log = record(&view);

    second.books.remove(&"c");

    assert_eq!(*log.lock(), vec![CollectionChange::removed(2, "c")]);
    assert_eq!(view.count(), 4);
    assert_eq!(view.items(), vec!["a", "b", "d", "e"]);
}

#[test]
fn test_sorted_groups_add_at_flattened_slot() {
    let first = shelf("A", vec!["melon", "apple"]);
    let second = shelf("B", vec!["zebra", "koala"]);
    let shelves = ObservableVec::shared(vec![first.clone(), second.clone()]);
    let view = GroupedView::new(shelves, books_binding(), by_title()).unwrap();
    assert_eq!(view.items(), vec!["apple", "melon", "koala", "zebra"]);
    assert_eq!(view.count_items_before_group(1), 2);
    let log = record(&view);

    second.books.push("lynx");

    assert_eq!(*log.lock(), vec![CollectionChange::added(3, "lynx")]);
    assert_eq!(view.group_items(1), Some(vec!["koala", "lynx", "zebra"]));
    assert_counts_agree(&view);
}

#[test]
fn test_counts_agree_after_every_operation() {
    let first = shelf("A", vec!["cherry", "apple"]);
    let second = shelf("B", vec!["banana"]);
    let shelves = ObservableVec::shared(vec![first.clone(), second.clone()]);
    let view = GroupedView::new(shelves.clone(), books_binding(), by_title()).unwrap();
    assert_counts_agree(&view);

    first.books.push("avocado");
    assert_counts_agree(&view);
    second.books.remove_at(0).unwrap();
    assert_counts_agree(&view);
    shelves.push(shelf("C", vec!["fig", "date"]));
    assert_counts_agree(&view);
    view.set_filter(|title: &&'static str| title.len() > 4).unwrap();
    assert_counts_agree(&view);
    shelves.replace(0, shelf("D", vec!["grape"])).unwrap();
    assert_counts_agree(&view);
    shelves.move_item(0, 1).unwrap();
    assert_counts_agree(&view);
    view.clear_filter().unwrap();
    assert_counts_agree(&view);
    shelves.remove_at(0).unwrap();
    assert_counts_agree(&view);

    assert_eq!(view.items(), vec!["grape", "date", "fig"]);
}

#[test]
fn test_group_replacement_of_equal_size_is_replace() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["x"]), shelf("B", vec!["y"])]);
    let view = GroupedView::new(shelves.clone(), books_binding(), ViewShaping::new()).unwrap();
    let log = record(&view);

    shelves.replace(1, shelf("C", vec!["z"])).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::replaced(1, "y", "z")]);
    assert_eq!(view.groups()[1].group().label, "C");
}

#[test]
fn test_group_replacement_of_different_size_resets() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["x"]), shelf("B", vec!["y"])]);
    let view = GroupedView::new(shelves.clone(), books_binding(), ViewShaping::new()).unwrap();
    let log = record(&view);

    shelves.replace(0, shelf("C", vec!["p", "q"])).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec!["p", "q", "y"]);
}

#[test]
fn test_flat_mutation_is_rejected() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["x"])]);
    let view = GroupedView::new(shelves, books_binding(), ViewShaping::new()).unwrap();

    assert!(matches!(view.add("y"), Err(ViewError::GroupedViewNotMutable)));
    assert!(matches!(view.insert(0, "y"), Err(ViewError::GroupedViewNotMutable)));
    assert!(matches!(view.remove(&"x"), Err(ViewError::GroupedViewNotMutable)));
    assert!(matches!(view.remove_at(0), Err(ViewError::GroupedViewNotMutable)));
    assert!(matches!(view.clear(), Err(ViewError::GroupedViewNotMutable)));
    assert_eq!(view.items(), vec!["x"]);
}

#[test]
fn test_unresolvable_group_fails_construction() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["x"])]);
    let binding = ItemsBinding::accessor("Missing", |_: &Shelf| None::<SharedSource<&'static str>>);

    let err = GroupedView::new(shelves, binding, ViewShaping::new()).err().unwrap();

    match err {
        ViewError::UnresolvedGroupItems { group, binding } => {
            assert!(group.contains("\"A\""));
            assert_eq!(binding, "Missing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_plain_groups_rebuild_for_shaping() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["b", "a"])]);
    let view = GroupedView::new(shelves, books_binding(), ViewShaping::new()).unwrap();
    assert_eq!(view.groups()[0].kind(), GroupViewKind::Plain);
    let log = record(&view);

    view.set_shaping(by_title()).unwrap();

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.groups()[0].kind(), GroupViewKind::SortFilterCapable);
    assert_eq!(view.items(), vec!["a", "b"]);
}

#[test]
fn test_deferred_group_changes_emit_one_reset() {
    let first = shelf("A", vec!["a"]);
    let shelves = ObservableVec::shared(vec![first.clone()]);
    let view = GroupedView::new(shelves.clone(), books_binding(), by_title()).unwrap();
    let log = record(&view);

    {
        let _guard = view.defer_refresh();
        first.books.push("c");
        first.books.push("b");
        shelves.push(shelf("B", vec!["d"]));
        assert!(log.lock().is_empty());
    }

    assert_eq!(*log.lock(), vec![CollectionChange::Reset]);
    assert_eq!(view.items(), vec!["a", "b", "c", "d"]);
    assert_counts_agree(&view);
}

#[test]
fn test_currency_walks_across_groups() {
    let shelves = ObservableVec::shared(vec![shelf("A", vec!["a"]), shelf("B", vec!["b", "c"])]);
    let view = GroupedView::new(shelves, books_binding(), ViewShaping::new()).unwrap();

    assert_eq!(view.current_item(), Some("a"));
    assert!(view.move_current_to_next());
    assert_eq!(view.current_item(), Some("b"));
    assert!(view.move_current_to(&"c"));
    assert_eq!(view.current_position(), Some(2));
    assert!(view.move_current_to_position(5).is_err());
}

#[test]
fn test_count_changed_follows_filter_and_deferral() {
    let first = ObservableVec::shared(vec![1, 2, 3, 4]);
    let groups = ObservableVec::shared(vec![first.clone(), ObservableVec::shared(vec![5, 6])]);
    let view = GroupedView::new(groups, ItemsBinding::enumerable(), ViewShaping::new()).unwrap();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let counts_clone = counts.clone();
    view.signals()
        .count_changed
        .connect(move |&count| counts_clone.lock().push(count));

    view.set_filter(|n: &i32| n % 2 == 0).unwrap();
    assert_eq!(view.count(), 3);
    {
        let _guard = view.defer_refresh();
        first.push(8);
        first.push(10);
    }
    assert_eq!(view.count(), 5);
    view.clear_filter().unwrap();

    assert_eq!(view.count(), 8);
    assert_eq!(*counts.lock(), vec![3, 5, 8]);
}

#[derive(Debug, Clone)]
struct Bin {
    items: Arc<ObservableVec<&'static str>>,
    sealed: Arc<AtomicBool>,
}

#[test]
fn test_failed_rebuild_keeps_previous_shaping() {
    let sealed = Arc::new(AtomicBool::new(false));
    let bins = ObservableVec::shared(vec![Bin {
        items: ObservableVec::shared(vec!["b", "a"]),
        sealed: sealed.clone(),
    }]);
    let binding = ItemsBinding::accessor("Items", |bin: &Bin| {
        (!bin.sealed.load(Ordering::SeqCst)).then(|| bin.items.clone() as SharedSource<&'static str>)
    });
    let view = GroupedView::new(bins, binding, ViewShaping::new()).unwrap();

    sealed.store(true, Ordering::SeqCst);
    let err = view.set_shaping(by_title()).unwrap_err();

    assert!(matches!(err, ViewError::UnresolvedGroupItems { .. }));
    assert!(view.shaping().is_plain());
    assert_eq!(view.groups()[0].kind(), GroupViewKind::Plain);
    assert_eq!(view.items(), vec!["b", "a"]);
}

// -----------------------------------------------------------------------------
// Live shaping across groups
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct Task {
    title: &'static str,
    priority: AtomicI64,
}

#[derive(Debug, Clone)]
struct TaskRef(Arc<Task>);

impl PartialEq for TaskRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn task(title: &'static str, priority: i64) -> TaskRef {
    TaskRef(Arc::new(Task {
        title,
        priority: AtomicI64::new(priority),
    }))
}

#[derive(Debug, Clone)]
struct Project {
    tasks: Arc<ObservableVec<TaskRef>>,
}

#[test]
fn test_live_reposition_is_translated() {
    let head = task("head", 1);
    let low = task("low", 1);
    let mid = task("mid", 2);
    let high = task("high", 3);
    let projects = ObservableVec::shared(vec![
        Project {
            tasks: ObservableVec::shared(vec![head]),
        },
        Project {
            tasks: ObservableVec::shared(vec![high.clone(), low.clone(), mid.clone()]),
        },
    ]);
    let binding = ItemsBinding::accessor("Tasks", |project: &Project| {
        Some(project.tasks.clone() as SharedSource<TaskRef>)
    });
    let shaping = ViewShaping::new()
        .sort(SortDescription::ascending("Priority"))
        .resolver(|task: &TaskRef, property: Option<&str>| match property {
            Some("Priority") => Value::from(task.0.priority.load(Ordering::SeqCst)),
            _ => Value::None,
        })
        .live_shaping(true);
    let view = GroupedView::new(projects, binding, shaping).unwrap();
    let titles = |view: &GroupedView<Project, TaskRef>| -> Vec<&'static str> {
        view.items().iter().map(|task| task.0.title).collect()
    };
    assert_eq!(titles(&view), vec!["head", "low", "mid", "high"]);

    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    view.signals()
        .collection_changed
        .connect(move |change| log_clone.lock().push(change.clone()));

    low.0.priority.store(9, Ordering::SeqCst);
    view.notify_item_property_changed(&low, Some("Priority"));

    assert_eq!(titles(&view), vec!["head", "mid", "high", "low"]);
    assert_eq!(*log.lock(), vec![CollectionChange::moved(1, 3, low)]);
}
