//! Deferred refresh guards.

use std::fmt;
use std::sync::Arc;

/// A view that can postpone its updates.
pub(crate) trait DeferTarget: Send + Sync {
    fn begin_defer(&self);

    /// Called when a guard is dropped. The target settles once the last
    /// outstanding guard is gone.
    fn end_defer(&self);
}

/// RAII guard returned by `defer_refresh()`.
///
/// While any guard for a view is alive, the view postpones its updates. When
/// the last guard is dropped the view catches up in one step and emits a
/// single `Reset`. Guards nest.
///
/// # Example
///
/// ```
/// use horizon_collections::view::{FlatView, ObservableVec, ViewShaping};
///
/// let source = ObservableVec::shared(vec![1, 2]);
/// let view = FlatView::new(source.clone(), ViewShaping::new()).unwrap();
/// {
///     let _defer = view.defer_refresh();
///     source.push(3);
///     source.push(4);
///     assert_eq!(view.count(), 2);
/// }
/// assert_eq!(view.count(), 4);
/// ```
#[must_use = "the refresh resumes as soon as the guard is dropped"]
pub struct DeferRefresh {
    target: Arc<dyn DeferTarget>,
}

impl DeferRefresh {
    pub(crate) fn new(target: Arc<dyn DeferTarget>) -> Self {
        target.begin_defer();
        Self { target }
    }
}

impl Drop for DeferRefresh {
    fn drop(&mut self) {
        self.target.end_defer();
    }
}

impl fmt::Debug for DeferRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferRefresh").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        depth: Mutex<usize>,
        settled: Mutex<usize>,
    }

    impl DeferTarget for Recorder {
        fn begin_defer(&self) {
            *self.depth.lock() += 1;
        }

        fn end_defer(&self) {
            let mut depth = self.depth.lock();
            *depth -= 1;
            if *depth == 0 {
                *self.settled.lock() += 1;
            }
        }
    }

    #[test]
    fn test_nested_guards_settle_once() {
        let recorder = Arc::new(Recorder::default());
        let outer = DeferRefresh::new(recorder.clone());
        let inner = DeferRefresh::new(recorder.clone());
        drop(inner);
        assert_eq!(*recorder.settled.lock(), 0);
        drop(outer);
        assert_eq!(*recorder.settled.lock(), 1);
    }
}
