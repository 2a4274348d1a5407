//! Current-item tracking for views.
//!
//! Every view has a current position (keyboard focus in a list control).
//! `Currency` keeps that position pointing at the same item while the view
//! changes underneath it.

use super::change::CollectionChange;

#[derive(Debug, Clone)]
pub(crate) struct Currency<T> {
    position: Option<usize>,
    item: Option<T>,
}

impl<T: Clone + PartialEq> Currency<T> {
    /// Current on the first item, or nothing for an empty view.
    pub fn new(items: &[T]) -> Self {
        Self {
            position: if items.is_empty() { None } else { Some(0) },
            item: items.first().cloned(),
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    /// Set the position outright. Out-of-range positions clear currency.
    pub fn set(&mut self, position: Option<usize>, items: &[T]) {
        self.position = position.filter(|&index| index < items.len());
        self.sync(items);
    }

    /// Follow the current item through `change`, which `items` already reflects.
    pub fn apply(&mut self, change: &CollectionChange<T>, items: &[T]) {
        let Some(position) = self.position else {
            if !items.is_empty() && items.len() == change_growth(change) {
                self.position = Some(0);
                self.sync(items);
            }
            return;
        };

        self.position = match change {
            CollectionChange::Added { index, items: added } => {
                if position >= *index {
                    Some(position + added.len())
                } else {
                    Some(position)
                }
            }
            CollectionChange::Removed { index, items: removed } => {
                let end = index + removed.len();
                if position >= end {
                    Some(position - removed.len())
                } else if position >= *index {
                    // the current item went away: take whatever now sits there
                    if items.is_empty() {
                        None
                    } else {
                        Some((*index).min(items.len() - 1))
                    }
                } else {
                    Some(position)
                }
            }
            CollectionChange::Replaced { .. } => Some(position),
            CollectionChange::Moved {
                old_index,
                new_index,
                items: moved,
            } => {
                let count = moved.len();
                if (*old_index..old_index + count).contains(&position) {
                    Some(new_index + (position - old_index))
                } else {
                    let shifted = if position >= old_index + count {
                        position - count
                    } else {
                        position
                    };
                    if shifted >= *new_index {
                        Some(shifted + count)
                    } else {
                        Some(shifted)
                    }
                }
            }
            CollectionChange::Reset => return self.restore(items),
        };
        self.sync(items);
    }

    /// Re-find the current item after a reset, or fall back to the first item.
    pub fn restore(&mut self, items: &[T]) {
        let previous = self
            .item
            .as_ref()
            .and_then(|item| items.iter().position(|candidate| candidate == item));
        self.position = match previous {
            Some(index) => Some(index),
            None if items.is_empty() => None,
            None => Some(0),
        };
        self.sync(items);
    }

    fn sync(&mut self, items: &[T]) {
        if self.position.is_some_and(|index| index >= items.len()) {
            self.position = None;
        }
        self.item = self.position.and_then(|index| items.get(index).cloned());
    }
}

/// Items an `Added` change brought in, zero for anything else.
fn change_growth<T>(change: &CollectionChange<T>) -> usize {
    match change {
        CollectionChange::Added { items, .. } => items.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_first_item() {
        assert_eq!(Currency::new(&[4, 5]).position(), Some(0));
        assert_eq!(Currency::<i32>::new(&[]).position(), None);
    }

    #[test]
    fn test_insert_before_current_shifts() {
        let mut currency = Currency::new(&[1, 2, 3]);
        currency.set(Some(1), &[1, 2, 3]);
        currency.apply(&CollectionChange::added(0, 0), &[0, 1, 2, 3]);
        assert_eq!(currency.position(), Some(2));
        assert_eq!(currency.item(), Some(&2));
    }

    #[test]
    fn test_removing_current_takes_next_item() {
        let mut currency = Currency::new(&[1, 2, 3]);
        currency.set(Some(2), &[1, 2, 3]);
        currency.apply(&CollectionChange::removed(2, 3), &[1, 2]);
        assert_eq!(currency.position(), Some(1));
        assert_eq!(currency.item(), Some(&2));

        currency.apply(&CollectionChange::removed(0, 1), &[2]);
        assert_eq!(currency.position(), Some(0));
    }

    #[test]
    fn test_move_follows_item() {
        let mut currency = Currency::new(&['a', 'b', 'c']);
        currency.apply(&CollectionChange::moved(0, 2, 'a'), &['b', 'c', 'a']);
        assert_eq!(currency.position(), Some(2));

        currency.set(Some(0), &['b', 'c', 'a']);
        currency.apply(&CollectionChange::moved(2, 0, 'a'), &['a', 'b', 'c']);
        assert_eq!(currency.position(), Some(1));
        assert_eq!(currency.item(), Some(&'b'));
    }

    #[test]
    fn test_reset_restores_item() {
        let mut currency = Currency::new(&[1, 2, 3]);
        currency.set(Some(1), &[1, 2, 3]);
        currency.apply(&CollectionChange::Reset, &[3, 2, 1]);
        assert_eq!(currency.position(), Some(1));

        currency.apply(&CollectionChange::Reset, &[5, 6]);
        assert_eq!(currency.position(), Some(0));
        assert_eq!(currency.item(), Some(&5));
    }

    #[test]
    fn test_first_add_to_empty_view_becomes_current() {
        let mut currency = Currency::<i32>::new(&[]);
        currency.apply(&CollectionChange::added(0, 7), &[7]);
        assert_eq!(currency.position(), Some(0));
    }
}
