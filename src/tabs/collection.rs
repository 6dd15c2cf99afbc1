//! Ordered collection that reports every mutation.
//!
//! Each mutating call raises one fine-grained notification (item added,
//! removed, modified, moved, range added, range removed, cleared) followed by one
//! coarse "collection modified" notification describing the same change.
//! Storage is locked only for the duration of a single call, and listeners run
//! after the lock is released so they may read the list again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<T> {
    Added { index: usize, item: T },
    Removed { index: usize, item: T },
    Modified { index: usize, old: T, new: T },
    Moved { from: usize, to: usize, item: T },
    RangeAdded { index: usize, items: Vec<T> },
    RangeRemoved { items: Vec<T> },
    Cleared,
}

type Listener<T> = Arc<dyn Fn(&ListChange<T>) + Send + Sync>;

pub struct ObservableList<T> {
    items: Mutex<Vec<T>>,
    item_listeners: Mutex<Vec<Listener<T>>>,
    collection_listeners: Mutex<Vec<Listener<T>>>,
    suppressed: AtomicBool,
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            item_listeners: Mutex::new(Vec::new()),
            collection_listeners: Mutex::new(Vec::new()),
            suppressed: AtomicBool::new(false),
        }
    }
}

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + PartialEq> ObservableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the fine-grained notifications.
    pub fn on_item_changed<F>(&self, listener: F)
    where
        F: Fn(&ListChange<T>) + Send + Sync + 'static,
    {
        lock(&self.item_listeners).push(Arc::new(listener));
    }

    /// Registers a listener for the coarse "collection modified" notification.
    pub fn on_collection_modified<F>(&self, listener: F)
    where
        F: Fn(&ListChange<T>) + Send + Sync + 'static,
    {
        lock(&self.collection_listeners).push(Arc::new(listener));
    }

    pub fn suppress_events(&self) {
        self.suppressed.store(true, Ordering::Release);
    }

    pub fn resume_events(&self) {
        self.suppressed.store(false, Ordering::Release);
    }

    pub fn events_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::Acquire)
    }

    fn notify(&self, change: ListChange<T>) {
        if self.events_suppressed() {
            return;
        }
        let items: Vec<Listener<T>> = lock(&self.item_listeners).clone();
        for listener in items {
            listener(&change);
        }
        let collection: Vec<Listener<T>> = lock(&self.collection_listeners).clone();
        for listener in collection {
            listener(&change);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        lock(&self.items).get(index).cloned()
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        lock(&self.items).iter().position(|candidate| candidate == item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Copy of the current contents in order.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.items).clone()
    }

    pub fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        lock(&self.items).iter().find(|item| predicate(item)).cloned()
    }

    pub fn push(&self, item: T) -> usize {
        let index = {
            let mut items = lock(&self.items);
            items.push(item.clone());
            items.len() - 1
        };
        self.notify(ListChange::Added { index, item });
        index
    }

    /// Inserts at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: T) -> usize {
        let index = {
            let mut items = lock(&self.items);
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.notify(ListChange::Added { index, item });
        index
    }

    /// Appends every item with a single range notification.
    pub fn extend(&self, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let index = {
            let mut items = lock(&self.items);
            let index = items.len();
            items.extend(new_items.iter().cloned());
            index
        };
        self.notify(ListChange::RangeAdded {
            index,
            items: new_items,
        });
    }

    pub fn insert_range(&self, index: usize, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let index = {
            let mut items = lock(&self.items);
            let index = index.min(items.len());
            items.splice(index..index, new_items.iter().cloned());
            index
        };
        self.notify(ListChange::RangeAdded {
            index,
            items: new_items,
        });
    }

    pub fn remove(&self, item: &T) -> bool {
        let removed = {
            let mut items = lock(&self.items);
            items
                .iter()
                .position(|candidate| candidate == item)
                .map(|index| (index, items.remove(index)))
        };
        match removed {
            Some((index, item)) => {
                self.notify(ListChange::Removed { index, item });
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> Option<T> {
        let item = {
            let mut items = lock(&self.items);
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.notify(ListChange::Removed {
            index,
            item: item.clone(),
        });
        Some(item)
    }

    /// Removes every matching item. Raises one range notification when
    /// anything was removed and nothing otherwise.
    pub fn remove_all<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        let removed: Vec<T> = {
            let mut items = lock(&self.items);
            let mut removed = Vec::new();
            items.retain(|item| {
                if predicate(item) {
                    removed.push(item.clone());
                    false
                } else {
                    true
                }
            });
            removed
        };
        let count = removed.len();
        if count > 0 {
            self.notify(ListChange::RangeRemoved { items: removed });
        }
        count
    }

    /// Removes each item with its own call. The sequence as a whole is not
    /// atomic; another thread may observe the list half way through.
    pub fn remove_range(&self, items: &[T]) -> usize {
        items.iter().filter(|item| self.remove(item)).count()
    }

    pub fn clear(&self) {
        lock(&self.items).clear();
        self.notify(ListChange::Cleared);
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let old = {
            let mut items = lock(&self.items);
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item.clone())
        };
        self.notify(ListChange::Modified {
            index,
            old: old.clone(),
            new: item,
        });
        Some(old)
    }

    /// Moves an item to `to`, clamped to the last slot, under one lock and
    /// with a single notification.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let moved = {
            let mut items = lock(&self.items);
            if from >= items.len() {
                return false;
            }
            let to = to.min(items.len() - 1);
            if from == to {
                return false;
            }
            let item = items.remove(from);
            items.insert(to, item.clone());
            (to, item)
        };
        let (to, item) = moved;
        self.notify(ListChange::Moved { from, to, item });
        true
    }
}
