// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ordered container: items tagged with an insertion age, kept sorted by a
//! replaceable comparator.
//!
//! Single-threaded; `TaskQueue` supplies the locking. No operation here
//! blocks — "nothing eligible" is `None`, and the queue layer turns that
//! into a condvar wait.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as MemOrder};

/// Next insertion age. Process-wide, so items pushed to different queues
/// still carry one total insertion order.
static NEXT_AGE: AtomicU64 = AtomicU64::new(0);

/// A buffered unit of work: the payload plus its insertion sequence number.
#[derive(Debug, Clone)]
pub struct Item<T> {
    /// Monotonically increasing insertion sequence number, assigned at push.
    pub age: u64,
    pub payload: T,
}

/// Replaceable total order over buffered items.
pub type Comparator<T> = Box<dyn Fn(&Item<T>, &Item<T>) -> Ordering + Send>;

/// Active comparator with the FIFO tie-break appended: equal-ranked items
/// stay in insertion order.
fn rank<T>(cmp: &Comparator<T>, a: &Item<T>, b: &Item<T>) -> Ordering {
    cmp(a, b).then(a.age.cmp(&b.age))
}

/// In-memory priority container. Invariant: between any two public
/// operations the sequence is sorted ascending by the active comparator,
/// ties broken by age.
pub struct OrderedContainer<T> {
    items: Vec<Item<T>>,
    cmp: Comparator<T>,
}

impl<T> OrderedContainer<T> {
    /// Empty container ordered by age ascending (pure FIFO).
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cmp: Box::new(|a, b| a.age.cmp(&b.age)),
        }
    }

    /// Insert `payload` under the next insertion age, keeping the sequence
    /// sorted. A new item lands after anything it ties with.
    pub fn push(&mut self, payload: T) {
        let item = Item {
            age: NEXT_AGE.fetch_add(1, MemOrder::Relaxed),
            payload,
        };
        let cmp = &self.cmp;
        let idx = self
            .items
            .partition_point(|held| rank(cmp, held, &item) != Ordering::Greater);
        self.items.insert(idx, item);
    }

    /// Remove and return the first item, in priority order, that satisfies
    /// `picky`. Ineligible items keep their relative order. `None` means
    /// nothing is eligible right now.
    pub fn pop_where<F: Fn(&T) -> bool>(&mut self, picky: F) -> Option<Item<T>> {
        let idx = self.items.iter().position(|i| picky(&i.payload))?;
        Some(self.items.remove(idx))
    }

    /// Non-removing: does any buffered item satisfy `pred`?
    pub fn exists<F: Fn(&T) -> bool>(&self, pred: F) -> bool {
        self.items.iter().any(|i| pred(&i.payload))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discard all contents.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Install a new comparator and re-sort the current contents under it.
    /// Subsequent pushes and pops use the new order.
    pub fn set_comparator(&mut self, cmp: Comparator<T>) {
        self.cmp = cmp;
        self.resort();
    }

    /// Remove everything, highest priority first. Ages travel with the
    /// items so `restore` can put them back where they were.
    pub fn drain_all(&mut self) -> Vec<Item<T>> {
        std::mem::take(&mut self.items)
    }

    /// Reinsert previously drained items, keeping their original ages.
    pub fn restore(&mut self, items: Vec<Item<T>>) {
        self.items.extend(items);
        self.resort();
    }

    fn resort(&mut self) {
        let cmp = &self.cmp;
        self.items.sort_by(|a, b| rank(cmp, a, b));
    }
}

impl<T> Default for OrderedContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(c: &mut OrderedContainer<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(item) = c.pop_where(|_| true) {
            out.push(item.payload);
        }
        out
    }

    #[test]
    fn default_order_is_fifo() {
        let mut c = OrderedContainer::new();
        for x in [10, 20, 30] {
            c.push(x);
        }
        assert_eq!(payloads(&mut c), vec![10, 20, 30]);
    }

    #[test]
    fn comparator_orders_pops() {
        let mut c = OrderedContainer::new();
        for x in [5, 1, 4, 2] {
            c.push(x);
        }
        c.set_comparator(Box::new(|a, b| a.payload.cmp(&b.payload)));
        assert_eq!(payloads(&mut c), vec![1, 2, 4, 5]);
    }

    #[test]
    fn push_respects_active_comparator() {
        let mut c: OrderedContainer<i32> = OrderedContainer::new();
        c.set_comparator(Box::new(|a, b| a.payload.cmp(&b.payload)));
        for x in [3, 1, 2] {
            c.push(x);
        }
        assert_eq!(payloads(&mut c), vec![1, 2, 3]);
    }

    #[test]
    fn equal_rank_stays_fifo() {
        let mut c = OrderedContainer::new();
        // Rank everything equal; only the age tie-break is left.
        c.set_comparator(Box::new(|_, _| Ordering::Equal));
        for x in [7, 8, 9] {
            c.push(x);
        }
        assert_eq!(payloads(&mut c), vec![7, 8, 9]);
    }

    #[test]
    fn pop_where_skips_ineligible() {
        let mut c = OrderedContainer::new();
        for x in [1, 2, 3, 4, 5] {
            c.push(x);
        }
        let got = c.pop_where(|x| x % 2 == 0).unwrap();
        assert_eq!(got.payload, 2);
        // Remainder keeps its relative order.
        assert_eq!(payloads(&mut c), vec![1, 3, 4, 5]);
    }

    #[test]
    fn pop_where_none_when_nothing_eligible() {
        let mut c = OrderedContainer::new();
        c.push(1);
        assert!(c.pop_where(|x| *x > 10).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn exists_is_non_removing() {
        let mut c = OrderedContainer::new();
        c.push(4);
        assert!(c.exists(|x| *x == 4));
        assert!(!c.exists(|x| *x == 5));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn clear_discards_everything() {
        let mut c = OrderedContainer::new();
        c.push(1);
        c.push(2);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn drain_and_restore_round_trip() {
        let mut c = OrderedContainer::new();
        for x in [1, 2, 3] {
            c.push(x);
        }
        let drained = c.drain_all();
        assert!(c.is_empty());
        assert_eq!(drained.len(), 3);
        c.restore(drained);
        assert_eq!(payloads(&mut c), vec![1, 2, 3]);
    }

    #[test]
    fn ages_are_strictly_increasing() {
        let mut c = OrderedContainer::new();
        c.push(1);
        c.push(2);
        let first = c.pop_where(|_| true).unwrap();
        let second = c.pop_where(|_| true).unwrap();
        assert!(first.age < second.age);
    }
}
