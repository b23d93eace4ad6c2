// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Blocking task queue: one mutex, two condvars.
//!
//! Producers `push`; consumers `pop` (optionally with a picky predicate)
//! and block until a matching item exists or cancellation is signaled. A
//! coordinator may barrier-wait on consumer idleness, snapshot pending
//! work without losing it, or `destroy` to unblock and retire every
//! parked consumer.

use std::sync::{Condvar, Mutex};

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::order::{Comparator, OrderedContainer};

/// Returned to a `pop` caller whose wait was ended by `destroy` or its
/// cancel token rather than by an item. The one recoverable signal here;
/// callers use it to exit their work loop cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait for work was cancelled")]
pub struct Cancelled;

/// Everything the queue's single mutex guards.
struct Inner<T> {
    items: OrderedContainer<T>,
    /// Threads currently parked inside the pop wait loop. Updated only
    /// while holding the mutex.
    nwaiting: usize,
    /// True exactly during an in-progress `destroy` cycle. While true,
    /// `push` is a contract violation.
    releasing: bool,
}

/// Thread-safe blocking wrapper around `OrderedContainer`.
///
/// `item_available` is signaled whenever the container's contents change
/// in a way that might satisfy a blocked predicate, or when release
/// begins. `waiter_changed` is signaled whenever `nwaiting` changes and
/// after every successful extraction, so barrier waiters re-check.
pub struct TaskQueue<T> {
    inner: Mutex<Inner<T>>,
    item_available: Condvar,
    waiter_changed: Condvar,
}

impl<T> TaskQueue<T> {
    /// New empty queue: zero waiters, not releasing, FIFO order.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: OrderedContainer::new(),
                nwaiting: 0,
                releasing: false,
            }),
            item_available: Condvar::new(),
            waiter_changed: Condvar::new(),
        }
    }

    /// Insert an item and wake parked consumers.
    ///
    /// Wakes all of them: consumers filter with picky predicates, so any
    /// one of them might be the one this item satisfies.
    ///
    /// # Panics
    ///
    /// Panics if called while a `destroy` cycle is in progress. That is a
    /// violated single-producer/destroyer contract, not a recoverable
    /// condition.
    pub fn push(&self, payload: T) {
        let mut inner = self.inner.lock().unwrap();
        if inner.releasing {
            panic!("push on a task queue that is mid-destroy");
        }
        inner.items.push(payload);
        self.item_available.notify_all();
    }

    /// Block until any item is available, then remove and return it.
    pub fn pop(&self) -> Result<T, Cancelled> {
        self.pop_with(|_| true, &CancelToken::new())
    }

    /// Block until an item satisfying `picky` is available, then remove
    /// and return it.
    ///
    /// Yields `Err(Cancelled)` if the queue is mid-destroy on entry, or if
    /// `destroy` or `cancel` is observed while waiting. Cancellation is
    /// cooperative: a parked consumer sees it only when it wakes.
    pub fn pop_with<F>(&self, picky: F, cancel: &CancelToken) -> Result<T, Cancelled>
    where
        F: Fn(&T) -> bool,
    {
        let mut inner = self.inner.lock().unwrap();
        if inner.releasing {
            return Err(Cancelled);
        }
        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            // Eligibility and removal are one evaluation: a predicate that
            // reads external state may answer differently next time it is
            // asked, so it is never asked twice for the same decision.
            if let Some(item) = inner.items.pop_where(&picky) {
                self.item_available.notify_all();
                self.waiter_changed.notify_all();
                return Ok(item.payload);
            }
            inner.nwaiting += 1;
            self.waiter_changed.notify_all();
            inner = self.item_available.wait(inner).unwrap();
            inner.nwaiting -= 1;
            self.waiter_changed.notify_all();
            if inner.releasing {
                return Err(Cancelled);
            }
        }
    }

    /// Wake every parked consumer so it re-evaluates its picky predicate.
    /// State is unchanged; a no-op if nobody is waiting.
    ///
    /// Use after an external condition a predicate depends on has changed.
    pub fn broadcast(&self) {
        let _inner = self.inner.lock().unwrap();
        self.item_available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().items.is_empty()
    }

    /// Discard all buffered items. Waiters are not woken — there is
    /// nothing new for them to observe.
    pub fn clear(&self) {
        self.inner.lock().unwrap().items.clear();
    }

    /// Drain the queue in priority order, keeping `transform(x)` when it
    /// maps to `Some`. Returns the kept values in extraction order.
    /// Waiters are not woken.
    pub fn clear_saving<U, F>(&self, mut transform: F) -> Vec<U>
    where
        F: FnMut(T) -> Option<U>,
    {
        let mut inner = self.inner.lock().unwrap();
        let mut saved = Vec::new();
        while let Some(item) = inner.items.pop_where(|_| true) {
            if let Some(kept) = transform(item.payload) {
                saved.push(kept);
            }
        }
        saved
    }

    /// Unblock and retire every parked consumer, then leave the queue
    /// reusable. Buffered items are untouched.
    ///
    /// Sets `releasing`, wakes all waiters, and sleeps on the waiter-set
    /// condvar until the last of them has observed cancellation and left.
    /// Assumes no concurrent `push` races it; a violating `push` hits the
    /// fatal fault in `push`.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.releasing = true;
        log::debug!("destroy: unblocking {} waiter(s)", inner.nwaiting);
        while inner.nwaiting > 0 {
            self.item_available.notify_all();
            inner = self.waiter_changed.wait(inner).unwrap();
        }
        inner.releasing = false;
        log::debug!("destroy: complete, queue reusable");
    }

    /// Idle barrier: block until the queue is empty and at least `n`
    /// consumers are parked, simultaneously.
    pub fn wait_until_idle(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        while !(inner.items.is_empty() && inner.nwaiting >= n) {
            inner = self.waiter_changed.wait(inner).unwrap();
        }
    }

    /// Point-in-time view of pending work, taken once at least `n`
    /// consumers are parked.
    ///
    /// Drains the container (forcing an instantaneous empty state), waits
    /// until `n` consumers are parked, reinserts the drained items with
    /// their original ages, and returns clones of what was drained, in
    /// priority order. No item is lost.
    pub fn snapshot_when_waiting(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        let mut inner = self.inner.lock().unwrap();
        let drained = inner.items.drain_all();
        let view: Vec<T> = drained.iter().map(|i| i.payload.clone()).collect();
        while inner.nwaiting < n {
            inner = self.waiter_changed.wait(inner).unwrap();
        }
        let restored = !drained.is_empty();
        inner.items.restore(drained);
        if restored {
            self.item_available.notify_all();
        }
        view
    }

    /// Install a new comparator and re-sort pending work under it. Future
    /// pushes and pops use the new order.
    pub fn set_order(&self, cmp: Comparator<T>) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.set_comparator(cmp);
        log::trace!("set_order: re-sorted {} pending item(s)", inner.items.len());
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
