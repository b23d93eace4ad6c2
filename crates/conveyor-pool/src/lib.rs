// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Fixed worker pool over `conveyor-queue`.
//!
//! N consumer threads pop from one shared task queue and run a handler on
//! each item. A panicking job is logged and isolated — its worker keeps
//! serving. Shutdown is the queue's cooperative protocol: cancel the
//! shared token, destroy the queue to unpark waiting workers, join.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use conveyor_queue::{CancelToken, Comparator, TaskQueue};

/// Fixed set of consumer threads draining one shared queue.
pub struct Pool<T> {
    queue: Arc<TaskQueue<T>>,
    stop: CancelToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
    down: AtomicBool,
}

impl<T: Send + 'static> Pool<T> {
    /// Start `n` workers running `handler` on each submitted item.
    ///
    /// If `n` is 0, defaults to the number of available CPU cores.
    pub fn new<F>(n: usize, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let size = if n == 0 {
            thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            n
        };

        let queue = Arc::new(TaskQueue::new());
        let stop = CancelToken::new();
        let handler = Arc::new(handler);

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let queue = queue.clone();
            let stop = stop.clone();
            let handler = handler.clone();
            workers.push(
                thread::Builder::new()
                    .name(format!("conveyor-worker-{}", id))
                    .spawn(move || worker_loop(id, &queue, &stop, handler.as_ref()))
                    .expect("failed to spawn worker thread"),
            );
        }

        Self {
            queue,
            stop,
            workers: Mutex::new(workers),
            size,
            down: AtomicBool::new(false),
        }
    }
}

impl<T> Pool<T> {
    /// Hand an item to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool is shutting down (the queue's fatal
    /// push-during-destroy fault).
    pub fn submit(&self, task: T) {
        self.queue.push(task);
    }

    /// Items submitted but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Block until every submitted item has been run and all workers are
    /// parked waiting for more.
    pub fn wait_idle(&self) {
        self.queue.wait_until_idle(self.size);
    }

    /// Reprioritize pending work. Running jobs are unaffected.
    pub fn set_order(&self, cmp: Comparator<T>) {
        self.queue.set_order(cmp);
    }

    /// Stop all workers and wait for them to exit. Running jobs finish
    /// first; pending items stay in the queue. Idempotent.
    pub fn shutdown(&self) {
        if self.down.swap(true, Ordering::AcqRel) {
            return;
        }
        log::debug!("pool: shutting down {} worker(s)", self.size);
        self.stop.cancel();
        // Unpark workers waiting for an item; busy workers observe the
        // token on their next pop.
        self.queue.destroy();
        let mut workers = self.workers.lock().unwrap();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        if !self.down.load(Ordering::Acquire) {
            self.shutdown();
        }
    }
}

/// Worker main loop: pop until cancelled, isolating handler panics.
fn worker_loop<T, F>(id: usize, queue: &TaskQueue<T>, stop: &CancelToken, handler: &F)
where
    F: Fn(T),
{
    log::debug!("worker {} up", id);
    while let Ok(task) = queue.pop_with(|_| true, stop) {
        if catch_unwind(AssertUnwindSafe(|| handler(task))).is_err() {
            log::error!("worker {}: job panicked, continuing", id);
        }
    }
    log::debug!("worker {} down", id);
}
