// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cooperative cancellation handle for consumers parked in `pop_with`.
//!
//! A `CancelToken` is a cheap cloneable handle to one shared set-once
//! flag: clone it across the consumer and whoever retires it, cancel
//! from either side. A parked consumer observes the flag on entry and on
//! every wake; nothing is preempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag handed to `TaskQueue::pop_with`. Clones
/// observe and set the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop waiting for work.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
