// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Blocking, re-orderable, priority-aware task queue.
//!
//! Hands units of work between producer and consumer threads with
//! coordinated, race-free shutdown.
//!
//! Components:
//! - order — insertion-aged priority container under a replaceable comparator
//! - queue — mutex + two condvars: blocking push/pop, selective dequeue,
//!   barrier waits, snapshots, destroy/cancellation protocol
//! - cancel — cooperative per-consumer cancellation flag

pub mod cancel;
pub mod order;
pub mod queue;

pub use cancel::CancelToken;
pub use order::{Comparator, Item, OrderedContainer};
pub use queue::{Cancelled, TaskQueue};
