//! Lock primitives for the bounded queue.
//!
//! Under `--cfg loom` the queue's monitor is built from loom's model-checked
//! `Mutex`/`Condvar` so every interleaving of the wait/notify protocol can be
//! explored.

#[cfg(loom)]
pub(crate) use loom::sync::{Condvar, Mutex, MutexGuard};

#[cfg(not(loom))]
pub(crate) use std::sync::{Condvar, Mutex, MutexGuard};
