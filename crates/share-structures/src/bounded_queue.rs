//! Bounded blocking queue with backpressure and graceful shutdown.
//!
//! # States
//!
//! ```text
//! Open ──terminate()──> Terminating ──last item dequeued──> Drained
//!   │                                                          ▲
//!   └──────────terminate() while empty─────────────────────────┘
//! ```
//!
//! # Monitor
//!
//! One mutex guards the items and the termination flag. Producers wait on
//! `not_full`, consumers on `not_empty`. Every waiter re-checks its
//! predicate in a loop after each wake-up, so spurious and broadcast
//! wake-ups are harmless. Every state change notifies all waiters on the
//! side whose predicate it may have satisfied.

use std::collections::VecDeque;
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{CapacityError, Closed, TryDequeueError, TryEnqueueError};
use crate::sync::{Condvar, Mutex, MutexGuard};

/// Lifecycle of a [`BoundedBlockingQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting enqueues.
    Open,
    /// Terminated; remaining items can still be dequeued.
    Terminating,
    /// Terminated and empty. Terminal.
    Drained,
}

/// FIFO queue with a fixed capacity shared by producers and consumers.
///
/// `enqueue` blocks while the queue is full, `dequeue` blocks while it is
/// empty. `terminate` is the producer side's end-of-input signal: later
/// enqueues are rejected and consumers receive `None` once the remaining
/// items are drained.
pub struct BoundedBlockingQueue<T> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
    /// Producers waiting for a free slot
    not_full: Condvar,
    /// Consumers waiting for an item or termination
    not_empty: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    terminated: bool,
}

impl<T> Inner<T> {
    fn state(&self) -> QueueState {
        match (self.terminated, self.items.is_empty()) {
            (false, _) => QueueState::Open,
            (true, false) => QueueState::Terminating,
            (true, true) => QueueState::Drained,
        }
    }
}

impl<T> BoundedBlockingQueue<T> {
    /// Create an open queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError);
        }

        Ok(Self {
            capacity,
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                terminated: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    // Every critical section leaves `Inner` consistent before anything that
    // can panic, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, cond: &Condvar, guard: MutexGuard<'a, Inner<T>>) -> MutexGuard<'a, Inner<T>> {
        cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until notified or `deadline` passes. Returns `None` on timeout.
    ///
    /// A `None` deadline (timeout past what `Instant` can represent) waits
    /// without a limit.
    fn wait_until<'a>(
        &self,
        cond: &Condvar,
        guard: MutexGuard<'a, Inner<T>>,
        deadline: Option<Instant>,
    ) -> Option<MutexGuard<'a, Inner<T>>> {
        let Some(deadline) = deadline else {
            return Some(self.wait(cond, guard));
        };
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        let (guard, _) = cond
            .wait_timeout(guard, deadline - now)
            .unwrap_or_else(PoisonError::into_inner);
        Some(guard)
    }

    fn push_back(&self, mut inner: MutexGuard<'_, Inner<T>>, value: T) {
        debug_assert!(inner.items.len() < self.capacity, "Queue over capacity");
        inner.items.push_back(value);
        drop(inner);
        self.not_empty.notify_all();
    }

    fn pop_front(&self, mut inner: MutexGuard<'_, Inner<T>>) -> Option<T> {
        let value = inner.items.pop_front()?;
        if inner.terminated && inner.items.is_empty() {
            debug!("queue drained");
        }
        drop(inner);
        self.not_full.notify_all();
        Some(value)
    }

    /// Append `value`, blocking while the queue is full.
    ///
    /// Returns the value inside [`Closed`] if the queue is terminated
    /// before a slot frees up. Never blocks past termination.
    pub fn enqueue(&self, value: T) -> Result<(), Closed<T>> {
        let mut inner = self.lock();
        while inner.items.len() == self.capacity && !inner.terminated {
            inner = self.wait(&self.not_full, inner);
        }

        if inner.terminated {
            trace!("enqueue rejected: queue terminated");
            return Err(Closed(value));
        }

        self.push_back(inner, value);
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is terminated and empty, on this and
    /// every later call.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.lock();
        while inner.items.is_empty() && !inner.terminated {
            inner = self.wait(&self.not_empty, inner);
        }

        self.pop_front(inner)
    }

    /// Stop accepting items and wake every blocked producer and consumer.
    ///
    /// Idempotent. Items already queued stay available to `dequeue`.
    pub fn terminate(&self) {
        let mut inner = self.lock();
        if inner.terminated {
            return;
        }
        inner.terminated = true;
        debug!(remaining = inner.items.len(), "queue terminated");
        drop(inner);

        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Append `value` only if a slot is free right now.
    pub fn try_enqueue(&self, value: T) -> Result<(), TryEnqueueError<T>> {
        let inner = self.lock();
        if inner.terminated {
            return Err(TryEnqueueError::Closed(value));
        }
        if inner.items.len() == self.capacity {
            return Err(TryEnqueueError::Full(value));
        }

        self.push_back(inner, value);
        Ok(())
    }

    /// Remove the oldest item only if one is queued right now.
    pub fn try_dequeue(&self) -> Result<T, TryDequeueError> {
        let inner = self.lock();
        let terminated = inner.terminated;
        self.pop_front(inner).ok_or(if terminated {
            TryDequeueError::Drained
        } else {
            TryDequeueError::Empty
        })
    }

    /// Like [`enqueue`](Self::enqueue), but gives up after `timeout`.
    ///
    /// A queue still full at the deadline yields [`TryEnqueueError::Full`].
    pub fn enqueue_timeout(&self, value: T, timeout: Duration) -> Result<(), TryEnqueueError<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.lock();
        while inner.items.len() == self.capacity && !inner.terminated {
            inner = match self.wait_until(&self.not_full, inner, deadline) {
                Some(guard) => guard,
                None => return Err(TryEnqueueError::Full(value)),
            };
        }

        if inner.terminated {
            trace!("enqueue rejected: queue terminated");
            return Err(TryEnqueueError::Closed(value));
        }

        self.push_back(inner, value);
        Ok(())
    }

    /// Like [`dequeue`](Self::dequeue), but gives up after `timeout`.
    ///
    /// An open queue still empty at the deadline yields
    /// [`TryDequeueError::Empty`]; a drained one yields
    /// [`TryDequeueError::Drained`] immediately.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Result<T, TryDequeueError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.lock();
        while inner.items.is_empty() && !inner.terminated {
            inner = match self.wait_until(&self.not_empty, inner, deadline) {
                Some(guard) => guard,
                None => return Err(TryDequeueError::Empty),
            };
        }

        self.pop_front(inner).ok_or(TryDequeueError::Drained)
    }

    /// Fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items queued at this instant.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Whether `terminate` has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.lock().state()
    }

    /// Take every queued item in order, leaving the queue empty.
    ///
    /// Does not terminate the queue; producers blocked on a full queue are
    /// woken.
    pub fn drain(&self) -> Vec<T> {
        let mut inner = self.lock();
        let items: Vec<T> = inner.items.drain(..).collect();
        drop(inner);
        if !items.is_empty() {
            self.not_full.notify_all();
        }
        items
    }
}

impl<T> std::fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.capacity)
            .field("len", &inner.items.len())
            .field("state", &inner.state())
            .finish()
    }
}
