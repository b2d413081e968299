//! Mutex-guarded stack, the blocking baseline for throughput comparisons.
//!
//! Every operation takes the same lock, so pushes and pops are serialized.
//! The operation counter lives under the lock as well.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::stack::ConcurrentStack;

/// A stack where every operation holds one mutex.
pub struct LockedStack<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    items: Vec<T>,
    operations: u64,
}

impl<T> LockedStack<T> {
    /// Create a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: Vec::new(),
                operations: 0,
            }),
        }
    }

    // A panic while holding the lock cannot leave `Inner` half-updated:
    // each operation mutates it with a single call.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, value: T) {
        let mut inner = self.lock();
        inner.items.push(value);
        inner.operations += 1;
    }

    pub fn pop(&self) -> Option<T> {
        let mut inner = self.lock();
        inner.operations += 1;
        inner.items.pop()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Completed push/pop calls, empty pops included.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.lock().operations
    }

    /// Values currently in the stack, top to bottom.
    pub fn contents(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().items.iter().rev().cloned().collect()
    }
}

impl<T> Default for LockedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> ConcurrentStack<T> for LockedStack<T> {
    fn name(&self) -> &'static str {
        "locked"
    }

    fn push(&self, value: T) {
        LockedStack::push(self, value);
    }

    fn pop(&self) -> Option<T> {
        LockedStack::pop(self)
    }

    fn size(&self) -> u64 {
        LockedStack::size(self)
    }

    fn is_empty(&self) -> bool {
        LockedStack::is_empty(self)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_lifo_and_counter() {
        let stack = LockedStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.contents(), vec![3, 2, 1]);

        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);

        assert_eq!(stack.size(), 7);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_usable_through_trait_object() {
        let stack: Box<dyn ConcurrentStack<u32>> = Box::new(LockedStack::new());
        stack.push(9);
        assert_eq!(stack.name(), "locked");
        assert_eq!(stack.pop(), Some(9));
        assert_eq!(stack.size(), 2);
    }
}
