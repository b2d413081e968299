//! Lock-free stack.
//!
//! # Algorithm
//!
//! Both operations read the head once, build a candidate head and try to
//! install it with a single compare-and-swap. A failed CAS means another
//! thread moved the head first: the attempt is discarded and the loop
//! starts again from a fresh read. Nothing is published until the CAS
//! succeeds.
//!
//! # Invariants
//!
//! | Property | Verified By |
//! |----------|-------------|
//! | NoLostElements | stress runs, unit tests |
//! | NoDuplicates | stress runs, unit tests |
//! | LIFO order (sequential) | unit tests, proptest model |
//! | No use-after-free | epoch-based reclamation |
//!
//! # Memory Safety
//!
//! A popped node may still be read by a concurrent `pop` that loaded the
//! same head before our CAS. Nodes are therefore never freed directly;
//! they are retired to crossbeam-epoch and destroyed once every thread that
//! was pinned at the time has unpinned. This also rules out the ABA
//! problem: an address cannot be reused while a guard could observe it.

use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use crossbeam_utils::Backoff;

use crate::stack::ConcurrentStack;

/// A lock-free Treiber stack.
///
/// Operations are linearizable and lock-free: a CAS only fails because
/// another operation succeeded, so the system as a whole always makes
/// progress.
pub struct LockFreeStack<T> {
    /// Pointer to top node
    head: Atomic<Node<T>>,
    /// Completed push/pop calls, empty pops included
    operations: AtomicU64,
}

/// Node in the stack.
///
/// The value is moved out by the popping thread before the node is
/// retired, so the node itself must not drop it.
struct Node<T> {
    value: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

impl<T> LockFreeStack<T> {
    /// Create a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
            operations: AtomicU64::new(0),
        }
    }

    /// Push a value onto the stack. Never blocks.
    pub fn push(&self, value: T) {
        let mut node = Owned::new(Node {
            value: ManuallyDrop::new(value),
            next: Atomic::null(),
        });

        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Relaxed, &guard);
            node.next.store(head, Ordering::Relaxed);

            match self.head.compare_exchange(
                head,
                node,
                Ordering::Release,
                Ordering::Relaxed,
                &guard,
            ) {
                Ok(_) => break,
                Err(e) => {
                    // Lost the race; take the node back and re-read.
                    node = e.new;
                    contention_pause(&backoff);
                }
            }
        }

        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    /// Pop the top value, or `None` if the stack is empty. Never blocks.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        let value = loop {
            let head = self.head.load(Ordering::Acquire, &guard);

            // Safety: the guard keeps any node reachable from head alive.
            let Some(head_ref) = (unsafe { head.as_ref() }) else {
                break None;
            };

            let next = head_ref.next.load(Ordering::Relaxed, &guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // Safety: the CAS unlinked head, so this thread is the only
                // one that will move the value out. Other threads may still
                // read `next`, which stays valid until the guard epoch ends.
                unsafe {
                    let value = ptr::read(&*head_ref.value);
                    guard.defer_destroy(head);
                    break Some(value);
                }
            }

            contention_pause(&backoff);
        };

        self.operations.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Check if the stack is empty at this instant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        self.head.load(Ordering::Acquire, &guard).is_null()
    }

    /// Number of push and pop calls completed so far.
    ///
    /// Monotonic operation counter for throughput measurement; it is not
    /// the number of stored values.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Values currently in the stack, top to bottom.
    ///
    /// Takes `&mut self` so no pop can move a value out while it is cloned.
    pub fn contents(&mut self) -> Vec<T>
    where
        T: Clone,
    {
        let guard = epoch::pin();
        let mut result = Vec::new();
        let mut current = self.head.load(Ordering::Acquire, &guard);

        // Safety: nodes reachable under the guard are not reclaimed.
        while let Some(node) = unsafe { current.as_ref() } {
            result.push((*node.value).clone());
            current = node.next.load(Ordering::Acquire, &guard);
        }

        result
    }
}

/// Short pause between CAS attempts to cut cache-line ping-pong.
#[inline]
fn contention_pause(backoff: &Backoff) {
    #[cfg(loom)]
    {
        let _ = backoff;
        loom::thread::yield_now();
    }

    #[cfg(not(loom))]
    backoff.spin();
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        // Safety: `&mut self` means no other thread can hold a reference.
        unsafe {
            let guard = epoch::unprotected();
            let mut current = self.head.load(Ordering::Relaxed, guard);

            while !current.is_null() {
                let mut node = current.into_owned();
                current = node.next.load(Ordering::Relaxed, guard);
                ManuallyDrop::drop(&mut node.value);
            }
        }
    }
}

// Safety: values move between threads through the head pointer only.
unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T: Send> ConcurrentStack<T> for LockFreeStack<T> {
    fn name(&self) -> &'static str {
        "lock-free"
    }

    fn push(&self, value: T) {
        LockFreeStack::push(self, value);
    }

    fn pop(&self) -> Option<T> {
        LockFreeStack::pop(self)
    }

    fn size(&self) -> u64 {
        LockFreeStack::size(self)
    }

    fn is_empty(&self) -> bool {
        LockFreeStack::is_empty(self)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_push_pop() {
        let stack = LockFreeStack::new();

        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_empty_pop_is_distinguishable() {
        let stack: LockFreeStack<Option<u32>> = LockFreeStack::new();
        assert_eq!(stack.pop(), None);

        stack.push(None);
        assert_eq!(stack.pop(), Some(None));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_size_counts_operations() {
        let stack = LockFreeStack::new();
        assert_eq!(stack.size(), 0);

        stack.push("a");
        stack.push("b");
        stack.pop();
        stack.pop();
        stack.pop();

        // Empty pops count too.
        assert_eq!(stack.size(), 5);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_contents_top_to_bottom() {
        let mut stack = LockFreeStack::new();
        for i in 1..=4 {
            stack.push(i);
        }
        assert_eq!(stack.contents(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_lifo_order() {
        let stack = LockFreeStack::new();

        for i in 1..=10 {
            stack.push(i);
        }

        for i in (1..=10).rev() {
            assert_eq!(stack.pop(), Some(i), "LIFO order violated");
        }
    }

    /// Counts drops so leaks and double drops both show up.
    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_values_dropped_exactly_once() {
        let drops = Arc::new(AtomicUsize::new(0));

        {
            let stack = LockFreeStack::new();
            for _ in 0..10 {
                stack.push(DropCounter(Arc::clone(&drops)));
            }
            for _ in 0..4 {
                drop(stack.pop());
            }
            assert_eq!(drops.load(Ordering::SeqCst), 4);
        }

        // Remaining six are dropped with the stack.
        assert_eq!(drops.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_concurrent_push_pop() {
        let stack = Arc::new(LockFreeStack::new());
        let mut push_handles = vec![];
        let mut pop_handles = vec![];

        for i in 0..4u64 {
            let stack = Arc::clone(&stack);
            push_handles.push(thread::spawn(move || {
                for j in 0..1000 {
                    stack.push(i * 10_000 + j);
                }
            }));
        }

        for _ in 0..4 {
            let stack = Arc::clone(&stack);
            pop_handles.push(thread::spawn(move || {
                let mut popped = Vec::new();
                for _ in 0..1000 {
                    if let Some(v) = stack.pop() {
                        popped.push(v);
                    }
                }
                popped
            }));
        }

        for handle in push_handles {
            handle.join().unwrap();
        }

        let mut all: Vec<u64> = pop_handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        while let Some(v) = stack.pop() {
            all.push(v);
        }

        all.sort_unstable();
        let mut expected: Vec<u64> = (0..4u64)
            .flat_map(|i| (0..1000).map(move |j| i * 10_000 + j))
            .collect();
        expected.sort_unstable();
        assert_eq!(all, expected, "values lost or duplicated");
    }
}
