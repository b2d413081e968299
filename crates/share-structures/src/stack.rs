//! Common surface of the stack implementations.

/// A stack shared by reference between threads.
///
/// Implemented by [`LockFreeStack`](crate::LockFreeStack) and
/// [`LockedStack`](crate::LockedStack) so stress and throughput drivers can
/// run the same workload against either one.
pub trait ConcurrentStack<T>: Send + Sync {
    /// Short label used in reports.
    fn name(&self) -> &'static str;

    /// Push a value on top.
    fn push(&self, value: T);

    /// Pop the top value, `None` when empty.
    fn pop(&self) -> Option<T>;

    /// Completed push/pop calls so far, empty pops included.
    fn size(&self) -> u64;

    /// Whether the stack held no values at the instant of the call.
    fn is_empty(&self) -> bool;
}
