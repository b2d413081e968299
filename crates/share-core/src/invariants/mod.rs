//! Invariant traits for the shared structures.
//!
//! - `stack`: NoLostElements, NoDuplicates, LIFO_Order
//! - `queue`: NoLostItems, FifoPerProducer, BoundedCapacity, ClosedRejectsEnqueue

pub mod queue;
pub mod stack;

pub use queue::{tag, untag, QueueProperties, QueuePropertyChecker};
pub use stack::{StackHistory, StackOperation, StackProperties, StackPropertyChecker};
