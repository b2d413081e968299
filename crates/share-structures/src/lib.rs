//! # share-structures
//!
//! Concurrent data-sharing primitives.
//!
//! - `LockFreeStack`: Treiber stack, single CAS retry loop, epoch-based
//!   node reclamation
//! - `LockedStack`: mutex-guarded baseline with the same surface
//! - `BoundedBlockingQueue`: monitor-based FIFO with backpressure and
//!   graceful termination
//!
//! The stacks never block. The queue's `enqueue` and `dequeue` are the only
//! suspension points, and they release the queue lock while waiting.
//!
//! # Loom
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test -p share-structures --release
//! ```

pub mod bounded_queue;
pub mod error;
pub mod locked_stack;
pub mod lockfree_stack;
pub mod stack;
mod sync;

pub use bounded_queue::{BoundedBlockingQueue, QueueState};
pub use error::{CapacityError, Closed, TryDequeueError, TryEnqueueError};
pub use locked_stack::LockedStack;
pub use lockfree_stack::LockFreeStack;
pub use stack::ConcurrentStack;
