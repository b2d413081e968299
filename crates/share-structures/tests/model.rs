//! Sequential model equivalence: random operation sequences must behave
//! exactly like a `Vec` (stack) or `VecDeque` (queue).

#![cfg(not(loom))]

use std::collections::VecDeque;

use proptest::prelude::*;
use share_structures::{
    BoundedBlockingQueue, ConcurrentStack, LockFreeStack, LockedStack, TryDequeueError,
    TryEnqueueError,
};

#[derive(Debug, Clone)]
enum StackOp {
    Push(u16),
    Pop,
}

fn stack_op() -> impl Strategy<Value = StackOp> {
    prop_oneof![any::<u16>().prop_map(StackOp::Push), Just(StackOp::Pop)]
}

fn run_against_model(stack: &dyn ConcurrentStack<u16>, ops: &[StackOp]) -> Result<(), TestCaseError> {
    let mut model = Vec::new();
    for op in ops {
        match *op {
            StackOp::Push(v) => {
                stack.push(v);
                model.push(v);
            }
            StackOp::Pop => prop_assert_eq!(stack.pop(), model.pop()),
        }
    }
    prop_assert_eq!(stack.size(), ops.len() as u64);
    prop_assert_eq!(stack.is_empty(), model.is_empty());
    Ok(())
}

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue(u16),
    Dequeue,
    Terminate,
}

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => any::<u16>().prop_map(QueueOp::Enqueue),
        4 => Just(QueueOp::Dequeue),
        1 => Just(QueueOp::Terminate),
    ]
}

proptest! {
    #[test]
    fn lockfree_stack_matches_vec(ops in prop::collection::vec(stack_op(), 0..200)) {
        run_against_model(&LockFreeStack::new(), &ops)?;
    }

    #[test]
    fn locked_stack_matches_vec(ops in prop::collection::vec(stack_op(), 0..200)) {
        run_against_model(&LockedStack::new(), &ops)?;
    }

    #[test]
    fn queue_matches_vecdeque(
        capacity in 1usize..8,
        ops in prop::collection::vec(queue_op(), 0..200),
    ) {
        let queue = BoundedBlockingQueue::new(capacity).unwrap();
        let mut model = VecDeque::new();
        let mut terminated = false;

        for op in ops {
            match op {
                QueueOp::Enqueue(v) => {
                    let expected = if terminated {
                        Err(TryEnqueueError::Closed(v))
                    } else if model.len() == capacity {
                        Err(TryEnqueueError::Full(v))
                    } else {
                        model.push_back(v);
                        Ok(())
                    };
                    prop_assert_eq!(queue.try_enqueue(v), expected);
                }
                QueueOp::Dequeue => {
                    let expected = match model.pop_front() {
                        Some(v) => Ok(v),
                        None if terminated => Err(TryDequeueError::Drained),
                        None => Err(TryDequeueError::Empty),
                    };
                    prop_assert_eq!(queue.try_dequeue(), expected);
                }
                QueueOp::Terminate => {
                    queue.terminate();
                    terminated = true;
                }
            }
            prop_assert!(queue.len() <= capacity);
            prop_assert_eq!(queue.len(), model.len());
        }
    }
}
