//! Bounded queue invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostItems | Every enqueued item was dequeued exactly once or is still queued |
//! | FifoPerProducer | Each consumer sees every producer's items in that producer's order |
//! | BoundedCapacity | Observed length never exceeded capacity |
//! | ClosedRejectsEnqueue | No enqueue succeeded after termination |
//!
//! Items carry their origin: the upper 32 bits are the producer id, the
//! lower 32 bits the producer-local sequence number (see [`tag`]).

use std::collections::HashMap;

use crate::counterexample::{Counterexample, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Build a tagged item from a producer id and its sequence number.
#[must_use]
pub fn tag(producer: u32, sequence: u32) -> u64 {
    (u64::from(producer) << 32) | u64::from(sequence)
}

/// Split a tagged item into `(producer, sequence)`.
#[must_use]
pub fn untag(item: u64) -> (u32, u32) {
    ((item >> 32) as u32, item as u32)
}

/// Recorded state of a queue run, taken after every worker has finished.
pub trait QueueProperties {
    /// Fixed capacity of the queue.
    fn capacity(&self) -> usize;

    /// Every item whose enqueue returned success.
    fn enqueued_items(&self) -> Vec<u64>;

    /// Items each consumer dequeued, in the order that consumer saw them.
    fn dequeued_by_consumer(&self) -> Vec<Vec<u64>>;

    /// Items left in the queue, front to back.
    fn current_contents(&self) -> Vec<u64>;

    /// Largest length any observer saw while the run was in progress.
    fn peak_len(&self) -> usize;

    /// Enqueues attempted after termination that were accepted anyway.
    fn accepted_after_termination(&self) -> u64;
}

/// Property checker for bounded queue runs.
pub struct QueuePropertyChecker<'a, T: QueueProperties> {
    queue: &'a T,
    seed: Option<u64>,
}

impl<'a, T: QueueProperties> QueuePropertyChecker<'a, T> {
    #[must_use]
    pub fn new(queue: &'a T) -> Self {
        Self { queue, seed: None }
    }

    /// Attach the run seed to counterexamples.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn check_no_lost_items(&self) -> PropertyResult {
        let mut balance: HashMap<u64, i64> = HashMap::new();
        for item in self.queue.enqueued_items() {
            *balance.entry(item).or_default() += 1;
        }
        let dequeued = self.queue.dequeued_by_consumer();
        for item in dequeued
            .iter()
            .flatten()
            .copied()
            .chain(self.queue.current_contents())
        {
            *balance.entry(item).or_default() -= 1;
        }

        let mut wrong: Vec<(u64, i64)> = balance.into_iter().filter(|&(_, n)| n != 0).collect();
        if wrong.is_empty() {
            return PropertyResult::pass("NoLostItems");
        }

        wrong.sort_unstable();
        let (item, n) = wrong[0];
        let (producer, sequence) = untag(item);
        let message = if n > 0 {
            format!("item {producer}/{sequence} was enqueued but never came out")
        } else {
            format!("item {producer}/{sequence} came out more often than it was enqueued")
        };

        let mut ce = Counterexample::for_seed(self.seed).with_description(message.clone());
        ce.add_state(StateSnapshot {
            step: 1,
            description: "final state".to_string(),
            variables: vec![
                ("mismatched".to_string(), wrong.len().to_string()),
                ("consumers".to_string(), dequeued.len().to_string()),
                ("remaining".to_string(), format!("{:?}", self.queue.current_contents())),
            ],
        });
        PropertyResult::fail("NoLostItems", message, Some(ce))
    }

    fn check_fifo_per_producer(&self) -> PropertyResult {
        for (consumer, items) in self.queue.dequeued_by_consumer().iter().enumerate() {
            let mut last_seen: HashMap<u32, u32> = HashMap::new();
            for &item in items {
                let (producer, sequence) = untag(item);
                if let Some(&previous) = last_seen.get(&producer) {
                    if sequence <= previous {
                        return PropertyResult::fail(
                            "FifoPerProducer",
                            format!(
                                "consumer {consumer} saw producer {producer} item {sequence} after item {previous}"
                            ),
                            None,
                        );
                    }
                }
                last_seen.insert(producer, sequence);
            }
        }

        PropertyResult::pass("FifoPerProducer")
    }

    fn check_bounded_capacity(&self) -> PropertyResult {
        let capacity = self.queue.capacity();
        let peak = self.queue.peak_len();
        let remaining = self.queue.current_contents().len();

        if peak > capacity || remaining > capacity {
            return PropertyResult::fail(
                "BoundedCapacity",
                format!(
                    "queue held {} items but capacity is {}",
                    peak.max(remaining),
                    capacity
                ),
                None,
            );
        }

        PropertyResult::pass("BoundedCapacity")
    }

    fn check_closed_rejects_enqueue(&self) -> PropertyResult {
        let accepted = self.queue.accepted_after_termination();
        if accepted > 0 {
            return PropertyResult::fail(
                "ClosedRejectsEnqueue",
                format!("{accepted} enqueue(s) succeeded after termination"),
                None,
            );
        }

        PropertyResult::pass("ClosedRejectsEnqueue")
    }
}

impl<T: QueueProperties> PropertyChecker for QueuePropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_items(),
            self.check_fifo_per_producer(),
            self.check_bounded_capacity(),
            self.check_closed_rejects_enqueue(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorded {
        capacity: usize,
        enqueued: Vec<u64>,
        dequeued: Vec<Vec<u64>>,
        contents: Vec<u64>,
        peak: usize,
        late: u64,
    }

    impl QueueProperties for Recorded {
        fn capacity(&self) -> usize {
            self.capacity
        }
        fn enqueued_items(&self) -> Vec<u64> {
            self.enqueued.clone()
        }
        fn dequeued_by_consumer(&self) -> Vec<Vec<u64>> {
            self.dequeued.clone()
        }
        fn current_contents(&self) -> Vec<u64> {
            self.contents.clone()
        }
        fn peak_len(&self) -> usize {
            self.peak
        }
        fn accepted_after_termination(&self) -> u64 {
            self.late
        }
    }

    fn failed(run: &Recorded) -> Vec<&'static str> {
        QueuePropertyChecker::new(run)
            .failures()
            .into_iter()
            .map(|r| r.name)
            .collect()
    }

    #[test]
    fn test_tag_roundtrip() {
        assert_eq!(untag(tag(3, 17)), (3, 17));
        assert_eq!(untag(tag(u32::MAX, 0)), (u32::MAX, 0));
    }

    #[test]
    fn test_clean_run_passes() {
        let run = Recorded {
            capacity: 2,
            enqueued: vec![tag(0, 0), tag(1, 0), tag(0, 1), tag(1, 1)],
            dequeued: vec![vec![tag(0, 0), tag(0, 1)], vec![tag(1, 0)]],
            contents: vec![tag(1, 1)],
            peak: 2,
            late: 0,
        };
        assert!(failed(&run).is_empty());
    }

    #[test]
    fn test_lost_and_duplicated_items() {
        let lost = Recorded {
            capacity: 4,
            enqueued: vec![tag(0, 0), tag(0, 1)],
            dequeued: vec![vec![tag(0, 0)]],
            ..Recorded::default()
        };
        assert_eq!(failed(&lost), vec!["NoLostItems"]);

        let duplicated = Recorded {
            capacity: 4,
            enqueued: vec![tag(0, 0)],
            dequeued: vec![vec![tag(0, 0)], vec![tag(0, 0)]],
            ..Recorded::default()
        };
        assert_eq!(failed(&duplicated), vec!["NoLostItems"]);
    }

    #[test]
    fn test_reordered_items_detected() {
        let run = Recorded {
            capacity: 4,
            enqueued: vec![tag(0, 0), tag(0, 1)],
            dequeued: vec![vec![tag(0, 1), tag(0, 0)]],
            ..Recorded::default()
        };
        assert_eq!(failed(&run), vec!["FifoPerProducer"]);
    }

    #[test]
    fn test_capacity_and_late_enqueue_detected() {
        let run = Recorded {
            capacity: 1,
            peak: 2,
            late: 1,
            ..Recorded::default()
        };
        assert_eq!(failed(&run), vec!["BoundedCapacity", "ClosedRejectsEnqueue"]);
    }
}
