//! Stack invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostElements | Every pushed value was popped or is still in the stack |
//! | NoDuplicates | No value comes out more often than it went in |
//! | LIFO_Order | A sequential history replays against a model stack |
//!
//! Values are compared as multisets, so runs may push the same value more
//! than once.

use std::collections::HashMap;

use crate::counterexample::{Counterexample, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Recorded state of a stack run.
///
/// Implementations hand over what went in, what came out and what is left.
/// The checker only reads this state; it must be taken while the stack is
/// quiescent.
pub trait StackProperties {
    /// Every value successfully pushed.
    fn pushed_elements(&self) -> Vec<u64>;

    /// Every value returned by a pop.
    fn popped_elements(&self) -> Vec<u64>;

    /// Values still in the stack, top to bottom.
    fn current_contents(&self) -> Vec<u64>;

    /// Operation history in linearization order.
    ///
    /// Only sequential runs can provide one; concurrent runs return `None`
    /// and LIFO order is then not checked.
    fn history(&self) -> Option<StackHistory> {
        None
    }
}

/// History of stack operations.
#[derive(Debug, Clone, Default)]
pub struct StackHistory {
    /// Operations in linearization order.
    pub operations: Vec<StackOperation>,
}

/// A single stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOperation {
    Push(u64),
    Pop(Option<u64>),
}

impl StackHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_push(&mut self, value: u64) {
        self.operations.push(StackOperation::Push(value));
    }

    pub fn record_pop(&mut self, value: Option<u64>) {
        self.operations.push(StackOperation::Pop(value));
    }
}

/// Property checker for stack runs.
pub struct StackPropertyChecker<'a, T: StackProperties> {
    stack: &'a T,
    seed: Option<u64>,
}

impl<'a, T: StackProperties> StackPropertyChecker<'a, T> {
    #[must_use]
    pub fn new(stack: &'a T) -> Self {
        Self { stack, seed: None }
    }

    /// Attach the run seed to counterexamples.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Per-value balance: pushed count minus (popped + remaining) count.
    fn balance(&self) -> HashMap<u64, i64> {
        let mut balance: HashMap<u64, i64> = HashMap::new();
        for value in self.stack.pushed_elements() {
            *balance.entry(value).or_default() += 1;
        }
        for value in self
            .stack
            .popped_elements()
            .into_iter()
            .chain(self.stack.current_contents())
        {
            *balance.entry(value).or_default() -= 1;
        }
        balance
    }

    fn snapshot(&self, description: String) -> Counterexample {
        let mut ce = Counterexample::for_seed(self.seed).with_description(description);
        ce.add_state(StateSnapshot {
            step: 1,
            description: "final state".to_string(),
            variables: vec![
                ("pushed".to_string(), self.stack.pushed_elements().len().to_string()),
                ("popped".to_string(), self.stack.popped_elements().len().to_string()),
                ("contents".to_string(), format!("{:?}", self.stack.current_contents())),
            ],
        });
        ce
    }

    /// Every pushed value is either popped or still in the stack.
    fn check_no_lost_elements(&self) -> PropertyResult {
        let mut lost: Vec<u64> = self
            .balance()
            .into_iter()
            .filter(|&(_, n)| n > 0)
            .map(|(value, _)| value)
            .collect();

        if lost.is_empty() {
            return PropertyResult::pass("NoLostElements");
        }

        lost.sort_unstable();
        let message = format!(
            "{} value(s) pushed but neither popped nor present, first: {}",
            lost.len(),
            lost[0]
        );
        let ce = self.snapshot(message.clone());
        PropertyResult::fail("NoLostElements", message, Some(ce))
    }

    /// No value is returned or retained more often than it was pushed.
    fn check_no_duplicates(&self) -> PropertyResult {
        let mut extra: Vec<u64> = self
            .balance()
            .into_iter()
            .filter(|&(_, n)| n < 0)
            .map(|(value, _)| value)
            .collect();

        if extra.is_empty() {
            return PropertyResult::pass("NoDuplicates");
        }

        extra.sort_unstable();
        let message = format!(
            "{} value(s) came out more often than pushed, first: {}",
            extra.len(),
            extra[0]
        );
        let ce = self.snapshot(message.clone());
        PropertyResult::fail("NoDuplicates", message, Some(ce))
    }

    /// Replay a sequential history against a model stack.
    fn check_lifo_order(&self) -> PropertyResult {
        let Some(history) = self.stack.history() else {
            return PropertyResult::pass("LIFO_Order");
        };

        let mut model: Vec<u64> = Vec::new();
        for (index, op) in history.operations.iter().enumerate() {
            match *op {
                StackOperation::Push(value) => model.push(value),
                StackOperation::Pop(observed) => {
                    let expected = model.pop();
                    if observed != expected {
                        return PropertyResult::fail(
                            "LIFO_Order",
                            format!(
                                "pop at step {} returned {:?} but model expected {:?}",
                                index + 1,
                                observed,
                                expected
                            ),
                            None,
                        );
                    }
                }
            }
        }

        PropertyResult::pass("LIFO_Order")
    }
}

impl<T: StackProperties> PropertyChecker for StackPropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_elements(),
            self.check_no_duplicates(),
            self.check_lifo_order(),
        ]
    }
}
