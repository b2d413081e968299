//! Concurrent push/pop stress runs against any [`ConcurrentStack`].
//!
//! Each worker pushes values unique to itself (worker id in the upper 32
//! bits) and keeps a log of what it pushed and what its pops returned.
//! After the workers finish, the stack is drained and the combined record
//! is checked: everything pushed must come out exactly once.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use share_core::{tag, PropertyChecker, StackHistory, StackProperties, StackPropertyChecker};
use share_structures::ConcurrentStack;
use tracing::{debug, info};

use crate::config::StackStressConfig;
use crate::error::StressError;
use crate::pool::WorkerPool;
use crate::random::DeterministicRng;

/// What one worker did.
#[derive(Debug, Default)]
struct WorkerLog {
    pushed: Vec<u64>,
    popped: Vec<u64>,
    empty_pops: u64,
    /// Only kept for single-threaded runs.
    history: Option<StackHistory>,
}

/// Record of a finished stack stress run.
#[derive(Debug, Clone)]
pub struct StackRun {
    pub implementation: &'static str,
    pub seed: u64,
    pub threads: usize,
    pub pushed: Vec<u64>,
    pub popped: Vec<u64>,
    /// Values drained after the workers stopped, top to bottom
    pub remaining: Vec<u64>,
    pub empty_pops: u64,
    /// Stack operation counter delta over the run, drain excluded
    pub operations: u64,
    pub elapsed: Duration,
    history: Option<StackHistory>,
}

impl StackProperties for StackRun {
    fn pushed_elements(&self) -> Vec<u64> {
        self.pushed.clone()
    }

    fn popped_elements(&self) -> Vec<u64> {
        self.popped.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.remaining.clone()
    }

    fn history(&self) -> Option<StackHistory> {
        self.history.clone()
    }
}

impl StackRun {
    /// Check the stack invariants, failing with a rendered report.
    pub fn verify(&self) -> Result<(), StressError> {
        let checker = StackPropertyChecker::new(self).with_seed(self.seed);
        let failures = checker.failures();
        if failures.is_empty() {
            return Ok(());
        }

        let details = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Err(StressError::InvariantViolated {
            seed: self.seed,
            details,
        })
    }
}

/// Run the configured push/pop mix against `stack` and drain it afterwards.
///
/// The stack should start empty; anything already in it shows up as
/// values that were never pushed.
pub fn run_stack_stress<S>(stack: Arc<S>, config: &StackStressConfig) -> Result<StackRun, StressError>
where
    S: ConcurrentStack<u64> + 'static,
{
    config.validate()?;

    let seed = config.seed;
    let threads = config.threads;
    let ops = config.operations_per_thread;
    let push_probability = config.push_probability;
    let yield_probability = config.yield_probability;
    let sequential = threads == 1;

    let start_ops = stack.size();
    let started = Instant::now();

    let worker_stack = Arc::clone(&stack);
    let pool = WorkerPool::spawn("stack", threads, move |worker| {
        let mut rng = DeterministicRng::for_stream(seed, worker as u64);
        let mut log = WorkerLog {
            history: sequential.then(StackHistory::new),
            ..WorkerLog::default()
        };
        let mut next_sequence: u32 = 0;

        for _ in 0..ops {
            if rng.gen_bool(push_probability) {
                let value = tag(worker as u32, next_sequence);
                next_sequence += 1;
                worker_stack.push(value);
                log.pushed.push(value);
                if let Some(h) = log.history.as_mut() {
                    h.record_push(value);
                }
            } else {
                let popped = worker_stack.pop();
                match popped {
                    Some(value) => log.popped.push(value),
                    None => log.empty_pops += 1,
                }
                if let Some(h) = log.history.as_mut() {
                    h.record_pop(popped);
                }
            }

            if rng.gen_bool(yield_probability) {
                thread::yield_now();
            }
        }

        log
    })?;

    let logs = pool.join()?;
    let elapsed = started.elapsed();
    let operations = stack.size() - start_ops;

    let mut remaining = Vec::new();
    while let Some(value) = stack.pop() {
        remaining.push(value);
    }

    let mut run = StackRun {
        implementation: stack.name(),
        seed,
        threads,
        pushed: Vec::new(),
        popped: Vec::new(),
        remaining,
        empty_pops: 0,
        operations,
        elapsed,
        history: None,
    };
    for log in logs {
        run.pushed.extend(log.pushed);
        run.popped.extend(log.popped);
        run.empty_pops += log.empty_pops;
        if log.history.is_some() {
            run.history = log.history;
        }
    }

    debug!(
        pushed = run.pushed.len(),
        popped = run.popped.len(),
        remaining = run.remaining.len(),
        "stack run recorded"
    );
    info!(
        implementation = run.implementation,
        seed,
        threads,
        operations,
        elapsed_ms = elapsed.as_millis() as u64,
        "stack stress finished"
    );

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use share_structures::{LockFreeStack, LockedStack};

    #[test]
    fn test_lockfree_quick_run_holds() {
        let config = StackStressConfig::quick().with_seed(12345);
        let run = run_stack_stress(Arc::new(LockFreeStack::new()), &config).unwrap();
        run.verify().unwrap();

        let total_ops = config.threads as u64 * config.operations_per_thread;
        assert_eq!(run.operations, total_ops);
        assert_eq!(
            run.pushed.len() + run.popped.len() + run.empty_pops as usize,
            total_ops as usize
        );
        assert_eq!(run.implementation, "lock-free");
    }

    #[test]
    fn test_single_thread_run_checks_lifo() {
        let config = StackStressConfig {
            threads: 1,
            ..StackStressConfig::quick().with_seed(99)
        };
        let run = run_stack_stress(Arc::new(LockedStack::new()), &config).unwrap();
        assert!(run.history().is_some());
        run.verify().unwrap();
    }

    #[test]
    fn test_sequence_space_is_bounded() {
        let config = StackStressConfig {
            operations_per_thread: u64::from(u32::MAX) + 1,
            ..StackStressConfig::quick().with_seed(6)
        };
        let result = run_stack_stress(Arc::new(LockFreeStack::new()), &config);
        assert!(matches!(result, Err(StressError::InvalidConfig(_))));
    }

    #[test]
    fn test_preloaded_stack_is_reported() {
        let stack = Arc::new(LockFreeStack::new());
        stack.push(u64::MAX);

        let config = StackStressConfig {
            push_probability: 1.0,
            ..StackStressConfig::quick().with_seed(5)
        };
        let run = run_stack_stress(stack, &config).unwrap();

        match run.verify() {
            Err(StressError::InvariantViolated { seed, details }) => {
                assert_eq!(seed, 5);
                assert!(details.contains("NoDuplicates"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
