//! Timed throughput comparison between stack implementations.
//!
//! The stack is pre-filled with random values, then pushers and poppers
//! hammer it in tight loops until the duration elapses. Throughput is the
//! growth of the stack's operation counter over that window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use share_structures::{ConcurrentStack, LockFreeStack, LockedStack};
use tracing::info;

use crate::config::ThroughputConfig;
use crate::error::StressError;
use crate::pool::WorkerPool;
use crate::random::DeterministicRng;

/// Result of one timed run.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputReport {
    pub implementation: &'static str,
    pub pushers: usize,
    pub poppers: usize,
    pub operations: u64,
    pub elapsed_ms: u64,
    pub ops_per_sec: f64,
}

/// Measure push/pop throughput of `stack` under `config`.
pub fn measure_stack<S>(stack: Arc<S>, config: &ThroughputConfig) -> Result<ThroughputReport, StressError>
where
    S: ConcurrentStack<u64> + 'static,
{
    config.validate()?;

    let mut rng = DeterministicRng::new(config.seed);
    for _ in 0..config.prefill {
        stack.push(rng.next_u64());
    }

    let pushers = config.pushers;
    let seed = config.seed;
    let stop = Arc::new(AtomicBool::new(false));
    let start_ops = stack.size();
    let started = Instant::now();

    let worker_stack = Arc::clone(&stack);
    let worker_stop = Arc::clone(&stop);
    let pool = WorkerPool::spawn("throughput", pushers + config.poppers, move |worker| {
        if worker < pushers {
            let mut rng = DeterministicRng::for_stream(seed, worker as u64);
            while !worker_stop.load(Ordering::Relaxed) {
                worker_stack.push(rng.next_u64());
            }
        } else {
            while !worker_stop.load(Ordering::Relaxed) {
                worker_stack.pop();
            }
        }
    })?;

    thread::sleep(config.duration);
    stop.store(true, Ordering::Relaxed);
    pool.join()?;

    let elapsed = started.elapsed();
    let operations = stack.size() - start_ops;
    let secs = elapsed.as_secs_f64();

    let report = ThroughputReport {
        implementation: stack.name(),
        pushers,
        poppers: config.poppers,
        operations,
        elapsed_ms: elapsed.as_millis() as u64,
        ops_per_sec: if secs > 0.0 { operations as f64 / secs } else { 0.0 },
    };

    info!(
        implementation = report.implementation,
        operations,
        ops_per_sec = report.ops_per_sec as u64,
        "throughput run finished"
    );

    Ok(report)
}

/// Run the same workload against the lock-free and the locked stack.
pub fn compare_stacks(config: &ThroughputConfig) -> Result<Vec<ThroughputReport>, StressError> {
    Ok(vec![
        measure_stack(Arc::new(LockFreeStack::new()), config)?,
        measure_stack(Arc::new(LockedStack::new()), config)?,
    ])
}
