//! Producer/consumer pipeline around a [`BoundedBlockingQueue`].
//!
//! Producers enqueue until their input runs out; the last producer to
//! finish calls `terminate()`, so shutdown has exactly one owner. Consumers
//! dequeue until end-of-stream. A producer whose enqueue is rejected stops
//! producing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use share_core::{tag, PropertyChecker, QueueProperties, QueuePropertyChecker};
use share_structures::BoundedBlockingQueue;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::StressError;
use crate::pool::WorkerPool;
use crate::random::DeterministicRng;

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport<R> {
    /// Items each producer got into the queue before it stopped.
    pub accepted_per_producer: Vec<u32>,
    /// Producers that stopped early because the queue was closed.
    pub rejected_producers: usize,
    /// Consumer outputs, per consumer, in dequeue order.
    pub outputs: Vec<Vec<R>>,
    /// Largest queue length observed by producers.
    pub peak_len: usize,
    pub elapsed: Duration,
}

impl<R> PipelineReport<R> {
    #[must_use]
    pub fn items_accepted(&self) -> u64 {
        self.accepted_per_producer.iter().map(|&n| u64::from(n)).sum()
    }

    #[must_use]
    pub fn items_consumed(&self) -> usize {
        self.outputs.iter().map(Vec::len).sum()
    }
}

/// Run `config.producers` producers and `config.consumers` consumers
/// against `queue`.
///
/// `produce(producer, sequence)` builds the items; each producer emits
/// `config.items_per_producer` of them. `consume(consumer, item)` handles
/// one item and its return value is collected. Returns once every consumer
/// has seen end-of-stream.
///
/// If every consumer panics, producers stay blocked on a full queue until
/// something else terminates it.
pub fn run_pipeline<T, R, P, C>(
    queue: Arc<BoundedBlockingQueue<T>>,
    config: &PipelineConfig,
    produce: P,
    consume: C,
) -> Result<PipelineReport<R>, StressError>
where
    T: Send + 'static,
    R: Send + 'static,
    P: Fn(usize, u32) -> T + Send + Sync + 'static,
    C: Fn(usize, T) -> R + Send + Sync + 'static,
{
    config.validate()?;

    let seed = config.seed;
    let items = config.items_per_producer;
    let yield_probability = config.yield_probability;
    let consumer_stream_base = config.producers as u64;
    let started = Instant::now();

    let peak_len = Arc::new(AtomicUsize::new(0));
    let active_producers = Arc::new(AtomicUsize::new(config.producers));

    // Consumers first so early items have somewhere to go.
    let consumer_queue = Arc::clone(&queue);
    let consumers = WorkerPool::spawn("consumer", config.consumers, move |consumer| {
        let mut rng = DeterministicRng::for_stream(seed, consumer_stream_base + consumer as u64);
        let mut outputs = Vec::new();
        while let Some(item) = consumer_queue.dequeue() {
            outputs.push(consume(consumer, item));
            if rng.gen_bool(yield_probability) {
                thread::yield_now();
            }
        }
        outputs
    })?;

    let producer_queue = Arc::clone(&queue);
    let producer_peak = Arc::clone(&peak_len);
    let producers = WorkerPool::spawn("producer", config.producers, move |producer| {
        let mut rng = DeterministicRng::for_stream(seed, producer as u64);
        let mut accepted: u32 = 0;
        let mut rejected = false;

        for sequence in 0..items {
            if producer_queue.enqueue(produce(producer, sequence)).is_err() {
                rejected = true;
                break;
            }
            accepted += 1;
            producer_peak.fetch_max(producer_queue.len(), Ordering::Relaxed);

            if rng.gen_bool(yield_probability) {
                thread::yield_now();
            }
        }

        if active_producers.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!(producer, "last producer done, terminating queue");
            producer_queue.terminate();
        }

        (accepted, rejected)
    });

    // A producer pool that failed to start would leave consumers blocked.
    let producers = match producers {
        Ok(pool) => pool,
        Err(e) => {
            queue.terminate();
            let _ = consumers.join();
            return Err(e);
        }
    };

    let produced = producers.join();
    // Panicked producers never reach terminate; make sure consumers exit.
    if produced.is_err() {
        queue.terminate();
    }
    let outputs = consumers.join()?;
    let produced = produced?;

    let report = PipelineReport {
        accepted_per_producer: produced.iter().map(|&(n, _)| n).collect(),
        rejected_producers: produced.iter().filter(|&&(_, rejected)| rejected).count(),
        outputs,
        peak_len: peak_len.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    };

    info!(
        seed,
        accepted = report.items_accepted(),
        consumed = report.items_consumed(),
        peak_len = report.peak_len,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "pipeline finished"
    );

    Ok(report)
}

/// Record of a queue stress run, checkable with [`QueuePropertyChecker`].
#[derive(Debug, Clone)]
pub struct QueueRun {
    pub seed: u64,
    pub capacity: usize,
    pub report: PipelineReport<u64>,
    /// Left in the queue after consumers exited (normally empty)
    pub remaining: Vec<u64>,
    /// Probe enqueues attempted after termination that were accepted
    pub late_accepted: u64,
}

impl QueueProperties for QueueRun {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn enqueued_items(&self) -> Vec<u64> {
        self.report
            .accepted_per_producer
            .iter()
            .enumerate()
            .flat_map(|(producer, &n)| (0..n).map(move |seq| tag(producer as u32, seq)))
            .collect()
    }

    fn dequeued_by_consumer(&self) -> Vec<Vec<u64>> {
        self.report.outputs.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.remaining.clone()
    }

    fn peak_len(&self) -> usize {
        self.report.peak_len
    }

    fn accepted_after_termination(&self) -> u64 {
        self.late_accepted
    }
}

impl QueueRun {
    /// Check the queue invariants, failing with a rendered report.
    pub fn verify(&self) -> Result<(), StressError> {
        let checker = QueuePropertyChecker::new(self).with_seed(self.seed);
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

/// Tagged-item pipeline run followed by a post-termination probe.
pub fn run_queue_stress(config: &PipelineConfig) -> Result<QueueRun, StressError> {
    config.validate()?;
    let queue = Arc::new(BoundedBlockingQueue::new(config.capacity)?);

    let report = run_pipeline(
        Arc::clone(&queue),
        config,
        |producer, sequence| tag(producer as u32, sequence),
        |_, item| item,
    )?;

    let mut late_accepted = 0;
    for probe in 0..config.producers as u32 {
        if queue.enqueue(tag(probe, u32::MAX)).is_ok() {
            late_accepted += 1;
        }
    }

    Ok(QueueRun {
        seed: config.seed,
        capacity: config.capacity,
        report,
        remaining: queue.drain(),
        late_accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use share_structures::QueueState;

    #[test]
    fn test_quick_queue_stress_holds() {
        let config = PipelineConfig::quick().with_seed(2024);
        let run = run_queue_stress(&config).unwrap();
        run.verify().unwrap();

        let expected = config.producers as u64 * u64::from(config.items_per_producer);
        assert_eq!(run.report.items_accepted(), expected);
        assert_eq!(run.report.items_consumed() as u64, expected);
        assert_eq!(run.report.rejected_producers, 0);
        assert!(run.report.peak_len <= config.capacity);
    }

    #[test]
    fn test_pipeline_transforms_items() {
        let config = PipelineConfig {
            producers: 1,
            consumers: 1,
            capacity: 2,
            items_per_producer: 100,
            yield_probability: 0.0,
            seed: 1,
        };
        let queue = Arc::new(BoundedBlockingQueue::new(config.capacity).unwrap());

        let report = run_pipeline(
            Arc::clone(&queue),
            &config,
            |_, sequence| sequence,
            |_, item| item * 2,
        )
        .unwrap();

        // One producer, one consumer: strict FIFO.
        let expected: Vec<u32> = (0..100).map(|i| i * 2).collect();
        assert_eq!(report.outputs, vec![expected]);
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_pre_terminated_queue_stops_producers() {
        let config = PipelineConfig::quick().with_seed(3);
        let queue = Arc::new(BoundedBlockingQueue::new(config.capacity).unwrap());
        queue.terminate();

        let report = run_pipeline(queue, &config, |_, s| s, |_, item| item).unwrap();
        assert_eq!(report.items_accepted(), 0);
        assert_eq!(report.rejected_producers, config.producers);
        assert_eq!(report.items_consumed(), 0);
    }

    #[test]
    fn test_panicking_consumer_does_not_hang() {
        let config = PipelineConfig {
            consumers: 1,
            capacity: 1,
            ..PipelineConfig::quick().with_seed(4)
        };
        let queue = Arc::new(BoundedBlockingQueue::new(config.capacity).unwrap());

        // The only consumer dies on its first item and producers block on
        // the full queue until the watchdog terminates it.
        let watchdog_queue = Arc::clone(&queue);
        let watchdog = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            watchdog_queue.terminate();
        });

        let result = run_pipeline(queue, &config, |_, s| s, |_, _item: u32| -> u32 {
            panic!("consumer failure")
        });
        watchdog.join().unwrap();

        assert!(matches!(result, Err(StressError::WorkerPanicked { .. })));
    }
}
