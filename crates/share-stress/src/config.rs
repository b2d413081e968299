//! Workload configuration.
//!
//! Every config has a `Default`, a `quick()` preset for unit tests and a
//! `stress()` preset for long runs. `from_env` applies overrides:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `STRESS_SEED` | Reproduction seed (see [`get_or_generate_seed`](crate::get_or_generate_seed)) |
//! | `STRESS_ITERATIONS` | Operations per stack worker / items per producer |

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::StressError;
use crate::get_or_generate_seed;

/// Upper bound on workers in one pool.
const WORKERS_MAX: usize = 256;

fn iterations_from_env() -> Option<u64> {
    let raw = std::env::var("STRESS_ITERATIONS").ok()?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(value = %raw, "ignoring unparsable STRESS_ITERATIONS");
            None
        }
    }
}

fn check_workers(what: &str, count: usize) -> Result<(), StressError> {
    if count > WORKERS_MAX {
        return Err(StressError::InvalidConfig(format!(
            "{what} = {count} exceeds {WORKERS_MAX}"
        )));
    }
    Ok(())
}

/// Mixed push/pop workload against a stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackStressConfig {
    /// Worker threads, each doing a random mix of pushes and pops
    pub threads: usize,
    /// Operations per worker
    pub operations_per_thread: u64,
    /// Probability that an operation is a push
    pub push_probability: f64,
    /// Probability of yielding between operations
    pub yield_probability: f64,
    pub seed: u64,
}

impl Default for StackStressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            operations_per_thread: 10_000,
            push_probability: 0.5,
            yield_probability: 0.01,
            seed: get_or_generate_seed(),
        }
    }
}

impl StackStressConfig {
    pub fn quick() -> Self {
        Self {
            threads: 2,
            operations_per_thread: 500,
            ..Self::default()
        }
    }

    pub fn stress() -> Self {
        Self {
            threads: 8,
            operations_per_thread: 100_000,
            push_probability: 0.55,
            yield_probability: 0.001,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Some(n) = iterations_from_env() {
            self.operations_per_thread = n;
        }
        self
    }

    pub fn validate(&self) -> Result<(), StressError> {
        if self.threads == 0 {
            return Err(StressError::InvalidConfig("threads must be at least 1".into()));
        }
        check_workers("threads", self.threads)?;
        // Pushed values carry a 32-bit per-worker sequence number.
        if self.operations_per_thread > u64::from(u32::MAX) {
            return Err(StressError::InvalidConfig(format!(
                "operations_per_thread {} exceeds {}",
                self.operations_per_thread,
                u32::MAX
            )));
        }
        if !(0.0..=1.0).contains(&self.push_probability) {
            return Err(StressError::InvalidConfig(format!(
                "push_probability {} outside [0, 1]",
                self.push_probability
            )));
        }
        Ok(())
    }
}

/// Producer/consumer workload against a bounded queue.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub producers: usize,
    pub consumers: usize,
    /// Queue capacity
    pub capacity: usize,
    pub items_per_producer: u32,
    /// Probability of yielding between operations
    pub yield_probability: f64,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            capacity: 16,
            items_per_producer: 10_000,
            yield_probability: 0.01,
            seed: get_or_generate_seed(),
        }
    }
}

impl PipelineConfig {
    pub fn quick() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            capacity: 4,
            items_per_producer: 500,
            ..Self::default()
        }
    }

    /// Many threads, tiny buffer: maximizes time spent blocked.
    pub fn stress() -> Self {
        Self {
            producers: 8,
            consumers: 8,
            capacity: 2,
            items_per_producer: 50_000,
            yield_probability: 0.001,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Some(n) = iterations_from_env() {
            self.items_per_producer = u32::try_from(n).unwrap_or(u32::MAX);
        }
        self
    }

    pub fn validate(&self) -> Result<(), StressError> {
        if self.producers == 0 || self.consumers == 0 {
            return Err(StressError::InvalidConfig(
                "need at least one producer and one consumer".into(),
            ));
        }
        check_workers("producers", self.producers)?;
        check_workers("consumers", self.consumers)?;
        if self.capacity == 0 {
            return Err(StressError::InvalidConfig("capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Timed push/pop throughput run.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputConfig {
    pub pushers: usize,
    pub poppers: usize,
    /// Values pushed before the clock starts
    pub prefill: usize,
    pub duration: Duration,
    pub seed: u64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            pushers: 2,
            poppers: 2,
            prefill: 100_000,
            duration: Duration::from_secs(10),
            seed: get_or_generate_seed(),
        }
    }
}

impl ThroughputConfig {
    pub fn quick() -> Self {
        Self {
            prefill: 1_000,
            duration: Duration::from_millis(100),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), StressError> {
        if self.pushers + self.poppers == 0 {
            return Err(StressError::InvalidConfig("no workers configured".into()));
        }
        check_workers("pushers", self.pushers)?;
        check_workers("poppers", self.poppers)?;
        if self.duration.is_zero() {
            return Err(StressError::InvalidConfig("duration must be positive".into()));
        }
        Ok(())
    }
}
