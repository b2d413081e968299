//! # share-stress
//!
//! Stress drivers and throughput measurement for `share-structures`.
//!
//! ## Drivers
//!
//! - `stack_stress`: random push/pop mix on N threads, checked against the
//!   stack invariants
//! - `pipeline`: producers and consumers around a bounded queue, checked
//!   against the queue invariants
//! - `throughput`: timed lock-free vs locked stack comparison
//!
//! ## Reproducibility
//!
//! Every run carries a seed that fixes each worker's operation sequence.
//! To replay a failing run's workload:
//! ```bash
//! STRESS_SEED=12345 cargo test -p share-stress
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod random;
pub mod stack_stress;
pub mod throughput;

pub use config::{PipelineConfig, StackStressConfig, ThroughputConfig};
pub use error::StressError;
pub use pipeline::{run_pipeline, run_queue_stress, PipelineReport, QueueRun};
pub use pool::WorkerPool;
pub use random::DeterministicRng;
pub use stack_stress::{run_stack_stress, StackRun};
pub use throughput::{compare_stacks, measure_stack, ThroughputReport};

use tracing::{info, warn};

/// Get the run seed from `STRESS_SEED` or generate a random one.
///
/// The seed is logged so a failing run can be replayed.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    if let Ok(raw) = std::env::var("STRESS_SEED") {
        match raw.parse::<u64>() {
            Ok(seed) => {
                info!(seed, "STRESS_SEED from environment");
                return seed;
            }
            Err(_) => warn!(value = %raw, "STRESS_SEED is not a valid u64, generating one"),
        }
    }

    let seed = rand::random::<u64>();
    info!(seed, "STRESS_SEED randomly generated");
    seed
}
