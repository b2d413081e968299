//! Errors raised by stress drivers.

use std::io;

use share_structures::CapacityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StressError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread")]
    Spawn(#[from] io::Error),

    #[error("worker {pool}-{index} panicked: {message}")]
    WorkerPanicked {
        pool: String,
        index: usize,
        message: String,
    },

    #[error("invariant violated (STRESS_SEED={seed}):\n{details}")]
    InvariantViolated { seed: u64, details: String },

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
