//! Seeded randomness for reproducible workloads.
//!
//! A seed fixes each worker's operation sequence. Thread interleaving is
//! left to the OS scheduler, so a seed reproduces the workload, not the
//! exact schedule.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mixes the stream id into the parent seed.
const STREAM_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic random number generator.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: StdRng,
    seed: u64,
}

impl DeterministicRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent generator for one worker, derived from `seed`.
    #[must_use]
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        Self::new(seed ^ stream.wrapping_add(1).wrapping_mul(STREAM_MULTIPLIER))
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `true` with probability `p` (clamped to `[0, 1]`).
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}
