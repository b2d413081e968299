//! Counterexample representation and rendering.
//!
//! When a property fails, the checker attaches the state that exposed the
//! failure together with the seed of the run that produced it.

use std::fmt::Write as _;

/// A counterexample showing why a property failed.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// State snapshots, in step order.
    pub states: Vec<StateSnapshot>,
    /// Seed of the stress run, for reproduction.
    pub seed: Option<u64>,
    /// Human-readable description of the failure.
    pub description: Option<String>,
}

/// Snapshot of recorded state at one point.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number.
    pub step: u64,
    /// What this snapshot shows.
    pub description: String,
    /// Named values at this point.
    pub variables: Vec<(String, String)>,
}

impl Counterexample {
    /// Create a new empty counterexample.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample carrying a reproduction seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Start from an optional seed.
    #[must_use]
    pub fn for_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a state snapshot. Steps must be strictly increasing.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    /// Render as plain text.
    ///
    /// ```text
    /// STRESS_SEED=42
    ///
    /// Failure: item 7 lost
    ///
    /// step 1: final state
    ///   enqueued = [1, 7]
    ///   dequeued = [1]
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.seed {
            let _ = writeln!(output, "STRESS_SEED={seed}\n");
        }

        if let Some(ref desc) = self.description {
            let _ = writeln!(output, "Failure: {desc}\n");
        }

        for state in &self.states {
            let _ = writeln!(output, "step {}: {}", state.step, state.description);
            for (name, value) in &state.variables {
                let _ = writeln!(output, "  {name} = {value}");
            }
        }

        output
    }
}
