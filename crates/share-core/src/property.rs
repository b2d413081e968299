//! Property results and the checker trait.

use std::fmt;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named property.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Property name, e.g. `NoLostElements`.
    pub name: &'static str,
    /// Whether the property held.
    pub passed: bool,
    /// Failure explanation (empty when passed).
    pub message: String,
    /// Failure path, when the checker could build one.
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// A passing result.
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            message: String::new(),
            counterexample: None,
        }
    }

    /// A failing result.
    #[must_use]
    pub fn fail(
        name: &'static str,
        message: impl Into<String>,
        counterexample: Option<Counterexample>,
    ) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "Failure must carry a message");
        Self {
            name,
            passed: false,
            message,
            counterexample,
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            return write!(f, "[PASS] {}", self.name);
        }
        write!(f, "[FAIL] {}: {}", self.name, self.message)?;
        if let Some(ref ce) = self.counterexample {
            write!(f, "\n{}", ce.render())?;
        }
        Ok(())
    }
}

/// Checks a fixed set of properties against some recorded state.
pub trait PropertyChecker {
    /// Evaluate every property.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True when every property holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.passed)
    }

    /// Only the failing results.
    fn failures(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.passed).collect()
    }
}
