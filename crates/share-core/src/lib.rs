//! # share-core
//!
//! Invariants for runs against the concurrent stack and bounded queue.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failures with their reproduction seed
//! - Property traits per structure (`StackProperties`, `QueueProperties`)
//!
//! A run is described after the fact: drivers record what went in and what
//! came out, then hand that record to a checker.

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{Counterexample, StateSnapshot};
pub use invariants::{
    tag, untag, QueueProperties, QueuePropertyChecker, StackHistory, StackOperation,
    StackProperties, StackPropertyChecker,
};
pub use property::{PropertyChecker, PropertyResult};
