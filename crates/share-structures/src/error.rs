//! Error types for the bounded queue.
//!
//! Rejected values are handed back to the caller inside the error, the same
//! way a failed send returns its message.

use std::fmt;

use thiserror::Error;

/// The queue was created with capacity zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue capacity must be at least 1")]
pub struct CapacityError;

/// `enqueue` was called after `terminate()`.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("queue closed: enqueue after terminate")]
pub struct Closed<T>(pub T);

impl<T> Closed<T> {
    /// Take back the rejected value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closed").finish_non_exhaustive()
    }
}

/// A non-blocking or timed enqueue did not go through.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
pub enum TryEnqueueError<T> {
    /// No free slot (immediately, or before the timeout elapsed).
    #[error("queue full")]
    Full(T),
    /// The queue was terminated.
    #[error("queue closed: enqueue after terminate")]
    Closed(T),
}

impl<T> TryEnqueueError<T> {
    /// Take back the rejected value.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Closed(value) => value,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> From<Closed<T>> for TryEnqueueError<T> {
    fn from(closed: Closed<T>) -> Self {
        Self::Closed(closed.0)
    }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// A non-blocking or timed dequeue returned nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryDequeueError {
    /// Nothing queued yet, but producers may still add items.
    #[error("queue empty")]
    Empty,
    /// Terminated and empty; nothing will ever arrive.
    #[error("queue drained")]
    Drained,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_value_is_returned() {
        assert_eq!(Closed(7).into_inner(), 7);
        assert_eq!(TryEnqueueError::Full(1).into_inner(), 1);
        assert_eq!(TryEnqueueError::from(Closed(2)).into_inner(), 2);
        assert!(TryEnqueueError::<u8>::from(Closed(2)).is_closed());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Closed(()).to_string(), "queue closed: enqueue after terminate");
        assert_eq!(TryEnqueueError::Full(()).to_string(), "queue full");
        assert_eq!(TryDequeueError::Drained.to_string(), "queue drained");
        assert_eq!(CapacityError.to_string(), "queue capacity must be at least 1");
    }

    #[test]
    fn test_debug_does_not_need_debug_payload() {
        struct Opaque;
        assert_eq!(format!("{:?}", TryEnqueueError::Closed(Opaque)), "Closed(..)");
    }
}
