//! Error types for mailbox queue construction and waiting.

use thiserror::Error;

/// Errors raised while validating a mailbox configuration.
///
/// These are fatal: a queue is never built from an invalid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity is zero or negative.
    #[error("mailbox capacity must not be less than 1 (got {capacity})")]
    NonPositive {
        /// The rejected capacity.
        capacity: i64,
    },
    /// Capacity is not a power of two, so sequences cannot be masked into slots.
    #[error("mailbox capacity must be a power of 2 (got {capacity})")]
    NotPowerOfTwo {
        /// The rejected capacity.
        capacity: i64,
    },
    /// Capacity exceeds the largest ring this crate will allocate.
    #[error("mailbox capacity {capacity} exceeds the maximum of {max}")]
    TooLarge {
        /// The rejected capacity.
        capacity: i64,
        /// The largest accepted capacity.
        max: usize,
    },
}

impl ConfigError {
    /// Returns the capacity that was rejected.
    #[inline]
    pub fn capacity(&self) -> i64 {
        match *self {
            Self::NonPositive { capacity }
            | Self::NotPowerOfTwo { capacity }
            | Self::TooLarge { capacity, .. } => capacity,
        }
    }
}

/// Why a wait on the sequence barrier returned without the requested sequence.
///
/// Together with the `Ok` arm of [`SequenceBarrier::wait_for`](crate::SequenceBarrier::wait_for)
/// this is the tri-state outcome of the wait primitive: data available, stop
/// requested, or would keep blocking. The consumer loop decides what to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// A stop was requested through the barrier's alert.
    #[error("wait alerted: stop requested")]
    Alerted,
    /// The waiting thread was interrupted through its `InterruptHandle`.
    #[error("wait interrupted")]
    Interrupted,
    /// The configured wait timeout elapsed before the sequence was published.
    #[error("wait timed out")]
    Timeout,
}

impl WaitError {
    /// Returns `true` if the consumer should simply wait again.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::NonPositive { capacity: 0 };
        assert_eq!(err.to_string(), "mailbox capacity must not be less than 1 (got 0)");

        let err = ConfigError::NotPowerOfTwo { capacity: 6 };
        assert_eq!(err.to_string(), "mailbox capacity must be a power of 2 (got 6)");
        assert_eq!(err.capacity(), 6);
    }

    #[test]
    fn test_wait_error_retryable() {
        assert!(WaitError::Interrupted.is_retryable());
        assert!(WaitError::Timeout.is_retryable());
        assert!(!WaitError::Alerted.is_retryable());
    }
}
