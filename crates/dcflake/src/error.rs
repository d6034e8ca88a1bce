use thiserror::Error;

/// A result type defaulting to this crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `dcflake` can produce.
///
/// Every generation error leaves the generator state untouched, so the same
/// generator can be called again once the underlying condition clears.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum Error {
    /// A node identity field does not fit into its bit width.
    #[error("invalid {field} {value}; expected 0..={max}")]
    Configuration {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Largest value the field can hold.
        max: u64,
    },

    /// An environment variable holding part of the node identity could not be
    /// parsed as an integer.
    #[error("environment variable {var} is not an integer: {value:?}")]
    InvalidEnv {
        /// Name of the variable.
        var: &'static str,
        /// Raw value read from the environment.
        value: String,
    },

    /// The clock reported a time earlier than the last timestamp this
    /// generator issued an ID for.
    ///
    /// Callers may abort, alert, or wait `last - observed` milliseconds and
    /// retry.
    #[error("clock moved backwards: observed {observed} ms, last issued {last} ms")]
    ClockRegression {
        /// Clock reading, in milliseconds since the Unix epoch.
        observed: u64,
        /// Last recorded timestamp, in milliseconds since the Unix epoch.
        last: u64,
    },

    /// The clock reported a time before the ID epoch, which the 42-bit
    /// timestamp delta cannot represent.
    #[error("clock reading {observed} ms is before the id epoch {epoch} ms")]
    ClockBeforeEpoch {
        /// Clock reading, in milliseconds since the Unix epoch.
        observed: u64,
        /// The ID epoch, in milliseconds since the Unix epoch.
        epoch: u64,
    },

    /// The elapsed time since the epoch no longer fits into 42 bits.
    #[error("timestamp delta {delta} ms exceeds the 42-bit timestamp field")]
    TimestampOverflow {
        /// Milliseconds elapsed since the ID epoch.
        delta: u64,
    },

    /// The sequence for `timestamp` was exhausted and the clock did not
    /// advance within the configured spin timeout.
    #[error("sequence exhausted at {timestamp} ms; clock did not advance within {waited:?}")]
    SpinTimeout {
        /// The exhausted millisecond, since the Unix epoch.
        timestamp: u64,
        /// How long the generator spun before giving up.
        waited: core::time::Duration,
    },

    /// The generator lock was poisoned by a panicking thread.
    #[error("generator state lock is poisoned")]
    LockPoisoned,

    /// A string could not be parsed as a decimal ID.
    #[error("invalid id string")]
    ParseId,
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError};

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
