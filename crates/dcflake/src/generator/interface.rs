use crate::{NodeConfig, Poll, Result, SnowflakeId, TimeSource};

/// The interface shared by every generator in this crate.
///
/// Implementations serialize [`next_id`](Self::next_id) per instance, so a
/// generator can be shared by reference (or in an `Arc`) across threads as
/// long as its time source is `Sync`.
pub trait SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for an already validated node identity.
    fn from_config(config: NodeConfig, time: T) -> Self;

    /// The node identity embedded in every ID.
    fn config(&self) -> NodeConfig;

    /// Generates the next ID, spinning through sequence exhaustion.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock reads earlier than the last
    ///   issued timestamp
    /// - [`Error::ClockBeforeEpoch`] / [`Error::TimestampOverflow`] if the
    ///   clock is outside the representable range
    /// - [`Error::SpinTimeout`] if a spin timeout is configured and expires
    /// - [`Error::LockPoisoned`] for lock-based generators whose lock is
    ///   poisoned
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::ClockBeforeEpoch`]: crate::Error::ClockBeforeEpoch
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::SpinTimeout`]: crate::Error::SpinTimeout
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    fn next_id(&self) -> Result<SnowflakeId>;

    /// Makes one generation attempt without spinning.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`], minus [`Error::SpinTimeout`].
    ///
    /// [`Error::SpinTimeout`]: crate::Error::SpinTimeout
    fn poll_id(&self) -> Result<Poll>;
}
