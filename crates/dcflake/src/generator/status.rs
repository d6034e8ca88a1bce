use crate::SnowflakeId;

/// The outcome of a single non-blocking generation attempt.
///
/// Returned by [`SnowflakeGenerator::poll_id`] for callers that would rather
/// back off on their own terms than spin inside the generator.
///
/// # Example
///
/// ```
/// use dcflake::{LockSnowflakeGenerator, Poll, SystemClock};
///
/// let generator = LockSnowflakeGenerator::new(0, 1, SystemClock).unwrap();
/// let id = loop {
///     match generator.poll_id().unwrap() {
///         Poll::Ready { id } => break id,
///         Poll::Pending { .. } => std::thread::yield_now(),
///     }
/// };
/// assert_eq!(id.machine_id(), 1);
/// ```
///
/// [`SnowflakeGenerator::poll_id`]: crate::SnowflakeGenerator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: SnowflakeId,
    },
    /// The sequence for the current millisecond is used up, or another caller
    /// won the race for it.
    ///
    /// Retry once the clock reads `yield_until` or later.
    Pending {
        /// Earliest clock reading (ms since the Unix epoch) worth retrying at.
        yield_until: u64,
    },
}
