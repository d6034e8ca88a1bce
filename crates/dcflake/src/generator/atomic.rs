use core::{cmp, time::Duration};

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use super::{SpinWait, clock_behind, timestamp_delta};
use crate::{EPOCH_MILLIS, NodeConfig, Poll, Result, SnowflakeGenerator, SnowflakeId, TimeSource};

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID is the generator state: its timestamp and sequence
/// fields are exactly `(last_timestamp, sequence)`, so both advance together
/// in a single compare-and-swap on an [`AtomicU64`].
///
/// ## Features
/// - ✅ Thread-safe
/// - ❌ Fair access across threads (a caller may lose several CAS races)
/// - ✅ Optional spin timeout
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::LockSnowflakeGenerator
///
/// # Example
/// ```
/// use dcflake::{AtomicSnowflakeGenerator, MonotonicClock};
///
/// let generator = AtomicSnowflakeGenerator::new(0, 1, MonotonicClock::new()).unwrap();
/// let id = generator.next_id().unwrap();
/// assert_eq!(id.machine_id(), 1);
/// ```
#[derive(Debug)]
pub struct AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    config: NodeConfig,
    spin_timeout: Option<Duration>,
    time: T,
}

impl<T> AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for the given node identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either ID is outside `0..=1`.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn new(data_center_id: u64, machine_id: u64, time: T) -> Result<Self> {
        Ok(Self::from_config(
            NodeConfig::new(data_center_id, machine_id)?,
            time,
        ))
    }

    /// Creates a generator from an already validated [`NodeConfig`].
    pub fn from_config(config: NodeConfig, time: T) -> Self {
        Self::from_raw_state(config, unissued_state(config), time)
    }

    fn from_raw_state(config: NodeConfig, raw: u64, time: T) -> Self {
        #[cfg(feature = "tracing")]
        debug!(
            data_center_id = config.data_center_id(),
            machine_id = config.machine_id(),
            "created atomic generator"
        );
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(raw)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(raw),
            config,
            spin_timeout: None,
            time,
        }
    }

    /// Bounds the busy-wait on sequence exhaustion.
    ///
    /// See [`LockSnowflakeGenerator::with_spin_timeout`].
    ///
    /// [`LockSnowflakeGenerator::with_spin_timeout`]: crate::LockSnowflakeGenerator::with_spin_timeout
    #[must_use]
    pub fn with_spin_timeout(mut self, timeout: Duration) -> Self {
        self.spin_timeout = Some(timeout);
        self
    }

    /// The node identity embedded in every ID.
    pub fn config(&self) -> NodeConfig {
        self.config
    }

    /// Generates the next ID.
    ///
    /// Retries lost CAS races and spins through sequence exhaustion; fails
    /// without touching the state when the clock reads earlier than the last
    /// issued timestamp.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut spin = SpinWait::new(self.spin_timeout);
        loop {
            match self.attempt()? {
                Attempt::Issued(id) => break Ok(id),
                Attempt::Exhausted { last } => {
                    spin.until_after(&self.time, last)?;
                }
                Attempt::Contended => core::hint::spin_loop(),
            }
        }
    }

    /// Makes one generation attempt without spinning.
    ///
    /// A lost CAS race is reported as [`Poll::Pending`] with a `yield_until`
    /// of the current reading, meaning "retry immediately".
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::poll_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Result<Poll> {
        Ok(match self.attempt()? {
            Attempt::Issued(id) => Poll::Ready { id },
            Attempt::Exhausted { last } => Poll::Pending {
                yield_until: last + 1,
            },
            Attempt::Contended => Poll::Pending {
                yield_until: self.time.current_millis(),
            },
        })
    }

    fn attempt(&self) -> Result<Attempt> {
        // Load before reading the clock: whoever stored this state read its
        // timestamp earlier, so a later reading can only be behind it when
        // the clock itself went backwards.
        let current_raw = self.state.load(Ordering::Acquire);
        let now = self.time.current_millis();
        let delta = timestamp_delta(now)?;

        if current_raw == unissued_state(self.config) {
            let first = SnowflakeId::from_components(
                delta,
                self.config.data_center_id().into(),
                self.config.machine_id().into(),
                0,
            );
            return Ok(self.swap(current_raw, first));
        }

        let current = SnowflakeId::from_raw(current_raw);
        let last = current.timestamp() + EPOCH_MILLIS;

        let next = match delta.cmp(&current.timestamp()) {
            cmp::Ordering::Less => return Err(clock_behind(now, last)),
            cmp::Ordering::Equal if !current.has_sequence_room() => {
                return Ok(Attempt::Exhausted { last });
            }
            cmp::Ordering::Equal => current.increment_sequence(),
            cmp::Ordering::Greater => current.rollover_to_timestamp(delta),
        };

        Ok(self.swap(current_raw, next))
    }

    fn swap(&self, current_raw: u64, next: SnowflakeId) -> Attempt {
        match self.state.compare_exchange(
            current_raw,
            next.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Attempt::Issued(next),
            Err(_) => Attempt::Contended,
        }
    }
}

/// State of a generator that has not issued anything yet.
///
/// Every issued ID carries this node's data-center bit, so flipping it yields
/// a raw value no issued ID can equal.
const fn unissued_state(config: NodeConfig) -> u64 {
    SnowflakeId::from_components(
        0,
        (config.data_center_id() ^ 1) as u64,
        config.machine_id() as u64,
        0,
    )
    .to_raw()
}

enum Attempt {
    Issued(SnowflakeId),
    /// The sequence for `last` (ms since the Unix epoch) is used up.
    Exhausted {
        last: u64,
    },
    /// Another caller swapped the state first.
    Contended,
}

#[cfg(test)]
impl<T> AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Starts a generator as if it had just issued `(last_timestamp,
    /// sequence)`.
    pub(crate) fn with_last_issued(
        config: NodeConfig,
        last_timestamp: u64,
        sequence: u64,
        time: T,
    ) -> Self {
        let last = SnowflakeId::from_components(
            last_timestamp - EPOCH_MILLIS,
            config.data_center_id().into(),
            config.machine_id().into(),
            sequence,
        );
        Self::from_raw_state(config, last.to_raw(), time)
    }
}

impl<T> SnowflakeGenerator<T> for AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn from_config(config: NodeConfig, time: T) -> Self {
        Self::from_config(config, time)
    }

    fn config(&self) -> NodeConfig {
        self.config()
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }

    fn poll_id(&self) -> Result<Poll> {
        self.poll_id()
    }
}
