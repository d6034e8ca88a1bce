use core::{cmp::Ordering, time::Duration};

#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use super::{
    SpinWait, clock_behind,
    mutex::{Mutex, MutexGuard},
    timestamp_delta,
};
use crate::{NodeConfig, Poll, Result, SnowflakeGenerator, SnowflakeId, TimeSource};

/// The mutable half of a generator.
#[derive(Debug, Default)]
struct GeneratorState {
    /// Clock reading (ms since the Unix epoch) of the last issued ID.
    last_timestamp: u64,
    /// Sequence of the last issued ID, always within
    /// [`SnowflakeId::SEQUENCE_MASK`].
    sequence: u64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The `(last_timestamp, sequence)` pair lives behind a single mutex, and the
/// whole generation step runs while holding it, including the busy-wait on
/// sequence exhaustion.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
/// - ✅ Optional spin timeout
///
/// ## See Also
/// - [`AtomicSnowflakeGenerator`]
///
/// [`AtomicSnowflakeGenerator`]: crate::AtomicSnowflakeGenerator
///
/// # Example
/// ```
/// use dcflake::{LockSnowflakeGenerator, SystemClock};
///
/// let generator = LockSnowflakeGenerator::new(1, 0, SystemClock).unwrap();
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(a < b);
/// assert_eq!(a.data_center_id(), 1);
/// ```
#[derive(Debug)]
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<GeneratorState>,
    config: NodeConfig,
    spin_timeout: Option<Duration>,
    time: T,
}

impl<T> LockSnowflakeGenerator<T>
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
        Self::from_state(config, GeneratorState::default(), time)
    }

    fn from_state(config: NodeConfig, state: GeneratorState, time: T) -> Self {
        #[cfg(feature = "tracing")]
        debug!(
            data_center_id = config.data_center_id(),
            machine_id = config.machine_id(),
            "created lock generator"
        );
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            config,
            spin_timeout: None,
            time,
        }
    }

    /// Bounds the busy-wait on sequence exhaustion.
    ///
    /// Without a timeout, [`Self::next_id`] spins until the clock advances,
    /// however long that takes. With one, it fails with
    /// [`Error::SpinTimeout`] once `timeout` of real time has passed.
    ///
    /// [`Error::SpinTimeout`]: crate::Error::SpinTimeout
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
    /// Within one millisecond the sequence counts up from zero. When it is
    /// exhausted, the generator spins until the clock moves on; a clock that
    /// reads earlier than the last issued timestamp is reported as
    /// [`Error::ClockRegression`] without touching the generator state.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::next_id`].
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.lock()?;
        let mut now = self.time.current_millis();
        timestamp_delta(now)?;

        let sequence = match now.cmp(&state.last_timestamp) {
            Ordering::Less => return Err(clock_behind(now, state.last_timestamp)),
            Ordering::Equal => {
                let sequence = (state.sequence + 1) & SnowflakeId::SEQUENCE_MASK;
                if sequence == 0 {
                    now = SpinWait::new(self.spin_timeout).until_after(&self.time, now)?;
                }
                sequence
            }
            Ordering::Greater => 0,
        };

        let id = self.pack(now, sequence)?;
        state.last_timestamp = now;
        state.sequence = sequence;
        Ok(id)
    }

    /// Makes one generation attempt without spinning.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::poll_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Result<Poll> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();
        timestamp_delta(now)?;

        let sequence = match now.cmp(&state.last_timestamp) {
            Ordering::Less => return Err(clock_behind(now, state.last_timestamp)),
            Ordering::Equal if state.sequence == SnowflakeId::SEQUENCE_MASK => {
                return Ok(Poll::Pending {
                    yield_until: now + 1,
                });
            }
            Ordering::Equal => state.sequence + 1,
            Ordering::Greater => 0,
        };

        let id = self.pack(now, sequence)?;
        state.last_timestamp = now;
        state.sequence = sequence;
        Ok(Poll::Ready { id })
    }

    fn pack(&self, now: u64, sequence: u64) -> Result<SnowflakeId> {
        Ok(SnowflakeId::from_components(
            timestamp_delta(now)?,
            self.config.data_center_id().into(),
            self.config.machine_id().into(),
            sequence,
        ))
    }

    fn lock(&self) -> Result<MutexGuard<'_, GeneratorState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}

#[cfg(test)]
impl<T> LockSnowflakeGenerator<T>
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
        Self::from_state(
            config,
            GeneratorState {
                last_timestamp,
                sequence,
            },
            time,
        )
    }

    #[cfg(not(feature = "parking-lot"))]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.state.lock();
            panic!("poisoning generator lock");
        }));
    }
}

impl<T> SnowflakeGenerator<T> for LockSnowflakeGenerator<T>
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
