use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// ID epoch in milliseconds since the Unix epoch: Thursday, September 1, 2016
/// 00:00:00 UTC+8.
///
/// Every [`SnowflakeId`] stores its timestamp relative to this instant, which
/// leaves the 42-bit timestamp field usable for roughly 139 years.
///
/// [`SnowflakeId`]: crate::SnowflakeId
pub const EPOCH_MILLIS: u64 = 1_472_659_200_000;

/// [`EPOCH_MILLIS`] as a [`Duration`] since the Unix epoch.
pub const EPOCH: Duration = Duration::from_millis(EPOCH_MILLIS);

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// Implementations are expected to be monotonic most of the time but are
/// allowed to jump backwards (NTP steps, VM pauses). Detecting that is the
/// generator's job, not the clock's.
///
/// # Example
///
/// ```
/// use dcflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The operating system's wall clock.
///
/// Every call reads [`SystemTime::now`], so this clock follows NTP
/// adjustments, including backwards steps.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0 and is rejected by the generator
        // as being before the ID epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A time source that never goes backwards.
///
/// The wall clock is read once at construction; after that, time advances
/// with [`Instant`] only, so NTP adjustments made while the process runs are
/// ignored. A background thread refreshes a shared atomic once per
/// millisecond, keeping syscalls off the hot path. Clones share the ticker;
/// it stops once the last clone is dropped.
///
/// # Example
///
/// ```
/// use dcflake::{MonotonicClock, TimeSource, EPOCH_MILLIS};
///
/// let clock = MonotonicClock::new();
/// let first = clock.current_millis();
/// std::thread::sleep(std::time::Duration::from_millis(5));
/// assert!(clock.current_millis() >= first);
/// assert!(first > EPOCH_MILLIS);
/// ```
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    origin: u64, // wall-clock ms at construction
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a monotonic clock anchored to the current wall-clock time.
    pub fn new() -> Self {
        Self::with_origin(SystemClock.current_millis())
    }

    /// Starts a monotonic clock that reads `origin` (ms since the Unix epoch)
    /// now and advances in real time from there.
    pub fn with_origin(origin: u64) -> Self {
        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Sleep until the absolute target of the next tick
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let now_ms = start.elapsed().as_millis() as u64;
                inner_ref.current.store(now_ms, Ordering::Release);

                tick = now_ms + 1;
            }
        });

        // Freshly created, so the cell is always empty here.
        let _ = inner._handle.set(handle);

        Self { inner, origin }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.origin + self.inner.current.load(Ordering::Acquire)
    }
}
