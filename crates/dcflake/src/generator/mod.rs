mod atomic;
mod interface;
mod lock;
mod mutex;
mod status;

pub use atomic::*;
pub use interface::*;
pub use lock::*;
pub use status::*;

use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{error, trace, warn};

use crate::{EPOCH_MILLIS, Error, Result, SnowflakeId, TimeSource};

/// Converts a clock reading into the timestamp delta stored in an ID.
fn timestamp_delta(now: u64) -> Result<u64> {
    let delta = now.checked_sub(EPOCH_MILLIS).ok_or(Error::ClockBeforeEpoch {
        observed: now,
        epoch: EPOCH_MILLIS,
    })?;
    if delta > SnowflakeId::TIMESTAMP_MASK {
        return Err(Error::TimestampOverflow { delta });
    }
    Ok(delta)
}

#[cold]
#[inline(never)]
fn clock_behind(observed: u64, last: u64) -> Error {
    #[cfg(feature = "tracing")]
    warn!(observed, last, behind_ms = last - observed, "clock moved backwards");
    Error::ClockRegression { observed, last }
}

/// Busy-waits for the clock to pass an exhausted millisecond.
///
/// This is an active spin ([`core::hint::spin_loop`]), never a sleep or a
/// yield: the caller holds its critical section for the whole wait, which is
/// bounded by the clock's resolution when the clock is healthy.
struct SpinWait {
    timeout: Option<Duration>,
    started: Option<Instant>,
}

impl SpinWait {
    const fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            started: None,
        }
    }

    /// Spins until `time` reads strictly later than `last` and returns that
    /// reading.
    ///
    /// The timeout, if any, counts from the first call on this `SpinWait`.
    fn until_after<T: TimeSource + ?Sized>(&mut self, time: &T, last: u64) -> Result<u64> {
        #[cfg(feature = "tracing")]
        trace!(last, "sequence exhausted, spinning for next millisecond");

        if self.timeout.is_some() && self.started.is_none() {
            self.started = Some(Instant::now());
        }

        loop {
            let now = time.current_millis();
            if now > last {
                return Ok(now);
            }

            if let (Some(limit), Some(started)) = (self.timeout, self.started) {
                let waited = started.elapsed();
                if waited >= limit {
                    #[cfg(feature = "tracing")]
                    error!(last, ?waited, "clock stalled past spin timeout");
                    return Err(Error::SpinTimeout {
                        timestamp: last,
                        waited,
                    });
                }
            }

            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod helper_tests {
    use super::*;
    use core::cell::Cell;

    struct Steps {
        values: Vec<u64>,
        index: Cell<usize>,
    }

    impl TimeSource for Steps {
        fn current_millis(&self) -> u64 {
            let i = self.index.get();
            self.index.set((i + 1).min(self.values.len() - 1));
            self.values[i]
        }
    }

    #[test]
    fn delta_rejects_pre_epoch_readings() {
        assert_eq!(timestamp_delta(EPOCH_MILLIS), Ok(0));
        assert_eq!(timestamp_delta(EPOCH_MILLIS + 5000), Ok(5000));
        assert_eq!(
            timestamp_delta(EPOCH_MILLIS - 1),
            Err(Error::ClockBeforeEpoch {
                observed: EPOCH_MILLIS - 1,
                epoch: EPOCH_MILLIS,
            })
        );
    }

    #[test]
    fn delta_rejects_overflow() {
        let max = EPOCH_MILLIS + SnowflakeId::TIMESTAMP_MASK;
        assert_eq!(timestamp_delta(max), Ok(SnowflakeId::TIMESTAMP_MASK));
        assert_eq!(
            timestamp_delta(max + 1),
            Err(Error::TimestampOverflow {
                delta: SnowflakeId::TIMESTAMP_MASK + 1,
            })
        );
    }

    #[test]
    fn spin_returns_first_later_reading() {
        let clock = Steps {
            values: vec![10, 10, 9, 10, 12],
            index: Cell::new(0),
        };
        let got = SpinWait::new(None).until_after(&clock, 10).unwrap();
        assert_eq!(got, 12);
    }

    #[test]
    fn spin_times_out_on_frozen_clock() {
        let clock = Steps {
            values: vec![10],
            index: Cell::new(0),
        };
        let err = SpinWait::new(Some(Duration::from_millis(2)))
            .until_after(&clock, 10)
            .unwrap_err();
        assert!(matches!(err, Error::SpinTimeout { timestamp: 10, waited } if waited >= Duration::from_millis(2)));
    }
}
