//! Snowflake-style 64-bit IDs for a small, statically configured fleet.
//!
//! Every ID packs, from the high bit down, a 42-bit millisecond timestamp
//! relative to [`EPOCH_MILLIS`], a 1-bit data-center ID, a 1-bit machine ID and
//! a 20-bit per-millisecond sequence. Up to 2^20 IDs per millisecond per node,
//! four nodes in total.
//!
//! ```
//! use dcflake::{LockSnowflakeGenerator, SystemClock};
//!
//! let generator = LockSnowflakeGenerator::new(1, 0, SystemClock).unwrap();
//! let id = generator.next_id().unwrap();
//! assert_eq!(id.data_center_id(), 1);
//! assert_eq!(id.machine_id(), 0);
//! ```
//!
//! A clock that steps backwards makes `next_id` fail with
//! [`Error::ClockRegression`] instead of risking a duplicate; the caller picks
//! the recovery policy.

mod config;
mod error;
mod generator;
mod id;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::time::*;
