use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::TimeSource;

/// Reads the operating system's wall clock on every call.
///
/// The wall clock can be stepped backwards (NTP corrections, manual changes),
/// which generators surface as [`Error::ClockBackward`]. Use
/// [`MonotonicClock`] if that should never happen.
///
/// [`Error::ClockBackward`]: crate::Error::ClockBackward
/// [`MonotonicClock`]: crate::time::MonotonicClock
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0, which every epoch rejects.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
