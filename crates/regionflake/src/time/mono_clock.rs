use core::time::Duration;
use std::{
    sync::Arc,
    thread,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use portable_atomic::{AtomicU64, Ordering};

use crate::time::TimeSource;

/// Millisecond counter advanced by the ticker thread.
#[derive(Debug)]
struct Ticker {
    elapsed: AtomicU64,
}

/// A time source that never goes backwards.
///
/// At construction the clock reads the wall clock once to anchor itself to
/// Unix time, then advances purely from [`Instant`], so NTP steps or manual
/// clock changes after startup are invisible to it. A background thread
/// refreshes a shared atomic counter once per millisecond, keeping syscalls
/// off the hot path. The thread exits once every clone has been dropped.
///
/// Generators built on this clock can still observe their own
/// `last_timestamp` ahead of "now" only if they were seeded with a later
/// state; under normal use `ClockBackward` is unreachable.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    ticker: Arc<Ticker>,
    anchor: u64, // Unix milliseconds at construction
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Creates a clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        let start = Instant::now();
        let anchor = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let ticker = Arc::new(Ticker {
            elapsed: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&ticker);
        thread::spawn(move || {
            let mut tick = 0;

            while let Some(ticker) = weak.upgrade() {
                // Sleep until the absolute time of the next tick
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                // Oversleeping skips ticks rather than lagging behind
                let elapsed = start.elapsed().as_millis() as u64;
                ticker.elapsed.store(elapsed, Ordering::Relaxed);
                tick = elapsed + 1;
            }
        });

        Self { ticker, anchor }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.anchor + self.ticker.elapsed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut last = clock.current_millis();
        for _ in 0..10_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn advances_with_real_time() {
        let clock = MonotonicClock::new();
        let start = clock.current_millis();
        thread::sleep(Duration::from_millis(20));
        assert!(clock.current_millis() > start);
    }

    #[test]
    fn clones_share_the_ticker() {
        let clock = MonotonicClock::new();
        let other = clock.clone();
        thread::sleep(Duration::from_millis(5));
        let a = clock.current_millis();
        let b = other.current_millis();
        assert!(a.abs_diff(b) <= 1);
    }
}
