use core::time::Duration;
use std::thread;

use crate::{Error, Result, id::SnowflakeId, rand::RandSource, time::DEFAULT_EPOCH};

/// How the sequence counter restarts when the clock moves to a new
/// millisecond.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SequenceReset {
    /// Start at a random value in `0..=9`.
    ///
    /// This makes the first ID of each millisecond slightly less predictable
    /// while giving up at most 9 of the 1024 IDs available per millisecond.
    /// It draws very little entropy and is kept for compatibility with
    /// existing deployments that expect this distribution.
    #[default]
    Narrow,
    /// Always start at 0. Fully deterministic, full per-millisecond
    /// throughput.
    Zero,
    /// Start at a random value anywhere in the 10-bit range.
    ///
    /// Maximizes unpredictability, but a high starting point leaves few IDs
    /// before the millisecond is exhausted and the generator has to wait.
    Full,
}

impl SequenceReset {
    /// Returns the first sequence value of a new millisecond.
    pub fn start(self, rng: &impl RandSource) -> u64 {
        match self {
            Self::Narrow => rng.rand() % 10,
            Self::Zero => 0,
            Self::Full => rng.rand() & SnowflakeId::SEQUENCE_MASK,
        }
    }
}

/// What a generator does while waiting for the clock to leave an exhausted
/// millisecond.
///
/// The wait is bounded by real time, typically well under a millisecond, and
/// happens while the generator's critical section is held, so every other
/// caller of the same generator waits with it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WaitStrategy {
    /// Busy-spin with [`core::hint::spin_loop`]. Lowest latency, burns a core.
    #[default]
    Spin,
    /// Call [`std::thread::yield_now`] between clock reads.
    Yield,
    /// Sleep for the given duration between clock reads.
    Sleep(Duration),
}

impl WaitStrategy {
    /// Pauses once between two clock reads.
    pub fn pause(self) {
        match self {
            Self::Spin => core::hint::spin_loop(),
            Self::Yield => thread::yield_now(),
            Self::Sleep(duration) => thread::sleep(duration),
        }
    }
}

/// Construction parameters of a generator.
///
/// # Example
///
/// ```
/// use regionflake::{GeneratorConfig, SequenceReset, WaitStrategy};
///
/// let config = GeneratorConfig::new(42)
///     .with_region_id(3)
///     .with_sequence_reset(SequenceReset::Zero)
///     .with_wait(WaitStrategy::Yield);
/// assert!(config.validate().is_ok());
/// assert!(GeneratorConfig::new(1024).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    /// Worker ID encoded into every ID, `0..=1023`.
    pub worker_id: u64,
    /// Region ID encoded into every ID unless padded, `0..=7`.
    pub region_id: u64,
    /// Origin of the timestamp field, in Unix milliseconds.
    pub epoch: u64,
    /// Sequence restart policy for each new millisecond.
    pub sequence_reset: SequenceReset,
    /// Behavior while waiting out an exhausted millisecond.
    pub wait: WaitStrategy,
}

impl GeneratorConfig {
    /// Largest accepted worker ID.
    pub const MAX_WORKER_ID: u64 = SnowflakeId::WORKER_ID_MASK;

    /// Largest accepted region ID.
    pub const MAX_REGION_ID: u64 = SnowflakeId::REGION_ID_MASK;

    /// Creates a config for `worker_id` in region 0 with the default epoch,
    /// the narrow sequence reset and busy-spin waiting.
    pub const fn new(worker_id: u64) -> Self {
        Self {
            worker_id,
            region_id: 0,
            epoch: DEFAULT_EPOCH,
            sequence_reset: SequenceReset::Narrow,
            wait: WaitStrategy::Spin,
        }
    }

    pub const fn with_region_id(mut self, region_id: u64) -> Self {
        self.region_id = region_id;
        self
    }

    pub const fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub const fn with_sequence_reset(mut self, sequence_reset: SequenceReset) -> Self {
        self.sequence_reset = sequence_reset;
        self
    }

    pub const fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Checks that the worker and region IDs fit their bit widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        check("worker_id", self.worker_id, Self::MAX_WORKER_ID)?;
        check("region_id", self.region_id, Self::MAX_REGION_ID)
    }
}

fn check(field: &'static str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::Configuration { field, value, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRand(u64);
    impl RandSource for FixedRand {
        fn rand(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn narrow_reset_stays_below_ten() {
        for raw in [0, 9, 10, 1234, u64::MAX] {
            assert!(SequenceReset::Narrow.start(&FixedRand(raw)) <= 9);
        }
        assert_eq!(SequenceReset::Narrow.start(&FixedRand(1234)), 4);
    }

    #[test]
    fn zero_reset_ignores_rng() {
        assert_eq!(SequenceReset::Zero.start(&FixedRand(u64::MAX)), 0);
    }

    #[test]
    fn full_reset_spans_sequence_field() {
        assert_eq!(SequenceReset::Full.start(&FixedRand(u64::MAX)), 1023);
        assert_eq!(SequenceReset::Full.start(&FixedRand(1024 + 17)), 17);
    }

    #[test]
    fn validate_reports_offending_field() {
        assert_eq!(
            GeneratorConfig::new(1024).validate(),
            Err(Error::Configuration {
                field: "worker_id",
                value: 1024,
                max: 1023
            })
        );
        assert_eq!(
            GeneratorConfig::new(0).with_region_id(8).validate(),
            Err(Error::Configuration {
                field: "region_id",
                value: 8,
                max: 7
            })
        );
        assert!(GeneratorConfig::new(1023).with_region_id(7).validate().is_ok());
    }

    #[test]
    fn defaults() {
        let config = GeneratorConfig::new(5);
        assert_eq!(config.region_id, 0);
        assert_eq!(config.epoch, DEFAULT_EPOCH);
        assert_eq!(config.sequence_reset, SequenceReset::Narrow);
        assert_eq!(config.wait, WaitStrategy::Spin);
    }
}
