use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Result,
    generator::{
        GeneratorConfig, GeneratorState, Mutex, MutexGuard, Poll, SnowflakeGenerator,
        state::{self, State},
    },
    id::SnowflakeId,
    rand::{RandSource, ThreadRandom},
    time::TimeSource,
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The `(last_timestamp, sequence)` state lives behind one [`Mutex`] and every
/// ID is produced inside a single critical section that covers reading the
/// clock, comparing it with the last timestamp, updating the sequence and
/// storing the new timestamp. When a millisecond runs out of sequence values
/// the wait for the next millisecond also happens under the lock.
///
/// Clones share the same state, so they behave as one generator.
///
/// ## Recommended When
/// - Fair access across threads is important
/// - You want the exact blocking semantics of a classic Snowflake generator
///
/// ## See Also
/// - [`AtomicSnowflakeGenerator`]
///
/// [`AtomicSnowflakeGenerator`]: crate::generator::AtomicSnowflakeGenerator
pub struct LockSnowflakeGenerator<T, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<Option<State>>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<Option<State>>>,
    config: GeneratorConfig,
    time: T,
    rng: R,
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for `worker_id` in region 0 with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `worker_id` exceeds 1023.
    ///
    /// # Example
    /// ```
    /// use regionflake::{LockSnowflakeGenerator, SystemClock};
    ///
    /// let generator = LockSnowflakeGenerator::new(7, SystemClock).unwrap();
    /// let a = generator.generate().unwrap();
    /// let b = generator.generate().unwrap();
    /// assert!(a < b);
    /// assert_eq!(a.worker_id(), 7);
    /// ```
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn new(worker_id: u64, time: T) -> Result<Self> {
        Self::from_config(GeneratorConfig::new(worker_id), time, ThreadRandom)
    }

    /// Creates a generator for `worker_id` in `region_id` with default
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either ID exceeds its bit width.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn with_region(worker_id: u64, region_id: u64, time: T) -> Result<Self> {
        Self::from_config(
            GeneratorConfig::new(worker_id).with_region_id(region_id),
            time,
            ThreadRandom,
        )
    }
}

impl<T, R> LockSnowflakeGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Creates a generator from a full configuration and explicit time and
    /// random sources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is out of range.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn from_config(config: GeneratorConfig, time: T, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(None))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(None)),
            config,
            time,
            rng,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns a snapshot of the last accepted timestamp and sequence, or
    /// `None` before the first ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn state(&self) -> Result<Option<GeneratorState>> {
        Ok(self.lock()?.map(|state| state.snapshot(self.config.epoch)))
    }

    /// Generates the next ID using the configured region ID.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::generate_padded`].
    pub fn generate(&self) -> Result<SnowflakeId> {
        self.generate_padded(self.config.region_id)
    }

    /// Generates the next ID with `padding` truncated into the region slot.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::generate_padded`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate_padded(&self, padding: u64) -> Result<SnowflakeId> {
        let mut state = self.lock()?;
        let mut now = self.time.current_millis();
        loop {
            match self.advance(*state, now)? {
                Poll::Ready { id: next } => {
                    *state = Some(next);
                    return Ok(next.compose(padding, self.config.worker_id));
                }
                Poll::Pending { yield_until } => {
                    now = self.wait_until(yield_until + self.config.epoch);
                }
            }
        }
    }

    /// Attempts to generate the next ID using the configured region ID
    /// without waiting.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::generate_padded`].
    pub fn poll_id(&self) -> Result<Poll<SnowflakeId>> {
        self.poll_padded(self.config.region_id)
    }

    /// Non-blocking counterpart of [`Self::generate_padded`].
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::generate_padded`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_padded(&self, padding: u64) -> Result<Poll<SnowflakeId>> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();
        Ok(match self.advance(*state, now)? {
            Poll::Ready { id: next } => {
                *state = Some(next);
                Poll::Ready {
                    id: next.compose(padding, self.config.worker_id),
                }
            }
            Poll::Pending { yield_until } => Poll::Pending {
                yield_until: yield_until + self.config.epoch,
            },
        })
    }

    fn advance(&self, current: Option<State>, now: u64) -> Result<Poll<State>> {
        let tick = state::tick(now, self.config.epoch)?;
        let result = State::advance(current, tick, || {
            self.config.sequence_reset.start(&self.rng)
        });
        #[cfg(feature = "tracing")]
        {
            if let Err(crate::Error::ClockBackward { drift_ms }) = &result {
                tracing::warn!(drift_ms = *drift_ms, "clock moved backwards");
            }
        }
        result
    }

    /// Pauses (per the wait strategy) until the clock reads at least
    /// `yield_until`, and returns that reading.
    #[cold]
    #[inline(never)]
    fn wait_until(&self, yield_until: u64) -> u64 {
        loop {
            self.config.wait.pause();
            let now = self.time.current_millis();
            if now >= yield_until {
                return now;
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<State>>> {
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

impl<T, R> Clone for LockSnowflakeGenerator<T, R>
where
    T: TimeSource + Clone,
    R: RandSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config,
            time: self.time.clone(),
            rng: self.rng.clone(),
        }
    }
}

impl<T, R> SnowflakeGenerator for LockSnowflakeGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn generate_padded(&self, padding: u64) -> Result<SnowflakeId> {
        Self::generate_padded(self, padding)
    }

    fn poll_padded(&self, padding: u64) -> Result<Poll<SnowflakeId>> {
        Self::poll_padded(self, padding)
    }
}
