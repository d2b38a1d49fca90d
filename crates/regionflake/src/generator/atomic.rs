use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Result,
    generator::{
        GeneratorConfig, GeneratorState, Poll, SnowflakeGenerator,
        state::{self, State},
    },
    id::SnowflakeId,
    rand::{RandSource, ThreadRandom},
    time::TimeSource,
};

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The `(last_timestamp, sequence)` state is packed into a single
/// [`AtomicU64`] and every transition is committed with one compare-and-swap,
/// so the clock comparison and the sequence update are still observed as one
/// indivisible step. A caller that loses the race simply retries against the
/// fresh state.
///
/// ## Recommended When
/// - Throughput under contention matters more than fairness
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::generator::LockSnowflakeGenerator
pub struct AtomicSnowflakeGenerator<T, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    config: GeneratorConfig,
    time: T,
    rng: R,
}

impl<T> AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for `worker_id` in region 0 with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `worker_id` exceeds 1023.
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

impl<T, R> AtomicSnowflakeGenerator<T, R>
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
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(State::EMPTY)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(State::EMPTY),
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
    pub fn state(&self) -> Option<GeneratorState> {
        State::unpack(self.state.load(Ordering::Acquire))
            .map(|state| state.snapshot(self.config.epoch))
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
        loop {
            match self.poll_padded(padding)? {
                Poll::Ready { id } => return Ok(id),
                Poll::Pending { yield_until } => self.wait_until(yield_until),
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
    /// Lost compare-and-swap races are retried internally; `Pending` is only
    /// returned for an exhausted millisecond.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::generate_padded`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_padded(&self, padding: u64) -> Result<Poll<SnowflakeId>> {
        loop {
            // Load before reading the clock: any state we see was built from
            // an earlier reading, so a monotonic clock never looks backwards.
            let current_raw = self.state.load(Ordering::Acquire);
            let now = self.time.current_millis();
            let tick = state::tick(now, self.config.epoch)?;

            let next = match State::advance(State::unpack(current_raw), tick, || {
                self.config.sequence_reset.start(&self.rng)
            }) {
                Ok(Poll::Ready { id }) => id,
                Ok(Poll::Pending { yield_until }) => {
                    return Ok(Poll::Pending {
                        yield_until: yield_until + self.config.epoch,
                    });
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "refusing to generate id");
                    return Err(e);
                }
            };

            if self
                .state
                .compare_exchange(current_raw, next.pack(), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(Poll::Ready {
                    id: next.compose(padding, self.config.worker_id),
                });
            }
            core::hint::spin_loop();
        }
    }

    #[cold]
    #[inline(never)]
    fn wait_until(&self, yield_until: u64) {
        while self.time.current_millis() < yield_until {
            self.config.wait.pause();
        }
    }
}

impl<T, R> SnowflakeGenerator for AtomicSnowflakeGenerator<T, R>
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
