use crate::{
    Result,
    generator::{GeneratorConfig, Poll},
    id::SnowflakeId,
};

/// A minimal interface for generating region-aware Snowflake IDs.
///
/// Implementations must make [`SnowflakeGenerator::generate_padded`] a single
/// critical section over the `(last_timestamp, sequence)` state, so that IDs
/// are unique and strictly increasing per instance no matter how many threads
/// share it.
pub trait SnowflakeGenerator {
    /// Returns the configuration the generator was built with.
    fn config(&self) -> &GeneratorConfig;

    /// Generates the next ID with `padding` in the region slot.
    ///
    /// `padding` is not bounds-checked; it is truncated to the 3-bit region
    /// field. Use this to tag IDs with a business-defined value when region
    /// based uniqueness is not needed.
    ///
    /// Blocks while the current millisecond's sequence space is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockBackward`] if the clock is behind the last accepted
    ///   timestamp
    /// - [`Error::TimestampOutOfRange`] if the clock cannot be encoded
    ///   against the epoch
    /// - [`Error::LockPoisoned`] if the generator's mutex is poisoned
    ///
    /// [`Error::ClockBackward`]: crate::Error::ClockBackward
    /// [`Error::TimestampOutOfRange`]: crate::Error::TimestampOutOfRange
    /// [`Error::LockPoisoned`]: crate::Error
    fn generate_padded(&self, padding: u64) -> Result<SnowflakeId>;

    /// Non-blocking counterpart of [`SnowflakeGenerator::generate_padded`].
    ///
    /// Returns [`Poll::Pending`] instead of waiting when the current
    /// millisecond is exhausted; the state is left untouched in that case.
    fn poll_padded(&self, padding: u64) -> Result<Poll<SnowflakeId>>;

    /// Generates the next ID using the configured region ID.
    fn generate(&self) -> Result<SnowflakeId> {
        self.generate_padded(self.config().region_id)
    }

    /// Attempts to generate the next ID using the configured region ID
    /// without waiting.
    fn poll_id(&self) -> Result<Poll<SnowflakeId>> {
        self.poll_padded(self.config().region_id)
    }

    fn worker_id(&self) -> u64 {
        self.config().worker_id
    }

    fn region_id(&self) -> u64 {
        self.config().region_id
    }

    fn epoch(&self) -> u64 {
        self.config().epoch
    }

    /// Returns the time embedded in `id` as Unix milliseconds.
    fn decode_time(&self, id: SnowflakeId) -> u64 {
        id.unix_millis(self.epoch())
    }

    /// Returns the shifted timestamp component for `unix_millis`, see
    /// [`SnowflakeId::timestamp_prefix`].
    fn timestamp_prefix(&self, unix_millis: u64) -> u64 {
        SnowflakeId::timestamp_prefix(unix_millis, self.epoch())
    }
}
