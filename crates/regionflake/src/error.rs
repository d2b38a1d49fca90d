use crate::worker::StoreError;

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `regionflake` can emit.
///
/// Every variant is surfaced to the immediate caller. The only condition that
/// is retried internally is sequence exhaustion within a single millisecond,
/// which is resolved by waiting for the clock rather than by returning an
/// error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A generator was configured with a component outside its bit width.
    ///
    /// The generator is never constructed.
    #[error("{field} must be in 0..={max}, got {value}")]
    Configuration {
        /// Name of the offending component (`worker_id` or `region_id`).
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// The clock reported a time earlier than the last timestamp the
    /// generator observed. No id was produced and no state was changed.
    #[error("clock moved backwards, refusing to generate id for {drift_ms} milliseconds")]
    ClockBackward {
        /// How far behind the last observed timestamp the clock is.
        drift_ms: u64,
    },

    /// The clock reported a time before the configured epoch, or so far past
    /// it that the 41-bit timestamp field cannot represent it.
    #[error("timestamp {millis} cannot be encoded relative to epoch {epoch}")]
    TimestampOutOfRange {
        /// Clock reading in Unix milliseconds.
        millis: u64,
        /// Configured epoch in Unix milliseconds.
        epoch: u64,
    },

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// Mutexes from the `parking-lot` feature do not poison, so the variant
    /// only exists for the std mutex.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,

    /// A session with the coordination store could not be established or was
    /// lost.
    #[error("coordination store unreachable: {reason}")]
    CoordinationConnect {
        /// Human readable cause reported by the store client.
        reason: String,
    },

    /// A create operation hit a node that already exists, outside of the
    /// namespace bootstrap where that is tolerated.
    #[error("coordination node already exists: {path}")]
    CoordinationConflict {
        /// Path of the conflicting node.
        path: String,
    },

    /// Any other coordination store failure.
    #[error("coordination store error: {0}")]
    Coordination(StoreError),

    /// A worker id could not be read out of a node path or record.
    #[error("cannot parse worker id from {input:?}")]
    Parse {
        /// The text that failed to parse.
        input: String,
    },

    /// The local address or hardware address of this machine could not be
    /// determined.
    #[cfg(feature = "host")]
    #[error("cannot detect host identity: {reason}")]
    HostDetection {
        /// Cause reported while listing network interfaces.
        reason: String,
    },

    /// The store handed out a sequence number that does not fit the 10-bit
    /// worker field.
    #[error("allocated worker id {candidate} exceeds the maximum of {max}")]
    WorkerIdExhausted {
        /// The candidate parsed from the allocation node.
        candidate: u64,
        /// Largest usable worker id.
        max: u64,
    },
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connect { reason } => Self::CoordinationConnect { reason },
            StoreError::NodeExists { path } => Self::CoordinationConflict { path },
            other => Self::Coordination(other),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
