use core::fmt;

/// A 64-bit Snowflake ID carrying a region and a worker id.
///
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 3 bits region ID (datacenter or zone, or a caller supplied padding)
/// - 10 bits worker ID
/// - 10 bits sequence
///
/// ```text
///  Bit Index:  63             23 22          20 19            10 9              0
///              +----------------+--------------+----------------+---------------+
///  Field:      | timestamp (41) | region ID (3)| worker ID (10) | sequence (10) |
///              +----------------+--------------+----------------+---------------+
///              |<----- MSB ---------------- 64 bits ---------------- LSB ------>|
/// ```
///
/// The timestamp is stored relative to an epoch that is not part of the ID.
/// Use [`SnowflakeId::unix_millis`] with the epoch the generator was
/// configured with to recover wall-clock time.
///
/// # Example
///
/// ```
/// use regionflake::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 2, 17, 5);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.region_id(), 2);
/// assert_eq!(id.worker_id(), 17);
/// assert_eq!(id.sequence(), 5);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 23
    /// through 63.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for extracting the 3-bit region ID field. Occupies bits 20
    /// through 22.
    pub const REGION_ID_MASK: u64 = (1 << 3) - 1;

    /// Bitmask for extracting the 10-bit worker ID field. Occupies bits 10
    /// through 19.
    pub const WORKER_ID_MASK: u64 = (1 << 10) - 1;

    /// Bitmask for extracting the 10-bit sequence field. Occupies bits 0
    /// through 9.
    pub const SEQUENCE_MASK: u64 = (1 << 10) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 23).
    pub const TIMESTAMP_SHIFT: u64 = 23;

    /// Number of bits to shift the region ID to its correct position (bit 20).
    pub const REGION_ID_SHIFT: u64 = 20;

    /// Number of bits to shift the worker ID to its correct position (bit 10).
    pub const WORKER_ID_SHIFT: u64 = 10;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the four components into an ID. Each component is truncated to
    /// its field width.
    pub const fn from_components(
        timestamp: u64,
        region_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let region_id = (region_id & Self::REGION_ID_MASK) << Self::REGION_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | region_id | worker_id | sequence,
        }
    }

    /// Wraps a raw 64-bit value without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the raw 64-bit value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Extracts the epoch-relative timestamp from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the region ID (or padding) from the packed ID.
    pub const fn region_id(&self) -> u64 {
        (self.id >> Self::REGION_ID_SHIFT) & Self::REGION_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the embedded time as Unix milliseconds, given the epoch the ID
    /// was generated against.
    ///
    /// This is the exact inverse of the timestamp encoding:
    /// `(id >> 23) + epoch`.
    pub const fn unix_millis(&self, epoch: u64) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) + epoch
    }

    /// Returns only the shifted timestamp component for `unix_millis`.
    ///
    /// The result is not a mintable ID. It is a boundary value comparable
    /// against the upper bits of real IDs, e.g. to select every ID created at
    /// or after a point in time. Times before `epoch` clamp to zero.
    ///
    /// ```
    /// use regionflake::{DEFAULT_EPOCH, SnowflakeId};
    ///
    /// let at = DEFAULT_EPOCH + 10;
    /// let id = SnowflakeId::from_components(10, 3, 42, 7);
    /// let mask = SnowflakeId::TIMESTAMP_MASK << SnowflakeId::TIMESTAMP_SHIFT;
    /// assert_eq!(SnowflakeId::timestamp_prefix(at, DEFAULT_EPOCH), id.to_raw() & mask);
    /// ```
    pub const fn timestamp_prefix(unix_millis: u64, epoch: u64) -> u64 {
        (unix_millis.saturating_sub(epoch) & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<u64> for SnowflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("raw", &format_args!("0x{:016x}", self.id))
            .field("timestamp", &self.timestamp())
            .field("region_id", &self.region_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
