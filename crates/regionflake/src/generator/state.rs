use core::cmp::Ordering;

use crate::{Error, Result, generator::Poll, id::SnowflakeId};

/// Public snapshot of a generator's mutable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorState {
    /// Last clock reading the generator accepted, in Unix milliseconds.
    pub last_timestamp: u64,
    /// Sequence value of the last ID handed out.
    pub sequence: u64,
}

/// The compound `(last_tick, sequence)` state of a generator that has handed
/// out at least one ID. Ticks are milliseconds since the generator's epoch.
///
/// Generators hold an `Option<State>`: `None` until the first ID, so the first
/// reading always starts a new millisecond, even at tick 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct State {
    pub(crate) tick: u64,
    pub(crate) sequence: u64,
}

impl State {
    /// Packed form of a generator that has not produced an ID yet.
    pub(crate) const EMPTY: u64 = 0;

    const SEQUENCE_BITS: u64 = SnowflakeId::SEQUENCE_MASK.count_ones() as u64;

    /// Computes the state after accepting a clock reading of `tick`.
    ///
    /// `reset` supplies the first sequence value of a new millisecond and is
    /// only called when the tick advances. A pending result means the
    /// current millisecond has no sequence values left; `yield_until` is the
    /// first tick at which generation can resume.
    pub(crate) fn advance(
        current: Option<Self>,
        tick: u64,
        reset: impl FnOnce() -> u64,
    ) -> Result<Poll<Self>> {
        let Some(current) = current else {
            return Ok(Poll::Ready {
                id: Self::first(tick, reset),
            });
        };
        match tick.cmp(&current.tick) {
            Ordering::Less => Err(Error::ClockBackward {
                drift_ms: current.tick - tick,
            }),
            Ordering::Equal => {
                let sequence = (current.sequence + 1) & SnowflakeId::SEQUENCE_MASK;
                if sequence == 0 {
                    Ok(Poll::Pending {
                        yield_until: current.tick + 1,
                    })
                } else {
                    Ok(Poll::Ready {
                        id: Self { tick, sequence },
                    })
                }
            }
            Ordering::Greater => Ok(Poll::Ready {
                id: Self::first(tick, reset),
            }),
        }
    }

    fn first(tick: u64, reset: impl FnOnce() -> u64) -> Self {
        Self {
            tick,
            sequence: reset() & SnowflakeId::SEQUENCE_MASK,
        }
    }

    /// Packs the state into one word. The tick is stored off by one so that
    /// no real state packs to [`State::EMPTY`]; 42 tick bits and 10 sequence
    /// bits still fit.
    pub(crate) const fn pack(self) -> u64 {
        ((self.tick + 1) << Self::SEQUENCE_BITS) | self.sequence
    }

    pub(crate) const fn unpack(raw: u64) -> Option<Self> {
        if raw == Self::EMPTY {
            return None;
        }
        Some(Self {
            tick: (raw >> Self::SEQUENCE_BITS) - 1,
            sequence: raw & SnowflakeId::SEQUENCE_MASK,
        })
    }

    pub(crate) const fn compose(self, region: u64, worker: u64) -> SnowflakeId {
        SnowflakeId::from_components(self.tick, region, worker, self.sequence)
    }

    pub(crate) const fn snapshot(self, epoch: u64) -> GeneratorState {
        GeneratorState {
            last_timestamp: self.tick + epoch,
            sequence: self.sequence,
        }
    }
}

/// Converts a clock reading into a tick relative to `epoch`.
pub(crate) fn tick(millis: u64, epoch: u64) -> Result<u64> {
    millis
        .checked_sub(epoch)
        .filter(|tick| *tick <= SnowflakeId::TIMESTAMP_MASK)
        .ok_or(Error::TimestampOutOfRange { millis, epoch })
}
