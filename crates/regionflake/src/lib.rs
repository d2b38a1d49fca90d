#![doc = include_str!("../README.md")]

mod error;
pub mod generator;
pub mod id;
pub mod rand;
pub mod registry;
pub mod time;
pub mod worker;

pub use crate::error::*;
pub use crate::generator::{
    AtomicSnowflakeGenerator, GeneratorConfig, LockSnowflakeGenerator, Poll, SequenceReset,
    SnowflakeGenerator, WaitStrategy,
};
pub use crate::id::SnowflakeId;
pub use crate::rand::{RandSource, ThreadRandom};
pub use crate::registry::GeneratorRegistry;
pub use crate::time::{DEFAULT_EPOCH, MonotonicClock, SystemClock, TimeSource};
pub use crate::worker::{
    CoordinationStore, CreateMode, MemoryStore, Namespace, ProcessWorkerId, StaticWorkerId,
    StoreError, StoreWorkerIdSource, WorkerIdSource,
};
#[cfg(feature = "host")]
pub use crate::worker::local_host_id;
