use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, Result,
    generator::GeneratorConfig,
    worker::{CoordinationStore, CreateMode, StoreError},
};

/// Number of digits a store appends to sequential node names.
const SEQUENTIAL_SUFFIX_LEN: usize = 10;

/// A source of worker IDs that is stable per host.
///
/// The four steps are exposed separately so that strategies can be swapped
/// or tested in isolation; [`WorkerIdSource::get_worker_id`] chains them
/// into the allocation protocol:
///
/// 1. make sure the namespace exists
/// 2. return the recorded ID if the host already has one
/// 3. otherwise allocate a fresh candidate and record it
pub trait WorkerIdSource {
    /// Creates the store layout if it is missing. Losing a creation race to
    /// another host is not an error.
    fn ensure_namespace(&self) -> Result<()>;

    /// Returns the worker ID previously recorded for `host`, if any.
    fn lookup(&self, host: &str) -> Result<Option<u64>>;

    /// Reserves a new worker ID for `host` without recording it.
    fn allocate(&self, host: &str) -> Result<u64>;

    /// Records `worker_id` as the assignment for `host`.
    ///
    /// Not idempotent: an existing record is reported as a conflict.
    fn persist(&self, host: &str, worker_id: u64) -> Result<()>;

    /// Returns the worker ID of `host`, allocating and recording one on first
    /// use. Repeated calls for the same host return the same ID, across
    /// process restarts as long as the store keeps its data.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step; nothing is retried.
    fn get_worker_id(&self, host: &str) -> Result<u64> {
        self.ensure_namespace()?;
        if let Some(worker_id) = self.lookup(host)? {
            return Ok(worker_id);
        }
        let worker_id = self.allocate(host)?;
        self.persist(host, worker_id)?;
        Ok(worker_id)
    }
}

impl<W: WorkerIdSource + ?Sized> WorkerIdSource for Arc<W> {
    fn ensure_namespace(&self) -> Result<()> {
        (**self).ensure_namespace()
    }

    fn lookup(&self, host: &str) -> Result<Option<u64>> {
        (**self).lookup(host)
    }

    fn allocate(&self, host: &str) -> Result<u64> {
        (**self).allocate(host)
    }

    fn persist(&self, host: &str, worker_id: u64) -> Result<()> {
        (**self).persist(host, worker_id)
    }

    fn get_worker_id(&self, host: &str) -> Result<u64> {
        (**self).get_worker_id(host)
    }
}

/// Node layout used by [`StoreWorkerIdSource`].
///
/// The defaults reproduce the layout deployed generators already use:
///
/// ```text
/// /id_machines
/// ├── workIdGeneratorNode/<host><10-digit counter>   one per allocation
/// └── workIdSaveNode/<host>                          data = decimal worker id
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Absolute path of the root node, without a trailing `/`.
    pub root: String,
    /// Name of the child of `root` that holds allocation nodes.
    pub allocation: String,
    /// Name of the child of `root` that holds assignment records.
    pub assignment: String,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            root: "/id_machines".to_string(),
            allocation: "workIdGeneratorNode".to_string(),
            assignment: "workIdSaveNode".to_string(),
        }
    }
}

impl Namespace {
    /// Default child names under a custom root.
    pub fn with_root(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            root: root.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn allocation_path(&self) -> String {
        format!("{}/{}", self.root, self.allocation)
    }

    pub fn assignment_path(&self) -> String {
        format!("{}/{}", self.root, self.assignment)
    }

    /// Path requested for a sequential allocation node of `host`.
    pub fn allocation_node(&self, host: &str) -> String {
        format!("{}/{}/{host}", self.root, self.allocation)
    }

    /// Path of the assignment record of `host`.
    pub fn assignment_node(&self, host: &str) -> String {
        format!("{}/{}/{host}", self.root, self.assignment)
    }
}

/// Allocates worker IDs from the sequential counter of a
/// [`CoordinationStore`] and records them per host.
///
/// # Example
///
/// ```
/// use regionflake::{MemoryStore, StoreWorkerIdSource, WorkerIdSource};
///
/// let source = StoreWorkerIdSource::new(MemoryStore::new());
/// let first = source.get_worker_id("10.0.0.5").unwrap();
/// let again = source.get_worker_id("10.0.0.5").unwrap();
/// assert_eq!(first, again);
/// assert_ne!(source.get_worker_id("10.0.0.6").unwrap(), first);
/// ```
#[derive(Debug)]
pub struct StoreWorkerIdSource<S> {
    store: S,
    namespace: Namespace,
}

impl<S> StoreWorkerIdSource<S>
where
    S: CoordinationStore,
{
    /// Uses the default [`Namespace`].
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, Namespace::default())
    }

    pub fn with_namespace(store: S, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn create_if_absent(&self, path: &str) -> Result<()> {
        match self.store.create(path, b"", CreateMode::Persistent) {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path, "created namespace node");
                Ok(())
            }
            Err(StoreError::NodeExists { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S> WorkerIdSource for StoreWorkerIdSource<S>
where
    S: CoordinationStore,
{
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn ensure_namespace(&self) -> Result<()> {
        if self.store.exists(&self.namespace.root)? {
            return Ok(());
        }
        self.create_if_absent(&self.namespace.root)?;
        self.create_if_absent(&self.namespace.allocation_path())?;
        self.create_if_absent(&self.namespace.assignment_path())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn lookup(&self, host: &str) -> Result<Option<u64>> {
        let Some(data) = self.store.read(&self.namespace.assignment_node(host))? else {
            return Ok(None);
        };
        let worker_id = parse_record(&data)?;
        #[cfg(feature = "tracing")]
        tracing::info!(host, worker_id, "reusing recorded worker id");
        Ok(Some(worker_id))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn allocate(&self, host: &str) -> Result<u64> {
        let created = self.store.create(
            &self.namespace.allocation_node(host),
            b"",
            CreateMode::PersistentSequential,
        )?;
        let worker_id = check_range(parse_sequential_suffix(&created)?)?;
        #[cfg(feature = "tracing")]
        tracing::info!(host, worker_id, node = %created, "allocated worker id");
        Ok(worker_id)
    }

    fn persist(&self, host: &str, worker_id: u64) -> Result<()> {
        self.store.create(
            &self.namespace.assignment_node(host),
            worker_id.to_string().as_bytes(),
            CreateMode::Persistent,
        )?;
        Ok(())
    }
}

/// Extracts the counter a store appended to a sequential node path.
///
/// The last ten characters must be decimal digits; leading zeros are
/// insignificant, so `…0000000042` yields 42 and `…0000000000` yields 0.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the path has no 10-digit suffix.
pub fn parse_sequential_suffix(path: &str) -> Result<u64> {
    let parse_error = || Error::Parse {
        input: path.to_string(),
    };
    let suffix = path
        .len()
        .checked_sub(SEQUENTIAL_SUFFIX_LEN)
        .and_then(|start| path.get(start..))
        .filter(|suffix| suffix.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(parse_error)?;
    suffix.parse().map_err(|_| parse_error())
}

fn parse_record(data: &[u8]) -> Result<u64> {
    let text = String::from_utf8_lossy(data);
    let worker_id = text.trim().parse().map_err(|_| Error::Parse {
        input: text.to_string(),
    })?;
    check_range(worker_id)
}

fn check_range(candidate: u64) -> Result<u64> {
    if candidate > GeneratorConfig::MAX_WORKER_ID {
        return Err(Error::WorkerIdExhausted {
            candidate,
            max: GeneratorConfig::MAX_WORKER_ID,
        });
    }
    Ok(candidate)
}

/// A fixed worker ID, for deployments that assign IDs out of band.
///
/// Every host gets the same ID and nothing is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StaticWorkerId(u64);

impl StaticWorkerId {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `worker_id` exceeds 1023.
    pub fn new(worker_id: u64) -> Result<Self> {
        GeneratorConfig::new(worker_id).validate()?;
        Ok(Self(worker_id))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl WorkerIdSource for StaticWorkerId {
    fn ensure_namespace(&self) -> Result<()> {
        Ok(())
    }

    fn lookup(&self, _host: &str) -> Result<Option<u64>> {
        Ok(Some(self.0))
    }

    fn allocate(&self, _host: &str) -> Result<u64> {
        Ok(self.0)
    }

    fn persist(&self, _host: &str, _worker_id: u64) -> Result<()> {
        Ok(())
    }
}
