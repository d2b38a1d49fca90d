/// How a node is created in a [`CoordinationStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CreateMode {
    /// The node is created at exactly the requested path and survives the
    /// session that created it.
    Persistent,
    /// Like [`CreateMode::Persistent`], but the store appends a monotonically
    /// increasing 10-digit, zero-padded counter to the requested path. The
    /// counter is scoped to the parent node and never reused.
    PersistentSequential,
}

/// Failures reported by a [`CoordinationStore`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No session with the store could be established, or it was lost.
    #[error("cannot reach coordination store: {reason}")]
    Connect { reason: String },

    /// A node already exists at the requested path.
    #[error("node already exists: {path}")]
    NodeExists { path: String },

    /// The node, or the parent a create needed, does not exist.
    #[error("no node at {path}")]
    NoNode { path: String },

    /// Any other backend failure.
    #[error("{reason}")]
    Backend { reason: String },
}

/// A hierarchical, ZooKeeper-like key space.
///
/// Paths are absolute and `/`-separated. Creating a node requires its parent
/// to exist. Implementations are expected to be safe to share between
/// threads; every method is a blocking round trip to the store.
pub trait CoordinationStore {
    /// Returns whether a node exists at `path`.
    fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Creates a node at `path` holding `data` and returns the path that was
    /// actually created, which differs from `path` for
    /// [`CreateMode::PersistentSequential`].
    fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String, StoreError>;

    /// Reads the data of the node at `path`, or `None` if there is no node.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the data of an existing node.
    fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError>;
}

impl<S: CoordinationStore + ?Sized> CoordinationStore for &S {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        (**self).exists(path)
    }

    fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String, StoreError> {
        (**self).create(path, data, mode)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(path)
    }

    fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).set_data(path, data)
    }
}

impl<S: CoordinationStore + ?Sized> CoordinationStore for std::sync::Arc<S> {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        (**self).exists(path)
    }

    fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String, StoreError> {
        (**self).create(path, data, mode)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(path)
    }

    fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).set_data(path, data)
    }
}
