use std::collections::{BTreeMap, HashMap};

use portable_atomic::{AtomicBool, Ordering};

use crate::{
    generator::{Mutex, MutexGuard},
    worker::{CoordinationStore, CreateMode, StoreError},
};

/// An in-process [`CoordinationStore`].
///
/// Mirrors the parts of ZooKeeper's data model the worker-id allocator relies
/// on: nodes need an existing parent, and each parent keeps a child counter
/// that increments on every create beneath it and feeds the suffix of
/// sequential nodes. State lives as long as the value, so it is best suited
/// to tests, single-process deployments and demos.
///
/// [`MemoryStore::disconnect`] makes every call fail with
/// [`StoreError::Connect`] until [`MemoryStore::reconnect`] is called.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    disconnected: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<String, Vec<u8>>,
    counters: HashMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a lost session.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    pub fn reconnect(&self) {
        self.disconnected.store(false, Ordering::Release);
    }

    /// Lists the paths of the direct children of `parent`, in order.
    pub fn children(&self, parent: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.session()?;
        Ok(inner
            .nodes
            .keys()
            .filter(|path| parent_of(path) == Some(parent))
            .cloned()
            .collect())
    }

    fn session(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(StoreError::Connect {
                reason: "session closed".to_string(),
            });
        }
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.inner.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            self.inner.lock().map_err(|_| StoreError::Backend {
                reason: "memory store lock poisoned".to_string(),
            })
        }
    }
}

impl Inner {
    fn contains(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }
}

/// Returns the parent of an absolute path; `/` for top-level nodes.
fn parent_of(path: &str) -> Option<&str> {
    match path.rsplit_once('/')? {
        ("", "") => None,
        ("", _) => Some("/"),
        (parent, _) => Some(parent),
    }
}

impl CoordinationStore for MemoryStore {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.session()?.contains(path))
    }

    fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String, StoreError> {
        let mut inner = self.session()?;
        let parent = parent_of(path)
            .ok_or_else(|| StoreError::NodeExists {
                path: path.to_string(),
            })?
            .to_string();
        if !inner.contains(&parent) {
            return Err(StoreError::NoNode { path: parent });
        }

        let counter = inner.counters.get(&parent).copied().unwrap_or_default();
        let created = match mode {
            CreateMode::Persistent => path.to_string(),
            CreateMode::PersistentSequential => format!("{path}{counter:010}"),
        };
        if inner.nodes.contains_key(&created) {
            return Err(StoreError::NodeExists { path: created });
        }

        inner.counters.insert(parent, counter + 1);
        inner.nodes.insert(created.clone(), data.to_vec());
        Ok(created)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.session()?.nodes.get(path).cloned())
    }

    fn set_data(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.session()?;
        match inner.nodes.get_mut(path) {
            Some(slot) => {
                *slot = data.to_vec();
                Ok(())
            }
            None => Err(StoreError::NoNode {
                path: path.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/a"), Some("/"));
        assert_eq!(parent_of("/a/b"), Some("/a"));
        assert_eq!(parent_of("/a/b/"), Some("/a/b"));
    }

    #[test]
    fn create_requires_parent() {
        let store = MemoryStore::new();
        assert_eq!(
            store.create("/a/b", b"", CreateMode::Persistent),
            Err(StoreError::NoNode {
                path: "/a".to_string()
            })
        );
        store.create("/a", b"", CreateMode::Persistent).unwrap();
        assert_eq!(
            store.create("/a/b", b"x", CreateMode::Persistent).unwrap(),
            "/a/b"
        );
        assert_eq!(store.read("/a/b").unwrap(), Some(b"x".to_vec()));
        assert!(store.exists("/").unwrap());
    }

    #[test]
    fn duplicate_create_conflicts() {
        let store = MemoryStore::new();
        store.create("/a", b"", CreateMode::Persistent).unwrap();
        assert_eq!(
            store.create("/a", b"", CreateMode::Persistent),
            Err(StoreError::NodeExists {
                path: "/a".to_string()
            })
        );
    }

    #[test]
    fn sequential_suffix_is_scoped_to_parent() {
        let store = MemoryStore::new();
        store.create("/a", b"", CreateMode::Persistent).unwrap();
        store.create("/b", b"", CreateMode::Persistent).unwrap();

        let seq = CreateMode::PersistentSequential;
        assert_eq!(store.create("/a/n", b"", seq).unwrap(), "/a/n0000000000");
        assert_eq!(store.create("/a/n", b"", seq).unwrap(), "/a/n0000000001");
        // plain creates advance the parent's counter too
        store.create("/a/x", b"", CreateMode::Persistent).unwrap();
        assert_eq!(store.create("/a/m", b"", seq).unwrap(), "/a/m0000000003");
        assert_eq!(store.create("/b/n", b"", seq).unwrap(), "/b/n0000000000");

        assert_eq!(
            store.children("/a").unwrap(),
            ["/a/m0000000003", "/a/n0000000000", "/a/n0000000001", "/a/x"]
        );
    }

    #[test]
    fn set_data_requires_node() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_data("/missing", b"1"),
            Err(StoreError::NoNode { .. })
        ));
        store.create("/present", b"1", CreateMode::Persistent).unwrap();
        store.set_data("/present", b"2").unwrap();
        assert_eq!(store.read("/present").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn disconnected_store_refuses_calls() {
        let store = MemoryStore::new();
        store.disconnect();
        assert!(matches!(store.exists("/"), Err(StoreError::Connect { .. })));
        assert!(matches!(store.read("/a"), Err(StoreError::Connect { .. })));
        store.reconnect();
        assert!(store.exists("/").unwrap());
    }
}
