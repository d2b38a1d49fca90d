use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::{
    GeneratorConfig, LockSnowflakeGenerator, Result, SnowflakeId, ThreadRandom, TimeSource,
    WorkerIdSource,
};

type Slot<T> = Arc<OnceCell<Arc<LockSnowflakeGenerator<T>>>>;

/// Lazily creates and caches one generator per logical key.
///
/// The first request for a key asks the [`WorkerIdSource`] for this host's
/// worker ID and builds a [`LockSnowflakeGenerator`] from the registry's
/// template config; every later request for the key returns that same
/// instance. Concurrent first requests for one key block on a per-key cell,
/// so the source is consulted once and exactly one generator is built. A
/// failed creation leaves the key empty and the next request tries again.
///
/// Every generator in one registry shares the host's worker ID, region and
/// epoch, so IDs are unique within a key but two keys may mint the same
/// value in the same millisecond.
///
/// # Example
///
/// ```
/// use regionflake::{GeneratorRegistry, MemoryStore, StoreWorkerIdSource, SystemClock};
///
/// let source = StoreWorkerIdSource::new(MemoryStore::new());
/// let registry = GeneratorRegistry::new(source, "10.0.0.5", SystemClock);
///
/// let orders = registry.get_or_create("orders").unwrap();
/// assert!(std::sync::Arc::ptr_eq(
///     &orders,
///     &registry.get_or_create("orders").unwrap()
/// ));
/// let a = registry.generate("orders").unwrap();
/// let b = registry.generate("orders").unwrap();
/// assert!(a < b);
/// ```
pub struct GeneratorRegistry<W, T>
where
    W: WorkerIdSource,
    T: TimeSource + Clone,
{
    source: W,
    host: String,
    template: GeneratorConfig,
    clock: T,
    generators: DashMap<String, Slot<T>>,
}

impl<W, T> GeneratorRegistry<W, T>
where
    W: WorkerIdSource,
    T: TimeSource + Clone,
{
    /// Builds generators in region 0 with default settings.
    pub fn new(source: W, host: impl Into<String>, clock: T) -> Self {
        Self::with_config(source, host, GeneratorConfig::new(0), clock)
    }

    /// Builds generators from `template`. Its `worker_id` is ignored and
    /// replaced by the one `source` returns for `host`.
    pub fn with_config(
        source: W,
        host: impl Into<String>,
        template: GeneratorConfig,
        clock: T,
    ) -> Self {
        Self {
            source,
            host: host.into(),
            template,
            clock,
            generators: DashMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn source(&self) -> &W {
        &self.source
    }

    /// Returns the generator for `key`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Propagates failures of the worker-ID source and
    /// [`Error::Configuration`] if the template region is out of range.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn get_or_create(&self, key: &str) -> Result<Arc<LockSnowflakeGenerator<T>>> {
        let slot = self.slot(key);
        let generator = slot.get_or_try_init(|| self.create(key))?;
        Ok(Arc::clone(generator))
    }

    /// Returns the generator keyed by the type name of `K`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_or_create`].
    pub fn get_or_create_for<K: ?Sized>(&self) -> Result<Arc<LockSnowflakeGenerator<T>>> {
        self.get_or_create(core::any::type_name::<K>())
    }

    /// Generates the next ID for `key`, creating its generator on first use.
    ///
    /// # Errors
    ///
    /// See [`Self::get_or_create`] and [`LockSnowflakeGenerator::generate`].
    pub fn generate(&self, key: &str) -> Result<SnowflakeId> {
        self.get_or_create(key)?.generate()
    }

    /// Generates the next ID for the key named after `K`.
    ///
    /// # Errors
    ///
    /// See [`Self::generate`].
    pub fn generate_for<K: ?Sized>(&self) -> Result<SnowflakeId> {
        self.generate(core::any::type_name::<K>())
    }

    /// Number of keys with a live generator.
    pub fn len(&self) -> usize {
        self.generators
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the key's cell out of the map so the shard lock is released
    /// before the (blocking) creation runs.
    fn slot(&self, key: &str) -> Slot<T> {
        if let Some(slot) = self.generators.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.generators.entry(key.to_string()).or_default().value())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn create(&self, key: &str) -> Result<Arc<LockSnowflakeGenerator<T>>> {
        let worker_id = self.source.get_worker_id(&self.host)?;
        let config = GeneratorConfig {
            worker_id,
            ..self.template
        };
        let generator =
            LockSnowflakeGenerator::from_config(config, self.clock.clone(), ThreadRandom)?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            key,
            host = %self.host,
            worker_id,
            region_id = config.region_id,
            "created generator"
        );
        Ok(Arc::new(generator))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread::scope,
    };

    use super::*;
    use crate::{
        DEFAULT_EPOCH, Error, MemoryStore, SnowflakeGenerator, StaticWorkerId, StoreWorkerIdSource,
    };

    #[derive(Clone)]
    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn current_millis(&self) -> u64 {
            self.0
        }
    }

    /// Counts how often the allocation protocol runs.
    struct CountingSource<W> {
        inner: W,
        calls: AtomicUsize,
    }

    impl<W> CountingSource<W> {
        fn new(inner: W) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<W: WorkerIdSource> WorkerIdSource for CountingSource<W> {
        fn ensure_namespace(&self) -> Result<()> {
            self.inner.ensure_namespace()
        }

        fn lookup(&self, host: &str) -> Result<Option<u64>> {
            self.inner.lookup(host)
        }

        fn allocate(&self, host: &str) -> Result<u64> {
            self.inner.allocate(host)
        }

        fn persist(&self, host: &str, worker_id: u64) -> Result<()> {
            self.inner.persist(host, worker_id)
        }

        fn get_worker_id(&self, host: &str) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // widen the window for racing first callers
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.inner.get_worker_id(host)
        }
    }

    const NOW: u64 = DEFAULT_EPOCH + 1_000;

    #[test]
    fn concurrent_first_access_creates_once() {
        let source = CountingSource::new(StoreWorkerIdSource::new(MemoryStore::new()));
        let registry = GeneratorRegistry::new(source, "10.0.0.5", FixedTime(NOW));

        let generators = scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| registry.get_or_create("orders").unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        for generator in &generators[1..] {
            assert!(Arc::ptr_eq(&generators[0], generator));
        }
        assert_eq!(registry.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn keys_get_distinct_instances() {
        let registry = GeneratorRegistry::new(
            StoreWorkerIdSource::new(MemoryStore::new()),
            "10.0.0.5",
            FixedTime(NOW),
        );
        assert!(registry.is_empty());

        let orders = registry.get_or_create("orders").unwrap();
        let users = registry.get_or_create("users").unwrap();
        assert!(!Arc::ptr_eq(&orders, &users));
        // same host, same worker id
        assert_eq!(orders.worker_id(), users.worker_id());
        assert_eq!(registry.len(), 2);

        // allocation ran once; the second key reused the recorded id
        let store = registry.source().store();
        assert_eq!(
            store.children("/id_machines/workIdGeneratorNode").unwrap().len(),
            1
        );
    }

    #[test]
    fn generate_uses_cached_instance() {
        let template = GeneratorConfig::new(0)
            .with_region_id(5)
            .with_sequence_reset(crate::SequenceReset::Zero);
        let registry = GeneratorRegistry::with_config(
            StaticWorkerId::new(77).unwrap(),
            "host",
            template,
            FixedTime(NOW),
        );
        let a = registry.generate("orders").unwrap();
        let b = registry.generate("orders").unwrap();
        assert_eq!((a.sequence(), b.sequence()), (0, 1));
        assert_eq!(a.worker_id(), 77);
        assert_eq!(a.region_id(), 5);
        assert_eq!(a.timestamp(), 1_000);

        // a fresh key starts its own sequence
        assert_eq!(registry.generate("users").unwrap().sequence(), 0);
    }

    #[test]
    fn type_keys() {
        struct Order;

        let registry =
            GeneratorRegistry::new(StaticWorkerId::new(1).unwrap(), "host", FixedTime(NOW));
        let by_type = registry.get_or_create_for::<Order>().unwrap();
        let by_name = registry
            .get_or_create(core::any::type_name::<Order>())
            .unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_name));
        registry.generate_for::<Order>().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failed_creation_is_retried() {
        let store = Arc::new(MemoryStore::new());
        let registry = GeneratorRegistry::new(
            StoreWorkerIdSource::new(Arc::clone(&store)),
            "10.0.0.5",
            FixedTime(NOW),
        );

        store.disconnect();
        assert!(matches!(
            registry.get_or_create("orders"),
            Err(Error::CoordinationConnect { .. })
        ));
        assert!(registry.is_empty());

        store.reconnect();
        assert_eq!(registry.get_or_create("orders").unwrap().worker_id(), 0);
    }

    #[test]
    fn invalid_template_region() {
        let registry = GeneratorRegistry::with_config(
            StaticWorkerId::new(1).unwrap(),
            "host",
            GeneratorConfig::new(0).with_region_id(9),
            FixedTime(NOW),
        );
        assert!(matches!(
            registry.get_or_create("orders"),
            Err(Error::Configuration {
                field: "region_id",
                ..
            })
        ));
    }
}
