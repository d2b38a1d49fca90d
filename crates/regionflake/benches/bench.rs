use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use regionflake::{
    AtomicSnowflakeGenerator, DEFAULT_EPOCH, GeneratorConfig, GeneratorRegistry,
    LockSnowflakeGenerator, MemoryStore, MonotonicClock, Poll, SequenceReset, SnowflakeGenerator,
    StoreWorkerIdSource, ThreadRandom, TimeSource,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// One full millisecond of sequence values, so a fixed clock never stalls.
const TOTAL_IDS: usize = 1024;

fn fixed_config() -> GeneratorConfig {
    GeneratorConfig::new(0).with_sequence_reset(SequenceReset::Zero)
}

fn fixed_clock() -> FixedMockTime {
    FixedMockTime {
        millis: DEFAULT_EPOCH + 1,
    }
}

/// Benchmarks a hot path where every poll is `Ready`.
fn bench_generator<G>(c: &mut Criterion, group_name: &str, generator_factory: impl Fn() -> G)
where
    G: SnowflakeGenerator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    match generator.poll_id() {
                        Ok(Poll::Ready { id }) => {
                            black_box(id);
                        }
                        _ => unreachable!(),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks the blocking path against a real clock.
fn bench_generator_blocking<G>(c: &mut Criterion, group_name: &str, generator: G)
where
    G: SnowflakeGenerator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(generator.generate().unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmarks one generator shared across threads with a fixed clock.
fn bench_generator_contended<G>(c: &mut Criterion, group_name: &str, generator_fn: impl Fn() -> G)
where
    G: SnowflakeGenerator + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);

    for thread_count in [1, 2, 4, 8, 16] {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(
            format!("elems/{}/threads/{}", TOTAL_IDS, thread_count),
            |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();

                    for _ in 0..iters {
                        let generator = Arc::new(generator_fn());
                        let barrier = Arc::new(Barrier::new(thread_count + 1));
                        scope(|s| {
                            for _ in 0..thread_count {
                                let generator = Arc::clone(&generator);
                                let barrier = Arc::clone(&barrier);
                                s.spawn(move || {
                                    barrier.wait();
                                    for _ in 0..ids_per_thread {
                                        match generator.poll_id() {
                                            Ok(Poll::Ready { id }) => {
                                                black_box(id);
                                            }
                                            _ => unreachable!(),
                                        }
                                    }
                                });
                            }
                            barrier.wait();
                        });
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_mock_sequential_lock(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/lock", || {
        LockSnowflakeGenerator::from_config(fixed_config(), fixed_clock(), ThreadRandom).unwrap()
    });
}

fn benchmark_mock_sequential_atomic(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/atomic", || {
        AtomicSnowflakeGenerator::from_config(fixed_config(), fixed_clock(), ThreadRandom).unwrap()
    });
}

fn benchmark_mock_contended_lock(c: &mut Criterion) {
    bench_generator_contended(c, "mock/contended/lock", || {
        LockSnowflakeGenerator::from_config(fixed_config(), fixed_clock(), ThreadRandom).unwrap()
    });
}

/// CAS failures are retried inside `poll_id`.
fn benchmark_mock_contended_atomic(c: &mut Criterion) {
    bench_generator_contended(c, "mock/contended/atomic", || {
        AtomicSnowflakeGenerator::from_config(fixed_config(), fixed_clock(), ThreadRandom).unwrap()
    });
}

fn benchmark_mono_sequential_lock(c: &mut Criterion) {
    let generator = LockSnowflakeGenerator::new(0, MonotonicClock::default()).unwrap();
    bench_generator_blocking(c, "mono/sequential/lock", generator);
}

fn benchmark_mono_sequential_atomic(c: &mut Criterion) {
    let generator = AtomicSnowflakeGenerator::new(0, MonotonicClock::default()).unwrap();
    bench_generator_blocking(c, "mono/sequential/atomic", generator);
}

fn benchmark_registry_cached_key(c: &mut Criterion) {
    let registry = GeneratorRegistry::new(
        StoreWorkerIdSource::new(MemoryStore::new()),
        "10.0.0.5",
        MonotonicClock::default(),
    );
    registry.get_or_create("orders").unwrap();

    let mut group = c.benchmark_group("mono/registry");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(registry.generate("orders").unwrap());
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    // Mock clock
    benchmark_mock_sequential_lock,
    benchmark_mock_sequential_atomic,
    benchmark_mock_contended_lock,
    benchmark_mock_contended_atomic,
    // Monotonic clock (may wait for the next millisecond)
    benchmark_mono_sequential_lock,
    benchmark_mono_sequential_atomic,
    benchmark_registry_cached_key,
);
criterion_main!(benches);
