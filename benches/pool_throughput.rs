//! Allocation throughput benchmarks
//!
//! Compares pooled chunk recycling against the system allocator for the
//! workloads pools are built for: same-size churn and bulk runs.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use poolkit::{ChunkPool, GrowthPolicy, ObjectPool, PoolConfig};

/// Allocate, touch, free - the request/response shape pools excel at.
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.throughput(Throughput::Elements(1));

    group.bench_function("chunk_pool", |b| {
        let mut pool =
            ChunkPool::with_config(256, GrowthPolicy::doubling(64), PoolConfig::production())
                .unwrap();

        b.iter(|| {
            let chunk = pool.malloc().unwrap();
            unsafe {
                std::ptr::write_bytes(chunk.as_ptr(), 0x42, 256);
                black_box(chunk);
                pool.free(chunk);
            }
        });
    });

    group.bench_function("system_box", |b| {
        b.iter(|| {
            let buf = vec![0x42u8; 256].into_boxed_slice();
            black_box(&buf);
        });
    });

    group.finish();
}

/// Typed construct/destroy cycle against Box.
fn bench_object_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("object_cycle");
    group.throughput(Throughput::Elements(1));

    #[derive(Clone, Copy)]
    struct Payload {
        _data: [u64; 8],
    }

    group.bench_function("object_pool", |b| {
        let mut pool: ObjectPool<Payload> = ObjectPool::with_source(
            GrowthPolicy::doubling(64),
            PoolConfig::production(),
            poolkit::SystemSource::new(),
        )
        .unwrap();

        b.iter(|| {
            let ptr = pool.construct(Payload { _data: [7; 8] }).unwrap();
            black_box(ptr);
            unsafe { pool.destroy(ptr) };
        });
    });

    group.bench_function("box", |b| {
        b.iter(|| {
            let boxed = Box::new(Payload { _data: [7; 8] });
            black_box(&boxed);
        });
    });

    group.finish();
}

/// Bulk contiguous runs: the ordered allocation path, including its
/// free-list merge cost.
fn bench_ordered_runs(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_runs");
    group.throughput(Throughput::Elements(16));

    group.bench_function("ordered_malloc_16", |b| {
        let mut pool =
            ChunkPool::with_config(64, GrowthPolicy::doubling(256), PoolConfig::production())
                .unwrap();

        b.iter(|| {
            let run = pool.ordered_malloc(16).unwrap();
            black_box(run);
            unsafe { pool.free_run(run, 16) };
        });
    });

    group.finish();
}

criterion_group!(benches, bench_churn, bench_object_cycle, bench_ordered_runs);
criterion_main!(benches);
