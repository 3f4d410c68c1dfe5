//! Benchmarks for the worker pool.
//!
//! Benchmarks cover:
//! - Hot-path acquire/release against a warm idle worker
//! - Queue churn: more callers than workers, FIFO hand-off
//! - Stats snapshots under load
//! - Pool construction and teardown

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Runtime;

use worker_lot::{FactoryError, PoolConfig, TerminateError, WorkerFactory, WorkerPool};

// ============================================================================
// Benchmark Factory
// ============================================================================

/// A factory whose workers cost nothing to create or close, so the numbers
/// measure pool bookkeeping rather than process startup.
struct NoopFactory;

#[async_trait]
impl WorkerFactory for NoopFactory {
    type Worker = u64;

    async fn create(&self) -> Result<u64, FactoryError> {
        Ok(0)
    }

    async fn probe_health(&self, _worker: &u64) -> bool {
        true
    }

    async fn reset_for_reuse(&self, _worker: &u64) -> Result<(), FactoryError> {
        Ok(())
    }

    async fn terminate_gracefully(
        &self,
        _worker: &u64,
        _timeout: Duration,
    ) -> Result<(), TerminateError> {
        Ok(())
    }

    fn force_terminate(&self, _worker: &u64) {}
}

fn bench_config(max_workers: usize) -> PoolConfig {
    PoolConfig {
        max_workers,
        max_queue_size: 1_000,
        idle_timeout_ms: 60_000,
        close_timeout_ms: 1_000,
        max_use_time_ms: 600_000,
        guardian_interval_ms: 60_000,
        min_warm_workers: 1,
        verbose: false,
    }
}

// ============================================================================
// Acquire/Release Benchmarks
// ============================================================================

fn bench_hot_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");
    group.throughput(Throughput::Elements(1));

    let rt = Runtime::new().unwrap();
    let pool = rt.block_on(async {
        let pool = WorkerPool::new(bench_config(4), NoopFactory).unwrap();
        // Warm one worker so the benched path is pure reuse.
        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.release(lease.into_worker()).await;
        pool
    });

    group.bench_function("hot_reuse", |b| {
        b.to_async(&rt).iter(|| {
            let pool = Arc::clone(&pool);
            async move {
                let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
                black_box(lease.id());
                pool.release(lease.into_worker()).await;
            }
        });
    });
    group.finish();
}

fn bench_queue_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_churn");

    for callers in [16u64, 64, 256] {
        group.throughput(Throughput::Elements(callers));
        group.bench_with_input(
            BenchmarkId::from_parameter(callers),
            &callers,
            |b, &callers| {
                b.to_async(Runtime::new().unwrap()).iter(|| async move {
                    let pool = WorkerPool::new(bench_config(4), NoopFactory).unwrap();
                    let mut tasks = Vec::with_capacity(callers as usize);
                    for _ in 0..callers {
                        let pool = Arc::clone(&pool);
                        tasks.push(tokio::spawn(async move {
                            let lease = pool.acquire(Duration::from_secs(5)).await.unwrap();
                            black_box(lease.id());
                            pool.release(lease.into_worker()).await;
                        }));
                    }
                    for task in tasks {
                        task.await.unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Observability and Lifecycle Benchmarks
// ============================================================================

fn bench_stats_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");

    let rt = Runtime::new().unwrap();
    let pool = rt.block_on(async {
        let pool = WorkerPool::new(bench_config(8), NoopFactory).unwrap();
        for _ in 0..4 {
            let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
            pool.release(lease.into_worker()).await;
        }
        pool
    });

    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(pool.stats()));
    });
    group.finish();
}

fn bench_pool_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");

    group.bench_function("create_acquire_shutdown", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let pool = WorkerPool::new(bench_config(2), NoopFactory).unwrap();
            let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
            pool.release(lease.into_worker()).await;
            pool.shutdown(Duration::from_secs(1)).await;
            black_box(pool.stats().workers_destroyed);
        });
    });
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(acquire_benches, bench_hot_reuse, bench_queue_churn);
criterion_group!(misc_benches, bench_stats_snapshot, bench_pool_lifecycle);

criterion_main!(acquire_benches, misc_benches);
