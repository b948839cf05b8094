//! Pool and executor benchmarks
//!
//! Run with `cargo bench --features benchmarks`.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gauntlet_core::config::{ExecutorConfig, PoolConfig};
use gauntlet_core::constants::{ExecutionStatus, ResourceKind};
use gauntlet_core::execution::{BoundedParallelExecutor, ExecutionResult, ExecutionUnit};
use gauntlet_core::pool::{ResourceFactory, ResourcePool};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

struct NoopFactory;

#[async_trait]
impl ResourceFactory for NoopFactory {
    type Resource = u64;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Memory
    }

    async fn create(&self) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn validate(&self, _resource: &u64) -> bool {
        true
    }

    async fn close(&self, _resource: u64) -> anyhow::Result<()> {
        Ok(())
    }
}

struct NoopUnit(String);

#[async_trait]
impl ExecutionUnit for NoopUnit {
    fn name(&self) -> &str {
        &self.0
    }

    async fn execute(&self, _cancel: CancellationToken) -> ExecutionResult {
        ExecutionResult::new(&self.0, ExecutionStatus::Passed)
    }
}

fn benchmark_acquire_release(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let pool = ResourcePool::new(
        "bench",
        NoopFactory,
        PoolConfig::new(4, Duration::from_secs(1)),
    )
    .unwrap();

    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let handle = pool.acquire().await.unwrap();
                black_box(*handle.get());
                pool.release(handle).await.unwrap();
            })
        })
    });
}

fn benchmark_contended_pool(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pool_contended");

    for tasks in [4usize, 16, 64] {
        let pool = Arc::new(
            ResourcePool::new(
                "bench-contended",
                NoopFactory,
                PoolConfig::new(4, Duration::from_secs(5)),
            )
            .unwrap(),
        );
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                runtime.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let pool = pool.clone();
                            tokio::spawn(async move {
                                let handle = pool.acquire().await.unwrap();
                                pool.release(handle).await.unwrap();
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                })
            })
        });
    }
    group.finish();
}

fn benchmark_executor_batch(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let executor =
        BoundedParallelExecutor::new(ExecutorConfig::new(8, Duration::from_secs(5))).unwrap();

    c.bench_function("executor_batch_100", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let units: Vec<Arc<dyn ExecutionUnit>> = (0..100)
                    .map(|i| Arc::new(NoopUnit(format!("unit-{i}"))) as Arc<dyn ExecutionUnit>)
                    .collect();
                black_box(executor.run(units).await.unwrap());
            })
        })
    });
}

criterion_group!(
    benches,
    benchmark_acquire_release,
    benchmark_contended_pool,
    benchmark_executor_batch
);
criterion_main!(benches);
