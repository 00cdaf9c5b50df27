// Benchmark the health and readiness sweeps over in-memory checkers

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use srvmon::aggregate::{evaluate_health, evaluate_readiness};
use srvmon::{AggregationPolicy, CheckContext, CheckError, CheckResult, Checker, Status};
use std::hint::black_box;
use std::sync::Arc;

struct Fixed {
    name: String,
    status: Status,
    critical: bool,
}

#[async_trait]
impl Checker for Fixed {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, _ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        Ok(CheckResult::new(self.name.clone(), self.status, "bench"))
    }
}

/// Every fourth checker is DOWN, every other one critical
fn checkers(count: usize) -> Vec<Arc<dyn Checker>> {
    (0..count)
        .map(|i| {
            let status = if i % 4 == 3 { Status::Down } else { Status::Up };
            Arc::new(Fixed {
                name: format!("dep-{i}"),
                status,
                critical: i % 2 == 0,
            }) as Arc<dyn Checker>
        })
        .collect()
}

fn bench_health(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("health");

    for count in [1, 8, 64] {
        let deps = checkers(count);
        for policy in [AggregationPolicy::FirstDown, AggregationPolicy::Classify] {
            let id = BenchmarkId::new(format!("{policy:?}"), count);
            group.bench_with_input(id, &deps, |b, deps| {
                b.iter(|| {
                    runtime.block_on(async {
                        let ctx = CheckContext::new();
                        black_box(
                            evaluate_health(deps, "bench", policy, &ctx)
                                .await
                                .unwrap(),
                        )
                    })
                });
            });
        }
    }

    group.finish();
}

fn bench_readiness(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("readiness");

    for count in [1, 8, 64] {
        let deps = checkers(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &deps, |b, deps| {
            b.iter(|| {
                runtime.block_on(async {
                    let ctx = CheckContext::new();
                    black_box(evaluate_readiness(deps, true, &ctx).await.unwrap())
                })
            });
        });
    }

    group.bench_function("not_ready", |b| {
        let deps = checkers(64);
        b.iter(|| {
            runtime.block_on(async {
                let ctx = CheckContext::new();
                black_box(evaluate_readiness(&deps, false, &ctx).await.unwrap())
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_health, bench_readiness);
criterion_main!(benches);
