//! 状态变化汇总基准测试
//!
//! 测试状态判定、并发汇总和消息渲染的性能

use criterion::{criterion_group, criterion_main, Criterion};
use host_vitals::health::{ChangeAggregator, EndpointId, HostRegistry, HostStatus, Protocol, Transition};
use host_vitals::notification::ChangeTemplate;
use std::hint::black_box;
use std::sync::Arc;

fn endpoints(count: u16) -> Vec<EndpointId> {
    (1..=count)
        .map(|i| EndpointId::new(format!("10.0.{}.{}", i / 256, i % 256), 80, Protocol::Tcp))
        .collect()
}

/// 状态变化汇总基准测试
fn change_aggregation_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("创建tokio运行时失败");

    let targets = endpoints(256);

    c.bench_function("transition_between", |b| {
        let endpoint = &targets[0];
        b.iter(|| {
            black_box(Transition::between(
                black_box(endpoint),
                HostStatus::Up,
                HostStatus::Down,
            ))
        });
    });

    c.bench_function("registry_apply_256", |b| {
        let registry = HostRegistry::new(targets.clone());
        let mut reachable = false;
        b.iter(|| {
            reachable = !reachable;
            runtime.block_on(async {
                for slot in registry.slots() {
                    black_box(slot.apply(reachable).await);
                }
            })
        });
    });

    c.bench_function("aggregator_concurrent_record_256", |b| {
        let transitions: Vec<_> = targets
            .iter()
            .filter_map(|e| Transition::between(e, HostStatus::Down, HostStatus::Up))
            .collect();

        b.iter(|| {
            runtime.block_on(async {
                let aggregator = Arc::new(ChangeAggregator::new());
                let handles: Vec<_> = transitions
                    .iter()
                    .cloned()
                    .map(|t| {
                        let aggregator = Arc::clone(&aggregator);
                        tokio::spawn(async move { aggregator.record(t).await })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.await;
                }
                black_box(aggregator.drain().await)
            })
        });
    });

    c.bench_function("template_render_64", |b| {
        let template = ChangeTemplate::new(None).expect("默认模板无效");
        let transitions: Vec<_> = targets
            .iter()
            .take(64)
            .filter_map(|e| Transition::between(e, HostStatus::Up, HostStatus::Down))
            .collect();

        b.iter(|| black_box(template.render(black_box(&transitions))));
    });
}

criterion_group!(benches, change_aggregation_benchmark);
criterion_main!(benches);
